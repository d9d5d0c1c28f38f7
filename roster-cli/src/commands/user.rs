//! User commands

use clap::{Args, Subcommand};

use super::{print_json, Services};

/// User commands
#[derive(Args, Debug)]
pub struct UserArgs {
    #[command(subcommand)]
    pub command: UserCommand,
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    /// Activate or deactivate a user
    SetActive {
        /// User id
        user_id: String,

        /// New activity flag
        #[arg(long, action = clap::ArgAction::Set)]
        active: bool,
    },

    /// List the pull requests a user reviews
    Reviews {
        /// User id
        user_id: String,
    },
}

impl UserArgs {
    /// Execute the user command
    pub async fn execute(&self, services: &Services) -> anyhow::Result<()> {
        match &self.command {
            UserCommand::SetActive { user_id, active } => {
                let user = services.directory.set_is_active(user_id, *active).await?;
                print_json(&user)
            }
            UserCommand::Reviews { user_id } => {
                let prs = services.engine.get_reviewer_prs(user_id).await?;
                print_json(&serde_json::json!({
                    "user_id": user_id,
                    "pull_requests": prs,
                }))
            }
        }
    }
}
