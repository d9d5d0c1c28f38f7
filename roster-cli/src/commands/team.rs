//! Team management commands

use clap::{Args, Subcommand};
use roster_core::TeamMember;

use super::{print_json, Services};

/// Team management commands
#[derive(Args, Debug)]
pub struct TeamArgs {
    #[command(subcommand)]
    pub command: TeamCommand,
}

#[derive(Subcommand, Debug)]
pub enum TeamCommand {
    /// Create a team with its members
    Add {
        /// Team name
        name: String,

        /// Member as ID:USERNAME, with an optional :inactive suffix
        #[arg(short, long = "member", value_parser = parse_member)]
        members: Vec<TeamMember>,
    },

    /// Show a team and its members
    Get {
        /// Team name
        name: String,
    },
}

impl TeamArgs {
    /// Execute the team command
    pub async fn execute(&self, services: &Services) -> anyhow::Result<()> {
        match &self.command {
            TeamCommand::Add { name, members } => {
                let team = services
                    .directory
                    .create_team(name, members.clone())
                    .await?;
                print_json(&team)
            }
            TeamCommand::Get { name } => print_json(&services.directory.get_team(name).await?),
        }
    }
}

/// Parse `ID:USERNAME` or `ID:USERNAME:inactive`
fn parse_member(raw: &str) -> Result<TeamMember, String> {
    let mut parts = raw.splitn(3, ':');
    let (Some(id), Some(username)) = (parts.next(), parts.next()) else {
        return Err(format!("expected ID:USERNAME, got '{}'", raw));
    };

    let member = TeamMember::new(id, username);
    match parts.next() {
        None | Some("active") => Ok(member),
        Some("inactive") => Ok(member.inactive()),
        Some(other) => Err(format!(
            "unknown member flag '{}', expected 'active' or 'inactive'",
            other
        )),
    }
}
