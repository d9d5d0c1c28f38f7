//! Pull request commands

use clap::{Args, Subcommand};

use super::{print_json, Services};

/// Pull request commands
#[derive(Args, Debug)]
pub struct PrArgs {
    #[command(subcommand)]
    pub command: PrCommand,
}

#[derive(Subcommand, Debug)]
pub enum PrCommand {
    /// Open a pull request and assign reviewers
    Create {
        /// Pull request id
        #[arg(long)]
        id: String,

        /// Pull request title
        #[arg(long)]
        name: String,

        /// Author's user id
        #[arg(long)]
        author: String,
    },

    /// Mark a pull request as merged
    Merge {
        /// Pull request id
        id: String,
    },

    /// Replace one reviewer with a teammate
    Reassign {
        /// Pull request id
        id: String,

        /// Reviewer to replace
        #[arg(long)]
        old_reviewer: String,
    },
}

impl PrArgs {
    /// Execute the pull request command
    pub async fn execute(&self, services: &Services) -> anyhow::Result<()> {
        match &self.command {
            PrCommand::Create { id, name, author } => {
                print_json(&services.engine.create_pr(id, name, author).await?)
            }
            PrCommand::Merge { id } => print_json(&services.engine.merge_pr(id).await?),
            PrCommand::Reassign { id, old_reviewer } => {
                print_json(&services.engine.reassign_reviewer(id, old_reviewer).await?)
            }
        }
    }
}
