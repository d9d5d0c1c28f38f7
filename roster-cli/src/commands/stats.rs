//! Statistics commands

use clap::{Args, Subcommand};

use super::{print_json, Services};

/// Statistics commands
#[derive(Args, Debug)]
pub struct StatsArgs {
    #[command(subcommand)]
    pub command: StatsCommand,
}

#[derive(Subcommand, Debug)]
pub enum StatsCommand {
    /// Review assignments per user
    Users,

    /// Pull request totals by status
    Prs,

    /// Open reviews per user
    Workload,
}

impl StatsArgs {
    /// Execute the stats command
    pub async fn execute(&self, services: &Services) -> anyhow::Result<()> {
        match self.command {
            StatsCommand::Users => print_json(&services.stats.user_assignment_stats().await?),
            StatsCommand::Prs => print_json(&services.stats.pr_stats().await?),
            StatsCommand::Workload => print_json(&services.stats.reviewer_workload().await?),
        }
    }
}
