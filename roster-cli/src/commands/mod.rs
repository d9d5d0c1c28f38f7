//! CLI command implementations

pub mod pr;
pub mod stats;
pub mod team;
pub mod user;

pub use pr::PrArgs;
pub use stats::StatsArgs;
pub use team::TeamArgs;
pub use user::UserArgs;

use roster_core::{AssignmentEngine, Config, DirectoryService, StatsService};
use roster_db::SqliteStore;
use serde::Serialize;

/// Services wired to one SQLite store
pub struct Services {
    pub engine: AssignmentEngine<SqliteStore>,
    pub directory: DirectoryService<SqliteStore>,
    pub stats: StatsService<SqliteStore>,
}

impl Services {
    pub fn new(store: SqliteStore, config: &Config) -> Self {
        Self {
            engine: AssignmentEngine::from_config(store.clone(), &config.engine),
            directory: DirectoryService::from_config(store.clone(), &config.engine),
            stats: StatsService::from_config(store, &config.engine),
        }
    }
}

/// Print a command result as pretty JSON on stdout
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
