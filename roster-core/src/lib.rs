//! Roster Core - reviewer assignment for pull requests
//!
//! This crate provides the assignment engine, the team directory and the
//! statistics queries, all running against a pluggable transactional store.

pub mod config;
pub mod directory;
pub mod engine;
pub mod error;
pub mod models;
pub mod policy;
pub mod stats;
pub mod status;
pub mod store;
pub mod unit_of_work;

pub use config::{Config, DatabaseSettings, EngineConfig};
pub use directory::DirectoryService;
pub use engine::AssignmentEngine;
pub use error::{Conflict, Error, Resource, Result};
pub use models::{
    PrStats, PullRequest, PullRequestShort, Reassignment, ReviewerWorkload, Team, TeamMember,
    User, UserAssignmentStats,
};
pub use stats::StatsService;
pub use status::PrStatus;
pub use store::{InMemoryStore, Session, UnitOfWork};
