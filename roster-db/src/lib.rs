//! Database layer for Roster
//!
//! Persists teams, users, pull requests and reviewer assignments in SQLite
//! and exposes them through the roster store traits.

pub mod db;
pub mod error;
pub mod store;

pub use db::{Database, DatabaseConfig};
pub use error::{Error, Result};
pub use store::{SqliteSession, SqliteStore};
