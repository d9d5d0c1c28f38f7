//! Configuration management for Roster
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (ROSTER_*)
//! 3. Config file (~/.config/roster/config.toml)
//! 4. Default values

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Default bound on a single engine operation
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Database-related configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Path to the SQLite database; the store picks its default when unset
    pub path: Option<PathBuf>,

    /// Maximum number of pooled connections
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: None,
            max_connections: 5,
        }
    }
}

/// Engine-related configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Deadline for one operation, unit of work included
    #[serde(with = "humantime_serde")]
    pub operation_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseSettings,

    pub engine: EngineConfig,
}

impl Config {
    /// Load configuration from the default config file location
    ///
    /// Returns default config if file doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();

        if let Some(path) = config_path {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Internal(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        toml::from_str(&contents)
            .map_err(|e| Error::Validation(format!("Failed to parse config: {}", e)))
    }

    /// Get the default config file path
    ///
    /// Returns `~/.config/roster/config.toml` on Unix
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("roster").join("config.toml"))
    }

    /// Apply environment variable overrides
    ///
    /// Supported variables:
    /// - ROSTER_DATABASE: Path to the SQLite database
    /// - ROSTER_OPERATION_TIMEOUT: Operation timeout, e.g. `10s` or `2m`
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(
            std::env::var("ROSTER_DATABASE").ok().map(PathBuf::from),
            std::env::var("ROSTER_OPERATION_TIMEOUT")
                .ok()
                .map(|raw| parse_duration(&raw))
                .transpose()?,
        )
    }

    /// Apply CLI flag overrides
    pub fn with_cli_overrides(
        self,
        database: Option<PathBuf>,
        operation_timeout: Option<Duration>,
    ) -> Self {
        Self {
            database: DatabaseSettings {
                path: database.or(self.database.path),
                ..self.database
            },
            engine: EngineConfig {
                operation_timeout: operation_timeout.unwrap_or(self.engine.operation_timeout),
            },
        }
    }

    fn with_overrides(
        self,
        database: Option<PathBuf>,
        operation_timeout: Option<Duration>,
    ) -> Result<Self> {
        self.with_cli_overrides(database, operation_timeout).validate()
    }

    /// Reject values that would leave the store unusable
    fn validate(self) -> Result<Self> {
        if self.database.max_connections == 0 {
            return Err(Error::Validation(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        if self.engine.operation_timeout.is_zero() {
            return Err(Error::Validation(
                "operation timeout must be positive".to_string(),
            ));
        }
        Ok(self)
    }

    /// Load configuration with all overrides applied
    ///
    /// Priority: CLI > env > config file > defaults
    pub fn load_with_overrides(
        database: Option<PathBuf>,
        operation_timeout: Option<Duration>,
    ) -> Result<Self> {
        Self::load()?
            .with_env_overrides()?
            .with_overrides(database, operation_timeout)
    }
}

/// Parse a human readable duration such as `30s` or `1m 30s`
pub fn parse_duration(raw: &str) -> Result<Duration> {
    humantime_serde::re::humantime::parse_duration(raw)
        .map_err(|e| Error::Validation(format!("Invalid duration '{}': {}", raw, e)))
}
