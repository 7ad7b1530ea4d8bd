//! Worker configuration.
//!
//! Resolution order, later wins: built-in defaults, TOML file, environment
//! (`ROSTER_*`), command-line flags.

use crate::core::error::RosterError;
use crate::core::ids::{self, ShortIdAllocator};
use crate::core::schemas;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "roster.toml";

pub const ENV_DB_PATH: &str = "ROSTER_DB_PATH";
pub const ENV_AUDIT_LOG: &str = "ROSTER_AUDIT_LOG";
pub const ENV_LOG: &str = "ROSTER_LOG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// SQLite file holding the user table.
    pub db_path: PathBuf,
    pub id_prefix: String,
    pub id_width: usize,
    /// JSONL file receiving one broker event per store operation.
    pub audit_log: Option<PathBuf>,
    /// `tracing` filter used when `RUST_LOG` is not set.
    pub log_filter: String,
    /// Register demonstration tools (`send_email`).
    pub demo_tools: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(schemas::USERS_DB_NAME),
            id_prefix: ids::DEFAULT_PREFIX.to_string(),
            id_width: ids::DEFAULT_WIDTH,
            audit_log: None,
            log_filter: "info".to_string(),
            demo_tools: false,
        }
    }
}

impl Config {
    pub fn from_toml_str(raw: &str) -> Result<Self, RosterError> {
        toml::from_str(raw).map_err(|e| RosterError::ConfigError(e.to_string()))
    }

    pub fn from_file(path: &Path) -> Result<Self, RosterError> {
        let raw = fs::read_to_string(path).map_err(|e| {
            RosterError::ConfigError(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&raw)
    }

    /// Load from `explicit` if given (must exist), else from
    /// `roster.toml` in `cwd` if present, else defaults. Environment
    /// overrides are applied afterwards.
    pub fn load(explicit: Option<&Path>, cwd: &Path) -> Result<Self, RosterError> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => {
                let candidate = cwd.join(DEFAULT_CONFIG_FILE);
                if candidate.is_file() {
                    Self::from_file(&candidate)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(db) = lookup(ENV_DB_PATH).filter(|v| !v.trim().is_empty()) {
            self.db_path = PathBuf::from(db);
        }
        if let Some(audit) = lookup(ENV_AUDIT_LOG).filter(|v| !v.trim().is_empty()) {
            self.audit_log = Some(PathBuf::from(audit));
        }
        if let Some(filter) = lookup(ENV_LOG).filter(|v| !v.trim().is_empty()) {
            self.log_filter = filter;
        }
    }

    pub fn validate(&self) -> Result<(), RosterError> {
        if self.db_path.as_os_str().is_empty() {
            return Err(RosterError::ConfigError(
                "db_path must not be empty".to_string(),
            ));
        }
        self.allocator().map(|_| ())
    }

    pub fn allocator(&self) -> Result<ShortIdAllocator, RosterError> {
        ShortIdAllocator::new(&self.id_prefix, self.id_width)
    }
}
