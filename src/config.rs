//! User configuration
//!
//! Read from `<config_home>/escritorio/config.toml`. Every field is optional;
//! a missing file yields the defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable that overrides the database location
pub const DB_ENV_VAR: &str = "ESCRITORIO_DB";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite database file; defaults to ~/.escritorio/data.db
    pub database_path: Option<PathBuf>,
    /// Rows shown in the import preview table
    pub preview_rows: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: None,
            preview_rows: 10,
        }
    }
}

impl Config {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid configuration file")
    }

    /// Load from an explicit file, falling back to defaults if it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        Self::from_toml_str(&content)
    }

    /// Load from the platform config directory
    pub fn load() -> Result<Self> {
        match config_file_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Database path precedence: command line, environment, config file.
    /// `None` means the default location.
    pub fn resolve_db_path(&self, cli_override: Option<PathBuf>) -> Option<PathBuf> {
        cli_override
            .or_else(|| std::env::var_os(DB_ENV_VAR).map(PathBuf::from))
            .or_else(|| self.database_path.clone())
    }
}

pub fn config_file_path() -> Option<PathBuf> {
    dir_spec::config_home().map(|dir| dir.join("escritorio").join("config.toml"))
}
