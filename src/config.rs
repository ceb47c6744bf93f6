//! Configuration loading and management
//!
//! Handles parsing of `.stacks.toml` configuration files.
//!
//! Resolution order:
//! 1) Explicit path (`--config` / `STACKS_CONFIG`), which must be valid
//! 2) `.stacks.toml` in the working directory
//! 3) `config.toml` in the platform config directory
//! 4) Built-in defaults

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::Deserialize;

use crate::error::{Error, Result};

/// File name looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = ".stacks.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Config {
    /// Loan rules
    #[serde(default)]
    pub loans: LoansConfig,

    /// Per-key lock behavior
    #[serde(default)]
    pub locks: LocksConfig,

    /// Console shell behavior
    #[serde(default)]
    pub shell: ShellConfig,
}

/// Loan-related configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoansConfig {
    /// Maximum number of books one user may hold
    #[serde(default = "default_max_books")]
    pub max_books_per_user: usize,
}

fn default_max_books() -> usize {
    3
}

impl Default for LoansConfig {
    fn default() -> Self {
        Self {
            max_books_per_user: default_max_books(),
        }
    }
}

/// Lock configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LocksConfig {
    /// Lock wait bound in milliseconds; 0 waits indefinitely
    #[serde(default)]
    pub timeout_ms: u64,
}

impl LocksConfig {
    pub fn timeout(&self) -> Option<Duration> {
        if self.timeout_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.timeout_ms))
        }
    }
}

/// Shell configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ShellConfig {
    /// Create unknown users on checkout instead of failing
    #[serde(default = "default_true")]
    pub auto_create_users: bool,

    /// Prompt printed by the interactive shell
    #[serde(default = "default_prompt")]
    pub prompt: String,
}

fn default_true() -> bool {
    true
}

fn default_prompt() -> String {
    "stacks> ".to_string()
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            auto_create_users: true,
            prompt: default_prompt(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `path`, or return defaults if it is missing or invalid
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "ignoring invalid config");
                Self::default()
            }
        }
    }

    /// Resolve configuration using the documented lookup order
    pub fn resolve(explicit: Option<&Path>, cwd: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        let local = cwd.join(LOCAL_CONFIG_FILE);
        if local.exists() {
            return Ok(Self::load_or_default(&local));
        }

        if let Some(path) = user_config_path() {
            return Ok(Self::load_or_default(&path));
        }

        Ok(Self::default())
    }

    fn validate(&self) -> Result<()> {
        if self.loans.max_books_per_user == 0 {
            return Err(Error::InvalidConfig(
                "loans.max_books_per_user must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Platform config file, e.g. `~/.config/stacks/config.toml` on Linux
pub fn user_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "stacks").map(|dirs| dirs.config_dir().join("config.toml"))
}
