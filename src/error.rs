//! Error types for stacks
//!
//! Predictable catalog outcomes (not found, already checked out, limit
//! reached) are status codes, see [`crate::status`]. Errors here are caller
//! contract violations and environment failures.
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, invalid config)
//! - 3: Conflict (duplicate key, lock timeout)
//! - 4: Operation failed (io, json output, config parse)

use std::fmt;

use thiserror::Error;

/// Exit codes for the stacks CLI
pub mod exit_codes {
    pub const USER_ERROR: i32 = 2;
    pub const CONFLICT: i32 = 3;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Which key namespace an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyKind {
    Book,
    User,
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyKind::Book => write!(f, "book"),
            KeyKind::User => write!(f, "user"),
        }
    }
}

/// Main error type for stacks operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Conflicts (exit code 3)
    #[error("Duplicate {kind}: '{key}' already exists")]
    DuplicateKey { kind: KeyKind, key: String },

    #[error("Timed out waiting for {kind} lock '{key}'")]
    LockTimeout { kind: KeyKind, key: String },

    // Operation failures (exit code 4)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidArgument(_) | Error::InvalidConfig(_) => exit_codes::USER_ERROR,

            Error::DuplicateKey { .. } | Error::LockTimeout { .. } => exit_codes::CONFLICT,

            Error::Io(_) | Error::Json(_) | Error::TomlParse(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// Structured details for JSON error output, when the variant carries any
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::DuplicateKey { kind, key } | Error::LockTimeout { kind, key } => {
                Some(serde_json::json!({ "kind": kind, "key": key }))
            }
            _ => None,
        }
    }
}

/// Result type alias for stacks operations
pub type Result<T> = std::result::Result<T, Error>;

