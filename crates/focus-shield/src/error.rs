//! Errors callers match on
//!
//! Everything else travels as `anyhow::Error` with context attached.

use std::path::PathBuf;
use thiserror::Error;

/// Conditions the REPL reports inline and tests assert on
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ShieldError {
    #[error("A focus session is already active. Use 'stop' to end it first.")]
    SessionActive,

    #[error("Permission denied writing {}", .0.display())]
    NotPrivileged(PathBuf),

    #[error("Invalid duration '{0}': expected whole minutes between 1 and 1440")]
    InvalidDuration(String),

    #[error("Invalid number of days '{0}'")]
    InvalidDays(String),

    #[error("Please specify a domain")]
    EmptyDomain,

    #[error("Invalid domain: {0}")]
    InvalidDomain(String),

    #[error("Unknown command '{0}'. Type 'help' for options.")]
    UnknownCommand(String),
}
