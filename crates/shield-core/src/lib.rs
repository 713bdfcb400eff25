//! shield-core - Shared functionality for focus-shield
//!
//! Paths, configuration, formatting and the small OS helpers
//! (privilege detection, external command execution) the tool builds on.

pub mod config;
pub mod format;
pub mod paths;
pub mod process;

pub use config::Config;
pub use paths::Paths;
