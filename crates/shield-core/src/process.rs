//! Process and privilege utilities

use anyhow::{bail, Context, Result};
use std::process::Command;
use tracing::debug;

/// Whether the current process runs with root privileges
pub fn is_root() -> bool {
    #[cfg(unix)]
    {
        // SAFETY: geteuid has no preconditions and cannot fail
        unsafe { libc::geteuid() == 0 }
    }

    #[cfg(not(unix))]
    {
        false
    }
}

/// The desktop user behind a `sudo` invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokingUser {
    pub name: String,
    pub uid: u32,
}

impl InvokingUser {
    /// Read `SUDO_USER` and `SUDO_UID`. `None` unless both are set and the
    /// user is not root itself.
    pub fn from_sudo_env() -> Option<Self> {
        Self::from_vars(
            std::env::var("SUDO_USER").ok(),
            std::env::var("SUDO_UID").ok(),
        )
    }

    pub fn from_vars(name: Option<String>, uid: Option<String>) -> Option<Self> {
        let name = name.filter(|n| !n.is_empty() && n != "root")?;
        let uid = uid?.parse().ok().filter(|&uid| uid != 0)?;
        Some(Self { name, uid })
    }

    /// Address of the user's D-Bus session bus
    pub fn session_bus(&self) -> String {
        format!("unix:path=/run/user/{}/bus", self.uid)
    }
}

/// Check if a command exists on PATH
pub fn command_exists(cmd: &str) -> bool {
    Command::new("which")
        .arg(cmd)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Run an external command to completion, capturing its output.
///
/// A non-zero exit status is an error carrying the command's stderr.
pub fn run(program: &str, args: &[&str]) -> Result<()> {
    debug!("Running: {} {:?}", program, args);

    let output = Command::new(program)
        .args(args)
        .output()
        .with_context(|| format!("Failed to run {}", program))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "{} failed with status {}: {}",
            program,
            output.status,
            stderr.trim()
        );
    }

    Ok(())
}
