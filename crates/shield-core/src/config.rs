//! Configuration management for focus-shield

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, Ipv6Addr};
use std::path::{Path, PathBuf};

/// focus-shield configuration
///
/// Every field has a serde default, so a partial (or missing) file is valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Hosts file to patch during a session
    #[serde(default = "default_hosts_path")]
    pub hosts_path: PathBuf,

    /// Session length used when `start` is given no argument (minutes)
    #[serde(default = "default_minutes")]
    pub default_minutes: u32,

    /// Toggle "do not disturb" with the session
    #[serde(default = "default_true")]
    pub do_not_disturb: bool,

    /// Flush the OS resolver cache after hosts changes
    #[serde(default = "default_true")]
    pub flush_dns: bool,

    /// IPv4 address blocked domains resolve to
    #[serde(default = "default_redirect_v4")]
    pub redirect_v4: Ipv4Addr,

    /// IPv6 address blocked domains resolve to
    #[serde(default = "default_redirect_v6")]
    pub redirect_v6: Ipv6Addr,
}

fn default_hosts_path() -> PathBuf {
    if cfg!(windows) {
        PathBuf::from(r"C:\Windows\System32\drivers\etc\hosts")
    } else {
        PathBuf::from("/etc/hosts")
    }
}

fn default_minutes() -> u32 {
    25
}

fn default_true() -> bool {
    true
}

fn default_redirect_v4() -> Ipv4Addr {
    Ipv4Addr::LOCALHOST
}

fn default_redirect_v6() -> Ipv6Addr {
    Ipv6Addr::LOCALHOST
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hosts_path: default_hosts_path(),
            default_minutes: default_minutes(),
            do_not_disturb: true,
            flush_dns: true,
            redirect_v4: default_redirect_v4(),
            redirect_v6: default_redirect_v6(),
        }
    }
}

impl Config {
    /// Load config from file, falling back to defaults when it doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }
}
