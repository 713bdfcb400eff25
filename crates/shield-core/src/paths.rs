//! Standard paths used by focus-shield

use anyhow::{Context, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Name of the state directory under the user's home
pub const STATE_DIR: &str = ".focus-shield";

/// Suffix appended to the hosts file name for the pre-session backup
pub const BACKUP_SUFFIX: &str = ".focus-shield.bak";

/// Standard focus-shield paths
#[derive(Debug, Clone)]
pub struct Paths {
    /// State directory (~/.focus-shield)
    pub data: PathBuf,
}

impl Paths {
    /// Resolve paths relative to the current user's home directory.
    ///
    /// Fails when the home directory cannot be determined; there is no
    /// sensible place to keep the blocklist in that case.
    pub fn new() -> Result<Self> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(Self::from_home(&home))
    }

    /// Resolve paths relative to an explicit home directory
    pub fn from_home(home: &Path) -> Self {
        Self {
            data: home.join(STATE_DIR),
        }
    }

    /// Plain-text blocklist, one domain per line
    pub fn blocklist(&self) -> PathBuf {
        self.data.join("blocklist.txt")
    }

    /// JSON configuration file
    pub fn config(&self) -> PathBuf {
        self.data.join("config.json")
    }
}

/// Backup location for a hosts file: a sibling named `<hosts>.focus-shield.bak`
pub fn hosts_backup(hosts: &Path) -> PathBuf {
    let mut name = hosts
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("hosts"));
    name.push(BACKUP_SUFFIX);
    hosts.with_file_name(name)
}
