//! Hosts file mutation
//!
//! A session backs up the hosts file verbatim, then appends a marked
//! section that points every blocked hostname at loopback:
//!
//! ```text
//! # >>> focus-shield >>>
//! 127.0.0.1	reddit.com
//! ::1	reddit.com
//! # <<< focus-shield <<<
//! ```
//!
//! Restoring copies the backup back and deletes it. When no backup exists
//! (the process died and someone removed it) a leftover section is still
//! stripped, so a crash never leaves the file permanently patched.

use anyhow::{bail, Context, Result};
use shield_core::paths::hosts_backup;
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::blocklist::Blocklist;
use crate::error::ShieldError;

/// First line of the managed section
pub const BLOCK_START: &str = "# >>> focus-shield >>>";
/// Last line of the managed section
pub const BLOCK_END: &str = "# <<< focus-shield <<<";

/// Editor for the system hosts file
pub trait HostsEditor: Send + Sync {
    /// Path of the live hosts file
    fn path(&self) -> &Path;

    /// Fail with [`ShieldError::NotPrivileged`] when the file cannot be written
    fn check_writable(&self) -> Result<()>;

    /// Snapshot the current content before the first mutation
    fn backup(&self) -> Result<()>;

    /// Replace any managed section with one covering `blocklist`
    fn apply(&self, blocklist: &Blocklist) -> Result<()>;

    /// Undo the mutation, returning whether the file changed
    fn restore(&self) -> Result<bool>;

    /// Whether a backup or a managed section is left over
    fn needs_restore(&self) -> Result<bool>;
}

/// The real hosts file plus its sibling backup
#[derive(Debug, Clone)]
pub struct HostsFile {
    path: PathBuf,
    backup_path: PathBuf,
    redirect_v4: Ipv4Addr,
    redirect_v6: Ipv6Addr,
}

impl HostsFile {
    /// Manage `path`, redirecting to 127.0.0.1 and ::1
    pub fn new(path: &Path) -> Self {
        Self::with_redirects(path, Ipv4Addr::LOCALHOST, Ipv6Addr::LOCALHOST)
    }

    pub fn with_redirects(path: &Path, redirect_v4: Ipv4Addr, redirect_v6: Ipv6Addr) -> Self {
        Self {
            path: path.to_path_buf(),
            backup_path: hosts_backup(path),
            redirect_v4,
            redirect_v6,
        }
    }

    fn read_live(&self) -> Result<String> {
        fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read hosts file: {}", self.path.display()))
    }

    fn write_live(&self, content: &str) -> Result<()> {
        // Written in place: the file may be a bind mount that can't be replaced
        fs::write(&self.path, content).map_err(|e| {
            if e.kind() == ErrorKind::PermissionDenied {
                anyhow::Error::new(ShieldError::NotPrivileged(self.path.clone()))
            } else {
                anyhow::Error::new(e)
                    .context(format!("Failed to write hosts file: {}", self.path.display()))
            }
        })
    }
}

impl HostsEditor for HostsFile {
    fn path(&self) -> &Path {
        &self.path
    }

    fn check_writable(&self) -> Result<()> {
        match OpenOptions::new().append(true).open(&self.path) {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                bail!(ShieldError::NotPrivileged(self.path.clone()))
            }
            Err(e) => Err(e)
                .with_context(|| format!("Failed to open hosts file: {}", self.path.display())),
        }
    }

    fn backup(&self) -> Result<()> {
        if self.backup_path.exists() {
            // Left by an earlier session that never restored; it holds the
            // unpatched content, so it must not be overwritten.
            info!("Keeping existing hosts backup: {}", self.backup_path.display());
            return Ok(());
        }

        let content = self.read_live()?;
        fs::write(&self.backup_path, content).with_context(|| {
            format!("Failed to write hosts backup: {}", self.backup_path.display())
        })?;

        debug!("Backed up {} to {}", self.path.display(), self.backup_path.display());
        Ok(())
    }

    fn apply(&self, blocklist: &Blocklist) -> Result<()> {
        let current = self.read_live()?;
        let mut content = strip_block(&current).unwrap_or(current);

        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
        content.push_str(&render_block(blocklist, self.redirect_v4, self.redirect_v6));

        self.write_live(&content)?;
        debug!("Applied block for {} hostnames", blocklist.len());
        Ok(())
    }

    fn restore(&self) -> Result<bool> {
        if self.backup_path.exists() {
            let original = fs::read_to_string(&self.backup_path).with_context(|| {
                format!("Failed to read hosts backup: {}", self.backup_path.display())
            })?;
            self.write_live(&original)?;
            fs::remove_file(&self.backup_path).with_context(|| {
                format!("Failed to remove hosts backup: {}", self.backup_path.display())
            })?;

            debug!("Restored {} from backup", self.path.display());
            return Ok(true);
        }

        let current = self.read_live()?;
        match strip_block(&current) {
            Some(stripped) => {
                info!("No hosts backup found, stripping leftover block section");
                self.write_live(&stripped)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn needs_restore(&self) -> Result<bool> {
        if self.backup_path.exists() {
            return Ok(true);
        }
        Ok(strip_block(&self.read_live()?).is_some())
    }
}

/// Render the managed section for a blocklist
pub fn render_block(blocklist: &Blocklist, redirect_v4: Ipv4Addr, redirect_v6: Ipv6Addr) -> String {
    let mut block = String::new();
    block.push_str(BLOCK_START);
    block.push('\n');
    for domain in blocklist.iter() {
        block.push_str(&format!("{}\t{}\n", redirect_v4, domain));
        block.push_str(&format!("{}\t{}\n", redirect_v6, domain));
    }
    block.push_str(BLOCK_END);
    block.push('\n');
    block
}

/// Find the byte range of the first line equal to `marker` at or after `from`
fn find_marker(content: &str, marker: &str, from: usize) -> Option<(usize, usize)> {
    let mut pos = from;
    for line in content[from..].split_inclusive('\n') {
        if line.trim_end() == marker {
            return Some((pos, pos + line.len()));
        }
        pos += line.len();
    }
    None
}

/// Remove every managed section, or `None` if there is none.
///
/// A section missing its end marker (truncated write) runs to end of file.
pub fn strip_block(content: &str) -> Option<String> {
    let mut remaining = content.to_string();
    let mut stripped = false;

    while let Some((start, _)) = find_marker(&remaining, BLOCK_START, 0) {
        let end = find_marker(&remaining, BLOCK_END, start)
            .map(|(_, end)| end)
            .unwrap_or(remaining.len());
        remaining.replace_range(start..end, "");
        stripped = true;
    }

    stripped.then_some(remaining)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, TempDir};

    const ORIGINAL: &str = "##\n# Host Database\n##\n127.0.0.1\tlocalhost\n255.255.255.255\tbroadcasthost\n::1             localhost";

    fn hosts_fixture(content: &str) -> (TempDir, HostsFile) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hosts");
        fs::write(&path, content).unwrap();
        let hosts = HostsFile::new(&path);
        (dir, hosts)
    }

    fn small_list() -> Blocklist {
        let mut list = Blocklist::new();
        list.add("reddit.com").unwrap();
        list
    }

    #[test]
    fn test_backup_path_is_sibling() {
        let (dir, hosts) = hosts_fixture("");
        assert_eq!(hosts_backup(hosts.path()), dir.path().join("hosts.focus-shield.bak"));
    }

    #[test]
    fn test_apply_appends_marked_section() -> Result<()> {
        let (_dir, hosts) = hosts_fixture(ORIGINAL);
        hosts.apply(&small_list())?;

        let content = fs::read_to_string(hosts.path())?;
        assert!(content.starts_with(ORIGINAL));
        assert!(content.contains("127.0.0.1\treddit.com\n"));
        assert!(content.contains("::1\twww.reddit.com\n"));
        assert!(content.ends_with(&format!("{}\n", BLOCK_END)));
        Ok(())
    }

    #[test]
    fn test_apply_is_idempotent() -> Result<()> {
        let (_dir, hosts) = hosts_fixture(ORIGINAL);
        hosts.apply(&small_list())?;
        let once = fs::read_to_string(hosts.path())?;

        hosts.apply(&small_list())?;
        let twice = fs::read_to_string(hosts.path())?;

        assert_eq!(once, twice);
        assert_eq!(twice.matches(BLOCK_START).count(), 1);
        Ok(())
    }

    #[test]
    fn test_apply_replaces_stale_section() -> Result<()> {
        let (_dir, hosts) = hosts_fixture(ORIGINAL);
        hosts.apply(&Blocklist::with_defaults())?;
        hosts.apply(&small_list())?;

        let content = fs::read_to_string(hosts.path())?;
        assert!(!content.contains("twitter.com"));
        assert!(content.contains("reddit.com"));
        Ok(())
    }

    #[test]
    fn test_round_trip_is_byte_identical() -> Result<()> {
        let (_dir, hosts) = hosts_fixture(ORIGINAL);

        hosts.backup()?;
        hosts.apply(&Blocklist::with_defaults())?;
        assert!(hosts.needs_restore()?);

        assert!(hosts.restore()?);
        assert_eq!(fs::read_to_string(hosts.path())?, ORIGINAL);
        assert!(!hosts_backup(hosts.path()).exists());
        Ok(())
    }

    #[test]
    fn test_restore_twice_is_noop() -> Result<()> {
        let (_dir, hosts) = hosts_fixture(ORIGINAL);
        hosts.backup()?;
        hosts.apply(&small_list())?;

        assert!(hosts.restore()?);
        assert!(!hosts.restore()?);
        assert_eq!(fs::read_to_string(hosts.path())?, ORIGINAL);
        Ok(())
    }

    #[test]
    fn test_restore_without_backup_strips_leftover() -> Result<()> {
        let original = "127.0.0.1\tlocalhost\n";
        let (_dir, hosts) = hosts_fixture(original);
        hosts.apply(&small_list())?;

        assert!(hosts.needs_restore()?);
        assert!(hosts.restore()?);
        assert_eq!(fs::read_to_string(hosts.path())?, original);
        assert!(!hosts.needs_restore()?);
        Ok(())
    }

    #[test]
    fn test_existing_backup_is_kept() -> Result<()> {
        let (_dir, hosts) = hosts_fixture(ORIGINAL);
        hosts.backup()?;
        hosts.apply(&small_list())?;

        // A second backup must not capture the patched file
        hosts.backup()?;
        assert_eq!(fs::read_to_string(hosts_backup(hosts.path()))?, ORIGINAL);
        Ok(())
    }

    #[test]
    fn test_backup_fails_when_hosts_missing() {
        let dir = tempdir().unwrap();
        let hosts = HostsFile::new(&dir.path().join("missing"));
        assert!(hosts.backup().is_err());
        assert!(!hosts_backup(hosts.path()).exists());
    }

    #[test]
    fn test_strip_block_handles_truncated_and_repeated_sections() {
        let content = format!(
            "keep\n{start}\n127.0.0.1\ta.com\n{end}\nmiddle\n{start}\n127.0.0.1\tb.com\n",
            start = BLOCK_START,
            end = BLOCK_END
        );
        assert_eq!(strip_block(&content).as_deref(), Some("keep\nmiddle\n"));
        assert_eq!(strip_block("plain\n"), None);
    }

    #[test]
    fn test_custom_redirects() {
        let block = render_block(&small_list(), Ipv4Addr::UNSPECIFIED, Ipv6Addr::UNSPECIFIED);
        assert!(block.contains("0.0.0.0\treddit.com\n"));
        assert!(block.contains("::\twww.reddit.com\n"));
    }

    #[cfg(unix)]
    #[test]
    fn test_check_writable_reports_privilege() -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let (_dir, hosts) = hosts_fixture(ORIGINAL);
        hosts.check_writable()?;

        fs::set_permissions(hosts.path(), fs::Permissions::from_mode(0o444))?;
        if shield_core::process::is_root() {
            // root ignores file modes
            return Ok(());
        }

        let err = hosts.check_writable().unwrap_err();
        assert_eq!(
            err.downcast_ref::<ShieldError>(),
            Some(&ShieldError::NotPrivileged(hosts.path().to_path_buf()))
        );
        Ok(())
    }
}
