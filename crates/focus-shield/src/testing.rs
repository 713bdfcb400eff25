//! Test doubles and fixtures shared by unit tests

use anyhow::{bail, Result};
use chrono::{DateTime, TimeZone, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::{tempdir, TempDir};

use crate::blocklist::BlocklistStore;
use crate::controller::Shield;
use crate::blocklist::Blocklist;
use crate::dnd::NotificationSilencer;
use crate::dns::DnsCacheFlusher;
use crate::error::ShieldError;
use crate::hosts::{HostsEditor, HostsFile};
use crate::store::ShieldStore;

pub const ORIGINAL_HOSTS: &str = "127.0.0.1\tlocalhost\n255.255.255.255\tbroadcasthost\n::1\tlocalhost\n";

/// Fixed instant offset by `secs`
pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

pub fn backup_of(hosts: &Path) -> PathBuf {
    shield_core::paths::hosts_backup(hosts)
}

/// Silencer that records every toggle
#[derive(Clone, Default)]
pub struct RecordingSilencer {
    calls: Arc<Mutex<Vec<bool>>>,
    fail: bool,
}

impl NotificationSilencer for RecordingSilencer {
    fn name(&self) -> &str {
        "recording"
    }

    fn set_do_not_disturb(&self, enabled: bool) -> Result<()> {
        self.calls.lock().unwrap().push(enabled);
        if self.fail {
            bail!("osascript failed with status: 1");
        }
        Ok(())
    }
}

/// Flusher that counts invocations
#[derive(Clone, Default)]
pub struct CountingFlusher {
    count: Arc<AtomicUsize>,
    fail: bool,
}

impl DnsCacheFlusher for CountingFlusher {
    fn name(&self) -> &str {
        "counting"
    }

    fn flush(&self) -> Result<()> {
        self.count.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            bail!("resolvectl failed with status: 1");
        }
        Ok(())
    }
}

/// Hosts file the current user may read but not write. Everything except
/// the privilege check goes to a real [`HostsFile`].
pub struct ReadOnlyHosts(pub HostsFile);

impl HostsEditor for ReadOnlyHosts {
    fn path(&self) -> &Path {
        self.0.path()
    }

    fn check_writable(&self) -> Result<()> {
        bail!(ShieldError::NotPrivileged(self.0.path().to_path_buf()))
    }

    fn backup(&self) -> Result<()> {
        self.0.backup()
    }

    fn apply(&self, blocklist: &Blocklist) -> Result<()> {
        self.0.apply(blocklist)
    }

    fn restore(&self) -> Result<bool> {
        self.0.restore()
    }

    fn needs_restore(&self) -> Result<bool> {
        self.0.needs_restore()
    }
}

/// A controller over a temporary hosts file and state directory
pub struct Fixture {
    _dir: TempDir,
    pub hosts_path: PathBuf,
    pub blocklist_path: PathBuf,
    pub store: ShieldStore,
    pub shield: Shield,
    silencer: RecordingSilencer,
    flusher: CountingFlusher,
    read_only: bool,
}

impl Fixture {
    pub fn new() -> Self {
        Self::build(false, false)
    }

    /// Fixture whose DND and DNS collaborators always fail
    pub fn failing() -> Self {
        Self::build(true, false)
    }

    /// Fixture whose hosts file refuses writes, as for a non-root user
    pub fn read_only() -> Self {
        Self::build(false, true)
    }

    fn build(fail: bool, read_only: bool) -> Self {
        let dir = tempdir().unwrap();
        let hosts_path = dir.path().join("hosts");
        fs::write(&hosts_path, ORIGINAL_HOSTS).unwrap();

        let state = dir.path().join("state");
        let blocklist_path = state.join("blocklist.txt");
        let store = ShieldStore::new(&state).unwrap();

        let silencer = RecordingSilencer {
            fail,
            ..Default::default()
        };
        let flusher = CountingFlusher {
            fail,
            ..Default::default()
        };

        let shield = open(&hosts_path, &blocklist_path, &store, &silencer, &flusher, read_only);

        Self {
            _dir: dir,
            hosts_path,
            blocklist_path,
            store,
            shield,
            silencer,
            flusher,
            read_only,
        }
    }

    /// A second controller over the same files, as after a restart
    pub fn reopen(&self) -> Shield {
        open(
            &self.hosts_path,
            &self.blocklist_path,
            &self.store,
            &self.silencer,
            &self.flusher,
            self.read_only,
        )
    }

    pub fn dnd_calls(&self) -> Vec<bool> {
        self.silencer.calls.lock().unwrap().clone()
    }

    pub fn flushes(&self) -> usize {
        self.flusher.count.load(Ordering::SeqCst)
    }
}

fn open(
    hosts_path: &Path,
    blocklist_path: &Path,
    store: &ShieldStore,
    silencer: &RecordingSilencer,
    flusher: &CountingFlusher,
    read_only: bool,
) -> Shield {
    let file = HostsFile::new(hosts_path);
    let hosts: Box<dyn HostsEditor> = if read_only {
        Box::new(ReadOnlyHosts(file))
    } else {
        Box::new(file)
    };

    Shield::new(
        BlocklistStore::new(blocklist_path),
        store.clone(),
        hosts,
        Box::new(silencer.clone()),
        Box::new(flusher.clone()),
    )
    .unwrap()
}
