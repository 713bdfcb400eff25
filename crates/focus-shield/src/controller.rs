//! Session controller
//!
//! [`Shield`] owns everything a session touches: the blocklist and its
//! store, the hosts editor, the notification silencer, the DNS flusher and
//! the session marker. Command handlers borrow it; nothing is global.
//!
//! Ordering rules:
//! - the hosts backup is written before the live file is patched
//! - blocking only counts as off once the hosts file is restored
//! - DND and DNS failures are logged and never abort a session

use anyhow::{bail, Result};
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::blocklist::{AddOutcome, Blocklist, BlocklistStore, RemoveOutcome};
use crate::dnd::NotificationSilencer;
use crate::dns::DnsCacheFlusher;
use crate::error::ShieldError;
use crate::hosts::HostsEditor;
use crate::session::{Outcome, Session, SessionRecord, MAX_MINUTES};
use crate::store::ShieldStore;
use crate::timer::{CancelToken, Countdown};

/// Session state as reported by `status`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Inactive,
    Timed {
        remaining: Duration,
        ends_at: DateTime<Utc>,
    },
    Diagnostic {
        since: DateTime<Utc>,
    },
}

/// The session controller
pub struct Shield {
    blocklist: Blocklist,
    blocklist_store: BlocklistStore,
    store: ShieldStore,
    hosts: Box<dyn HostsEditor>,
    silencer: Box<dyn NotificationSilencer>,
    flusher: Box<dyn DnsCacheFlusher>,
    session: Option<Session>,
    token: CancelToken,
}

impl Shield {
    /// Build a controller, loading (or seeding) the blocklist
    pub fn new(
        blocklist_store: BlocklistStore,
        store: ShieldStore,
        hosts: Box<dyn HostsEditor>,
        silencer: Box<dyn NotificationSilencer>,
        flusher: Box<dyn DnsCacheFlusher>,
    ) -> Result<Self> {
        let blocklist = blocklist_store.load()?;
        debug!(
            "Loaded {} blocked hostnames; dnd={} dns={}",
            blocklist.len(),
            silencer.name(),
            flusher.name()
        );

        Ok(Self {
            blocklist,
            blocklist_store,
            store,
            hosts,
            silencer,
            flusher,
            session: None,
            token: CancelToken::new(),
        })
    }

    pub fn blocklist(&self) -> &Blocklist {
        &self.blocklist
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn hosts_path(&self) -> &std::path::Path {
        self.hosts.path()
    }

    /// Countdown for the active timed session
    pub fn countdown(&self) -> Option<Countdown> {
        let end = self.session.as_ref()?.end_time()?;
        Some(Countdown::new(end, self.token.clone()))
    }

    /// Start a timed session of `minutes` at `now`
    pub fn start(&mut self, minutes: u32, now: DateTime<Utc>) -> Result<&Session> {
        if self.session.is_some() {
            bail!(ShieldError::SessionActive);
        }
        if minutes == 0 || minutes > MAX_MINUTES {
            bail!(ShieldError::InvalidDuration(minutes.to_string()));
        }

        self.engage()?;
        self.set_dnd(true);

        let session = Session::timed(now, minutes, self.blocklist.len());
        info!("Focus session started: {} minutes, {} hostnames", minutes, session.domains);
        Ok(self.activate(session))
    }

    /// Apply the block without a timer or DND, for diagnostics
    pub fn test_block(&mut self, now: DateTime<Utc>) -> Result<&Session> {
        if self.session.is_some() {
            bail!(ShieldError::SessionActive);
        }

        self.engage()?;

        let session = Session::diagnostic(now, self.blocklist.len());
        info!("Diagnostic block applied for {} hostnames", session.domains);
        Ok(self.activate(session))
    }

    /// End the active session. Returns the ended session, or `None` when
    /// nothing was active.
    ///
    /// If the hosts file cannot be restored the session stays active so the
    /// caller can retry.
    pub fn stop(&mut self, outcome: Outcome, now: DateTime<Utc>) -> Result<Option<Session>> {
        let Some(session) = self.session.clone() else {
            return Ok(None);
        };

        self.hosts.restore()?;
        self.flush_dns();
        if session.is_timed() {
            self.set_dnd(false);
        }

        self.token.cancel();
        self.session = None;
        self.finish(&session, outcome, now);

        info!("Focus session ended ({})", outcome.as_str());
        Ok(Some(session))
    }

    /// Report the session state at `now`
    pub fn status(&self, now: DateTime<Utc>) -> Status {
        match &self.session {
            None => Status::Inactive,
            Some(session) => match (session.remaining(now), session.end_time()) {
                (Some(remaining), Some(ends_at)) => Status::Timed { remaining, ends_at },
                _ => Status::Diagnostic {
                    since: session.started_at,
                },
            },
        }
    }

    /// Add a domain and persist; re-applies the block mid-session
    pub fn add(&mut self, domain: &str) -> Result<AddOutcome> {
        let outcome = self.blocklist.add(domain)?;
        if let AddOutcome::Added(_) = outcome {
            self.blocklist_changed()?;
        }
        Ok(outcome)
    }

    /// Remove a domain and persist; re-applies the block mid-session
    pub fn remove(&mut self, domain: &str) -> Result<RemoveOutcome> {
        let outcome = self.blocklist.remove(domain)?;
        if let RemoveOutcome::Removed(_) = outcome {
            self.blocklist_changed()?;
        }
        Ok(outcome)
    }

    /// Recorded sessions for the last `days` days
    pub fn history(&self, now: DateTime<Utc>, days: u32) -> Result<Vec<SessionRecord>> {
        self.store.get_sessions_for_days(now, days)
    }

    /// Clean up after a run that exited without restoring.
    ///
    /// Returns whether anything was left over.
    pub fn recover(&mut self, now: DateTime<Utc>) -> Result<bool> {
        let marker = match self.store.get_current_session() {
            Ok(marker) => marker,
            Err(e) => {
                warn!("Ignoring unreadable session marker: {:#}", e);
                None
            }
        };
        let leftover = self.hosts.needs_restore()?;

        if !leftover && marker.is_none() {
            return Ok(false);
        }

        if leftover {
            self.hosts.restore()?;
            self.flush_dns();
        }

        match marker {
            Some(session) => {
                if session.is_timed() {
                    self.set_dnd(false);
                }
                self.finish(&session, Outcome::Recovered, now);
            }
            None => self.clear_marker(),
        }

        info!("Recovered from an unclean exit");
        Ok(true)
    }

    /// Privilege check, backup, patch, flush
    fn engage(&mut self) -> Result<()> {
        self.hosts.check_writable()?;

        // A failed backup leaves nothing to restore from, so it aborts
        self.hosts.backup()?;

        if let Err(e) = self.hosts.apply(&self.blocklist) {
            if let Err(restore_err) = self.hosts.restore() {
                warn!("Failed to roll back hosts file: {:#}", restore_err);
            }
            return Err(e);
        }

        self.flush_dns();
        Ok(())
    }

    fn activate(&mut self, session: Session) -> &Session {
        if let Err(e) = self.store.save_current_session(&session) {
            warn!("Failed to save session marker: {:#}", e);
        }
        self.token.reset();
        self.session.insert(session)
    }

    /// Record history and drop the marker
    fn finish(&self, session: &Session, outcome: Outcome, now: DateTime<Utc>) {
        if let Some(record) = SessionRecord::from_session(session, now, outcome) {
            if let Err(e) = self.store.record_session(&record) {
                warn!("Failed to record session: {:#}", e);
            }
        }
        self.clear_marker();
    }

    fn clear_marker(&self) {
        if let Err(e) = self.store.clear_current_session() {
            warn!("Failed to clear session marker: {:#}", e);
        }
    }

    fn blocklist_changed(&mut self) -> Result<()> {
        self.blocklist_store.save(&self.blocklist)?;

        if let Some(session) = self.session.as_mut() {
            self.hosts.apply(&self.blocklist)?;
            session.domains = self.blocklist.len();
            self.flush_dns();
        }
        Ok(())
    }

    fn set_dnd(&self, enabled: bool) {
        if let Err(e) = self.silencer.set_do_not_disturb(enabled) {
            warn!(
                "Failed to turn Do Not Disturb {} ({}): {:#}",
                if enabled { "on" } else { "off" },
                self.silencer.name(),
                e
            );
        }
    }

    fn flush_dns(&self) {
        if let Err(e) = self.flusher.flush() {
            warn!("Failed to flush DNS cache ({}): {:#}", self.flusher.name(), e);
        }
    }
}
