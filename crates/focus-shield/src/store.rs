//! Session storage
//!
//! Handles persisting the active-session marker and finished-session logs.
//! - Current session: ~/.focus-shield/current_session
//! - Session logs: ~/.focus-shield/sessions-YYYY-MM-DD.jsonl
//!
//! The marker only exists while the hosts file is patched. Finding it at
//! startup means the previous run never cleaned up.

use anyhow::{Context, Result};
use chrono::{DateTime, Days, NaiveDate, Utc};
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::session::{Session, SessionRecord};

/// Longest history window `history` will read (about ten years)
pub const MAX_HISTORY_DAYS: u32 = 3650;

/// Session store
#[derive(Debug, Clone)]
pub struct ShieldStore {
    /// Base directory for session data
    data_dir: PathBuf,
}

impl ShieldStore {
    /// Create a store rooted at the given data directory
    pub fn new(data_dir: &Path) -> Result<Self> {
        fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        Ok(Self {
            data_dir: data_dir.to_path_buf(),
        })
    }

    fn current_session_path(&self) -> PathBuf {
        self.data_dir.join("current_session")
    }

    fn session_log_path(&self, date: &NaiveDate) -> PathBuf {
        self.data_dir.join(format!("sessions-{}.jsonl", date))
    }

    /// Get the active session marker, if any
    pub fn get_current_session(&self) -> Result<Option<Session>> {
        let path = self.current_session_path();
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read current session: {}", path.display()))?;

        if content.trim().is_empty() {
            return Ok(None);
        }

        let session: Session = serde_json::from_str(&content)
            .context("Failed to parse current session JSON")?;

        Ok(Some(session))
    }

    /// Save the active session marker
    pub fn save_current_session(&self, session: &Session) -> Result<()> {
        let path = self.current_session_path();
        let content = serde_json::to_string_pretty(session)
            .context("Failed to serialize session")?;

        fs::write(&path, content)
            .with_context(|| format!("Failed to write current session: {}", path.display()))
    }

    /// Remove the active session marker
    pub fn clear_current_session(&self) -> Result<()> {
        let path = self.current_session_path();
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove current session: {}", path.display()))?;
        }
        Ok(())
    }

    /// Append a finished session to the log for the day it started
    pub fn record_session(&self, record: &SessionRecord) -> Result<()> {
        let path = self.session_log_path(&record.start.date_naive());

        let line = serde_json::to_string(record)
            .context("Failed to serialize session record")?;

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open session log: {}", path.display()))?;

        writeln!(file, "{}", line)
            .with_context(|| format!("Failed to write to session log: {}", path.display()))
    }

    /// Get all recorded sessions that started on a specific date
    pub fn get_sessions_for_date(&self, date: &NaiveDate) -> Result<Vec<SessionRecord>> {
        let path = self.session_log_path(date);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let file = fs::File::open(&path)
            .with_context(|| format!("Failed to open session log: {}", path.display()))?;

        let mut records = Vec::new();
        for (line_num, line) in BufReader::new(file).lines().enumerate() {
            let line = line
                .with_context(|| format!("Failed to read line {} of session log", line_num + 1))?;

            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str::<SessionRecord>(&line) {
                Ok(record) => records.push(record),
                // One corrupt line shouldn't hide the rest of the day
                Err(e) => warn!(
                    "Skipping unparseable session on line {} of {}: {}",
                    line_num + 1,
                    path.display(),
                    e
                ),
            }
        }

        Ok(records)
    }

    /// Get recorded sessions for the `days` days ending at `today`, oldest first.
    /// The window is capped at [`MAX_HISTORY_DAYS`].
    pub fn get_sessions_for_days(&self, today: DateTime<Utc>, days: u32) -> Result<Vec<SessionRecord>> {
        let today = today.date_naive();
        let mut all = Vec::new();

        for i in 0..days.min(MAX_HISTORY_DAYS) {
            let Some(date) = today.checked_sub_days(Days::new(u64::from(i))) else {
                break;
            };
            all.extend(self.get_sessions_for_date(&date)?);
        }

        all.sort_by_key(|r| r.start);
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Outcome;
    use chrono::Duration;
    use tempfile::tempdir;

    fn record(start: DateTime<Utc>, outcome: Outcome) -> SessionRecord {
        let session = Session::timed(start, 25, 22);
        SessionRecord::from_session(&session, start + Duration::minutes(25), outcome).unwrap()
    }

    #[test]
    fn test_no_current_session() -> Result<()> {
        let dir = tempdir()?;
        let store = ShieldStore::new(dir.path())?;
        assert!(store.get_current_session()?.is_none());
        Ok(())
    }

    #[test]
    fn test_save_get_clear_session() -> Result<()> {
        let dir = tempdir()?;
        let store = ShieldStore::new(dir.path())?;

        let session = Session::timed(Utc::now(), 25, 22);
        store.save_current_session(&session)?;
        assert_eq!(store.get_current_session()?, Some(session));

        store.clear_current_session()?;
        assert!(store.get_current_session()?.is_none());

        // Clearing twice is fine
        store.clear_current_session()?;
        Ok(())
    }

    #[test]
    fn test_corrupt_marker_is_error() -> Result<()> {
        let dir = tempdir()?;
        let store = ShieldStore::new(dir.path())?;
        fs::write(dir.path().join("current_session"), "{not json")?;
        assert!(store.get_current_session().is_err());
        Ok(())
    }

    #[test]
    fn test_record_and_retrieve_sessions() -> Result<()> {
        let dir = tempdir()?;
        let store = ShieldStore::new(dir.path())?;
        let now = Utc::now();

        store.record_session(&record(now - Duration::days(1), Outcome::Completed))?;
        store.record_session(&record(now, Outcome::Stopped))?;
        store.record_session(&record(now - Duration::days(10), Outcome::Completed))?;

        let week = store.get_sessions_for_days(now, 7)?;
        assert_eq!(week.len(), 2);
        assert!(week[0].start < week[1].start);
        assert_eq!(week[1].outcome, Outcome::Stopped);
        Ok(())
    }

    #[test]
    fn test_bad_log_lines_are_skipped() -> Result<()> {
        let dir = tempdir()?;
        let store = ShieldStore::new(dir.path())?;
        let now = Utc::now();

        store.record_session(&record(now, Outcome::Completed))?;
        let path = dir.path().join(format!("sessions-{}.jsonl", now.date_naive()));
        let mut file = fs::OpenOptions::new().append(true).open(&path)?;
        writeln!(file, "garbage")?;

        assert_eq!(store.get_sessions_for_date(&now.date_naive())?.len(), 1);
        Ok(())
    }

    #[test]
    fn test_history_window_never_underflows() -> Result<()> {
        let dir = tempdir()?;
        let store = ShieldStore::new(dir.path())?;

        let near_min = DateTime::<Utc>::MIN_UTC + Duration::days(3);
        assert!(store.get_sessions_for_days(near_min, u32::MAX)?.is_empty());
        assert!(store.get_sessions_for_days(Utc::now(), u32::MAX)?.is_empty());
        Ok(())
    }
}
