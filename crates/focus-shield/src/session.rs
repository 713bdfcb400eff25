//! Focus session types
//!
//! A session is either timed (has an end time and counts down) or a
//! diagnostic block started by `test`, which stays until `stop`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Longest session accepted, in minutes
pub const MAX_MINUTES: u32 = 24 * 60;

/// An active blocking session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// When blocking started
    pub started_at: DateTime<Utc>,
    /// Planned length in minutes; `None` for a diagnostic block
    pub duration: Option<u32>,
    /// Number of hostnames redirected
    pub domains: usize,
}

impl Session {
    /// Create a timed session starting at `now`
    pub fn timed(now: DateTime<Utc>, minutes: u32, domains: usize) -> Self {
        Self {
            started_at: now,
            duration: Some(minutes),
            domains,
        }
    }

    /// Create an untimed diagnostic session
    pub fn diagnostic(now: DateTime<Utc>, domains: usize) -> Self {
        Self {
            started_at: now,
            duration: None,
            domains,
        }
    }

    pub fn is_timed(&self) -> bool {
        self.duration.is_some()
    }

    /// When the session ends, if it is timed
    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.duration
            .map(|mins| self.started_at + Duration::minutes(i64::from(mins)))
    }

    /// Time left at `now`, clamped at zero. `None` for diagnostic sessions.
    pub fn remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.end_time()
            .map(|end| (end - now).max(Duration::zero()))
    }

    /// Whole minutes elapsed at `now`
    pub fn elapsed_minutes(&self, now: DateTime<Utc>) -> u32 {
        let secs = (now - self.started_at).num_seconds().max(0);
        u32::try_from(secs / 60).unwrap_or(u32::MAX)
    }
}

/// How a timed session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// The timer ran out
    Completed,
    /// `stop` or `quit` before the end
    Stopped,
    /// Ended by a signal
    Interrupted,
    /// Cleaned up at startup after an unclean exit
    Recovered,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Completed => "completed",
            Outcome::Stopped => "stopped",
            Outcome::Interrupted => "interrupted",
            Outcome::Recovered => "recovered",
        }
    }
}

/// A finished session (stored in the history logs)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Planned length in minutes
    pub planned: u32,
    /// Minutes actually spent blocked
    pub focused: u32,
    pub domains: usize,
    pub outcome: Outcome,
}

impl SessionRecord {
    /// Build a history record; diagnostic sessions are not recorded
    pub fn from_session(session: &Session, now: DateTime<Utc>, outcome: Outcome) -> Option<Self> {
        let planned = session.duration?;
        Some(Self {
            start: session.started_at,
            end: now,
            planned,
            focused: session.elapsed_minutes(now).min(planned),
            domains: session.domains,
            outcome,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_timed_end_time() {
        for minutes in [1, 25, 90, MAX_MINUTES] {
            let session = Session::timed(at(0), minutes, 22);
            assert_eq!(
                session.end_time(),
                Some(at(i64::from(minutes) * 60)),
                "{} minutes",
                minutes
            );
        }
    }

    #[test]
    fn test_remaining_and_expiry() {
        let session = Session::timed(at(0), 1, 22);
        assert_eq!(session.remaining(at(0)), Some(Duration::seconds(60)));
        assert_eq!(session.remaining(at(45)), Some(Duration::seconds(15)));
        assert_eq!(session.remaining(at(60)), Some(Duration::zero()));
        assert_eq!(session.remaining(at(61)), Some(Duration::zero()));
    }

    #[test]
    fn test_diagnostic_never_expires() {
        let session = Session::diagnostic(at(0), 22);
        assert!(!session.is_timed());
        assert_eq!(session.end_time(), None);
        assert_eq!(session.remaining(at(100_000)), None);
    }

    #[test]
    fn test_record_caps_focused_at_planned() {
        let session = Session::timed(at(0), 25, 22);

        let early = SessionRecord::from_session(&session, at(10 * 60 + 30), Outcome::Stopped).unwrap();
        assert_eq!(early.focused, 10);
        assert_eq!(early.planned, 25);

        let late = SessionRecord::from_session(&session, at(3600), Outcome::Recovered).unwrap();
        assert_eq!(late.focused, 25);
    }

    #[test]
    fn test_diagnostic_is_not_recorded() {
        let session = Session::diagnostic(at(0), 22);
        assert!(SessionRecord::from_session(&session, at(60), Outcome::Stopped).is_none());
    }

    #[test]
    fn test_session_json_roundtrip() {
        let session = Session::timed(at(0), 25, 22);
        let json = serde_json::to_string(&session).unwrap();
        let loaded: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, session);
    }
}
