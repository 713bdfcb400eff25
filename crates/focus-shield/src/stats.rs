//! Session history statistics
//!
//! Aggregates session records into totals, completion rate and average
//! time blocked.

use crate::session::{Outcome, SessionRecord};

/// Aggregated history statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryStats {
    pub total_sessions: u32,
    /// Sessions that ran until the timer expired
    pub completed_sessions: u32,
    /// Sessions ended by stop, quit, a signal or crash recovery
    pub ended_early: u32,
    /// Total minutes spent blocked
    pub total_minutes: u32,
    /// Completion rate as percentage (0-100)
    pub completion_rate: u32,
    /// Average minutes blocked per session
    pub average_minutes: u32,
}

impl HistoryStats {
    /// Calculate statistics from session records
    pub fn from_records(records: &[SessionRecord]) -> Self {
        if records.is_empty() {
            return Self::default();
        }

        let total_sessions = records.len() as u32;
        let completed_sessions = records
            .iter()
            .filter(|r| r.outcome == Outcome::Completed)
            .count() as u32;
        let total_minutes: u32 = records.iter().map(|r| r.focused).sum();

        Self {
            total_sessions,
            completed_sessions,
            ended_early: total_sessions - completed_sessions,
            total_minutes,
            completion_rate: (completed_sessions * 100) / total_sessions,
            average_minutes: total_minutes / total_sessions,
        }
    }

    /// Total time as (hours, minutes)
    pub fn total_time(&self) -> (u32, u32) {
        (self.total_minutes / 60, self.total_minutes % 60)
    }
}
