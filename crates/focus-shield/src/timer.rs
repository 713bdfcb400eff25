//! Cancellable countdown
//!
//! The countdown itself holds no thread or timer: it is a deadline plus a
//! cancellation flag, polled by whoever drives it (the REPL ticks it once
//! per [`TICK_INTERVAL`]).

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// How often the countdown is polled and redrawn
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Shared cooperative cancellation flag
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Re-arm the token for the next session
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Result of polling a countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Still running, with this much left
    Remaining(Duration),
    /// Deadline reached
    Expired,
    /// Token was cancelled
    Cancelled,
}

/// A deadline that can be cancelled early
#[derive(Debug, Clone)]
pub struct Countdown {
    deadline: DateTime<Utc>,
    token: CancelToken,
}

impl Countdown {
    pub fn new(deadline: DateTime<Utc>, token: CancelToken) -> Self {
        Self { deadline, token }
    }

    /// Check the countdown at `now`. Cancellation wins over expiry.
    pub fn poll(&self, now: DateTime<Utc>) -> Tick {
        if self.token.is_cancelled() {
            return Tick::Cancelled;
        }

        match (self.deadline - now).to_std() {
            Ok(left) if !left.is_zero() => Tick::Remaining(left),
            _ => Tick::Expired,
        }
    }
}

/// Whole seconds left, rounded up so a fresh 25 minute session shows 25:00
pub fn display_seconds(left: Duration) -> u64 {
    let secs = left.as_secs();
    if left.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}
