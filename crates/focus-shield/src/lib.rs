//! focus-shield - Block distracting sites and silence notifications
//!
//! For the length of a focus session the tool:
//! - points every blocklisted hostname at loopback in the hosts file
//! - turns on the desktop "do not disturb" mode
//! - counts down, then puts everything back
//!
//! Commands (interactive):
//! - start [MINS]: Start a focus session (default: 25 minutes)
//! - stop: End the current session early
//! - add / remove DOMAIN: Edit the blocklist
//! - list, status, history [DAYS]
//! - test: Apply the block without a timer

pub mod blocklist;
pub mod command;
pub mod controller;
pub mod dnd;
pub mod dns;
pub mod error;
pub mod hosts;
pub mod repl;
pub mod session;
pub mod stats;
pub mod store;
pub mod timer;
pub mod ui;

#[cfg(test)]
mod testing;

pub use blocklist::{Blocklist, BlocklistStore};
pub use controller::{Shield, Status};
pub use error::ShieldError;
pub use session::{Outcome, Session, SessionRecord};
pub use store::ShieldStore;
