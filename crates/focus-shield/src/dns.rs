//! Resolver cache flushing
//!
//! After the hosts file changes the OS may keep answering from its cache,
//! so blocked names would still resolve (or unblocked ones stay blocked).

use anyhow::Result;
use shield_core::process;
use tracing::debug;

/// Flushes the operating system's DNS cache
pub trait DnsCacheFlusher: Send + Sync {
    /// Return the backend name
    fn name(&self) -> &str;

    /// Drop cached resolutions
    fn flush(&self) -> Result<()>;
}

/// Available flush backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DnsFlushBackend {
    /// macOS dscacheutil + mDNSResponder
    MacOs,
    /// systemd-resolved via resolvectl
    Resolvectl,
    /// Older systemd-resolved releases
    SystemdResolve,
    /// No caching resolver to flush
    Disabled,
}

impl DnsFlushBackend {
    /// Detect the best available backend for the current platform
    pub fn detect() -> Self {
        #[cfg(target_os = "macos")]
        {
            return Self::MacOs;
        }

        #[cfg(target_os = "linux")]
        {
            if process::command_exists("resolvectl") {
                return Self::Resolvectl;
            }
            if process::command_exists("systemd-resolve") {
                return Self::SystemdResolve;
            }
            return Self::Disabled;
        }

        #[cfg(not(any(target_os = "macos", target_os = "linux")))]
        {
            Self::Disabled
        }
    }
}

impl DnsCacheFlusher for DnsFlushBackend {
    fn name(&self) -> &str {
        match self {
            Self::MacOs => "macos",
            Self::Resolvectl => "resolvectl",
            Self::SystemdResolve => "systemd-resolve",
            Self::Disabled => "disabled",
        }
    }

    fn flush(&self) -> Result<()> {
        debug!("Flushing DNS cache with {}", self.name());
        match self {
            Self::MacOs => {
                process::run("dscacheutil", &["-flushcache"])?;
                process::run("killall", &["-HUP", "mDNSResponder"])
            }
            Self::Resolvectl => process::run("resolvectl", &["flush-caches"]),
            Self::SystemdResolve => process::run("systemd-resolve", &["--flush-caches"]),
            Self::Disabled => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_flush_is_noop() {
        assert!(DnsFlushBackend::Disabled.flush().is_ok());
    }

    #[test]
    fn test_detect_picks_a_named_backend() {
        let backend = DnsFlushBackend::detect();
        assert!(!backend.name().is_empty());
    }
}
