//! Blocklist of distracting domains
//!
//! Domains are normalized on the way in (lowercase, no scheme, no path or
//! port, no leading `www.`) and every root is stored together with its
//! `www.` variant. The set is ordered, so the persisted file and `list`
//! output are always sorted.
//!
//! Persisted as plain text at ~/.focus-shield/blocklist.txt, one domain per
//! line. Blank lines and `#` comments are ignored on load.

use anyhow::{bail, Context, Result};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::ShieldError;

/// Sites blocked out of the box
pub const DEFAULT_DOMAINS: [&str; 11] = [
    "twitter.com",
    "x.com",
    "facebook.com",
    "instagram.com",
    "reddit.com",
    "youtube.com",
    "tiktok.com",
    "linkedin.com",
    "netflix.com",
    "twitch.tv",
    "discord.com",
];

const WWW: &str = "www.";

/// Result of adding a domain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    /// Entries that were newly inserted
    Added(Vec<String>),
    /// Root and `www.` variant were both present already
    AlreadyBlocked(String),
}

/// Result of removing a domain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// Entries that were removed
    Removed(Vec<String>),
    /// Neither the root nor its `www.` variant was present
    NotBlocked(String),
}

/// Normalize user input into a bare root domain.
///
/// `https://www.Example.com/path` becomes `example.com`.
pub fn normalize(input: &str) -> Result<String> {
    let mut domain = input.trim().to_lowercase();
    if domain.is_empty() {
        bail!(ShieldError::EmptyDomain);
    }

    for scheme in ["https://", "http://"] {
        if let Some(rest) = domain.strip_prefix(scheme) {
            domain = rest.to_string();
        }
    }

    // Drop path, query, fragment and port
    if let Some(end) = domain.find(|c| matches!(c, '/' | '?' | '#' | ':')) {
        domain.truncate(end);
    }

    let domain = domain.trim_end_matches('.');
    let domain = domain.strip_prefix(WWW).unwrap_or(domain);

    if !is_valid_host(domain) {
        bail!(ShieldError::InvalidDomain(input.trim().to_string()));
    }

    Ok(domain.to_string())
}

/// Hostname check: at least two dot-separated labels of ASCII letters,
/// digits and inner hyphens.
fn is_valid_host(host: &str) -> bool {
    if host.is_empty() || host.len() > 253 || !host.contains('.') {
        return false;
    }

    host.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}

/// Ordered, deduplicated set of blocked hostnames
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Blocklist {
    domains: BTreeSet<String>,
}

impl Blocklist {
    /// Create an empty blocklist
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a blocklist seeded with [`DEFAULT_DOMAINS`]
    pub fn with_defaults() -> Self {
        let mut list = Self::new();
        for root in DEFAULT_DOMAINS {
            list.insert_root(root);
        }
        list
    }

    fn insert_root(&mut self, root: &str) -> Vec<String> {
        [root.to_string(), format!("{}{}", WWW, root)]
            .into_iter()
            .filter(|entry| self.domains.insert(entry.clone()))
            .collect()
    }

    /// Add a domain and its `www.` variant
    pub fn add(&mut self, input: &str) -> Result<AddOutcome> {
        let root = normalize(input)?;
        let added = self.insert_root(&root);

        if added.is_empty() {
            Ok(AddOutcome::AlreadyBlocked(root))
        } else {
            Ok(AddOutcome::Added(added))
        }
    }

    /// Remove a domain and its `www.` variant
    pub fn remove(&mut self, input: &str) -> Result<RemoveOutcome> {
        let root = normalize(input)?;
        let removed: Vec<String> = [root.clone(), format!("{}{}", WWW, root)]
            .into_iter()
            .filter(|entry| self.domains.remove(entry))
            .collect();

        if removed.is_empty() {
            Ok(RemoveOutcome::NotBlocked(root))
        } else {
            Ok(RemoveOutcome::Removed(removed))
        }
    }

    pub fn contains(&self, domain: &str) -> bool {
        self.domains.contains(domain)
    }

    /// Number of hostnames, `www.` variants included
    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    /// All hostnames in sorted order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.domains.iter().map(String::as_str)
    }

    /// Hostnames minus the `www.` variants whose root is also listed
    pub fn roots(&self) -> Vec<&str> {
        self.iter()
            .filter(|d| match d.strip_prefix(WWW) {
                Some(root) => !self.domains.contains(root),
                None => true,
            })
            .collect()
    }
}

/// Plain-text file backing the blocklist
#[derive(Debug, Clone)]
pub struct BlocklistStore {
    path: PathBuf,
}

impl BlocklistStore {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Load the blocklist, seeding the file with defaults on first run
    pub fn load(&self) -> Result<Blocklist> {
        if !self.path.exists() {
            debug!("No blocklist at {}, seeding defaults", self.path.display());
            let list = Blocklist::with_defaults();
            self.save(&list)?;
            return Ok(list);
        }

        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read blocklist: {}", self.path.display()))?;

        let mut list = Blocklist::new();
        for (line_num, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let host = line.to_lowercase();
            if is_valid_host(&host) {
                list.domains.insert(host);
            } else {
                warn!(
                    "Skipping invalid domain on line {} of {}: {}",
                    line_num + 1,
                    self.path.display(),
                    line
                );
            }
        }

        Ok(list)
    }

    /// Rewrite the file with the current contents, sorted
    pub fn save(&self, list: &Blocklist) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let mut content = String::new();
        for domain in list.iter() {
            content.push_str(domain);
            content.push('\n');
        }

        fs::write(&self.path, content)
            .with_context(|| format!("Failed to write blocklist: {}", self.path.display()))
    }
}
