//! On-disk snapshot of a successful load.
//!
//! The same file serves as a time-limited cache (a fresh snapshot is used
//! instead of fetching) and as the static fallback dataset when a live fetch
//! fails.

use crate::error::{PortfolioError, Result};
use crate::merge::MergedPublication;
use crate::scholar::ScholarProfile;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Default cache lifetime in hours
pub const DEFAULT_TTL_HOURS: i64 = 24;

/// Default snapshot path: `~/.scholarfolio_snapshot.json`
fn default_snapshot_path() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|p| p.join(".scholarfolio_snapshot.json"))
        .ok_or_else(|| PortfolioError::Config("Cannot determine home directory".to_string()))
}

/// Everything needed to render the page without network access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub generated_at: DateTime<Utc>,
    #[serde(default)]
    pub profile: Option<ScholarProfile>,
    pub publications: Vec<MergedPublication>,
}

impl Snapshot {
    pub fn new(profile: Option<ScholarProfile>, publications: Vec<MergedPublication>) -> Self {
        Self {
            generated_at: Utc::now(),
            profile,
            publications,
        }
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.generated_at
    }
}

/// Loads and saves the snapshot file
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
    ttl: Duration,
}

impl SnapshotStore {
    /// Store at the default path with the default TTL
    pub fn new() -> Result<Self> {
        Ok(Self {
            path: default_snapshot_path()?,
            ttl: Duration::hours(DEFAULT_TTL_HOURS),
        })
    }

    /// Store at a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            path,
            ttl: Duration::hours(DEFAULT_TTL_HOURS),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Load the snapshot regardless of age.
    ///
    /// Returns None if the file doesn't exist or is invalid
    pub fn load(&self) -> Option<Snapshot> {
        if !self.path.exists() {
            debug!("Snapshot file not found: {:?}", self.path);
            return None;
        }

        match std::fs::read_to_string(&self.path) {
            Ok(content) => match serde_json::from_str::<Snapshot>(&content) {
                Ok(snapshot) => {
                    info!(
                        "Loaded snapshot with {} publications from {:?}",
                        snapshot.publications.len(),
                        self.path
                    );
                    Some(snapshot)
                }
                Err(e) => {
                    warn!("Failed to parse snapshot: {}", e);
                    None
                }
            },
            Err(e) => {
                warn!("Failed to read snapshot file: {}", e);
                None
            }
        }
    }

    /// Load the snapshot only if it is younger than the TTL at `now`.
    pub fn load_fresh(&self, now: DateTime<Utc>) -> Option<Snapshot> {
        self.load().filter(|s| {
            let age = s.age(now);
            let fresh = age >= Duration::zero() && age < self.ttl;
            debug!(age_secs = age.num_seconds(), fresh = fresh, "Snapshot age");
            fresh
        })
    }

    /// Save the snapshot to file
    pub fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let content = serde_json::to_string_pretty(snapshot)?;
        std::fs::write(&self.path, content)?;
        info!(
            "Saved snapshot with {} publications to {:?}",
            snapshot.publications.len(),
            self.path
        );
        Ok(())
    }

    /// Delete the stored snapshot
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
            info!("Cleared snapshot at {:?}", self.path);
        }
        Ok(())
    }
}
