//! JSON-file-backed engagement ledger
//!
//! One document maps user ID to profile. Every mutation rewrites the file
//! through a temp file and rename, so the snapshot on disk is always
//! complete and parseable.

use super::EngagementLedger;
use crate::error::{EuterpeError, Result};
use crate::profile::PreferenceProfile;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// File-backed ledger holding all profiles in memory, persisting on write
pub struct FileLedger {
    path: PathBuf,
    profiles: RwLock<HashMap<String, PreferenceProfile>>,
}

impl FileLedger {
    /// Open the ledger at `path`, loading any existing snapshot
    ///
    /// A missing or empty file is an empty ledger. An unreadable or
    /// unparseable file is an error and the ledger refuses to open.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let profiles: HashMap<String, PreferenceProfile> = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => HashMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                EuterpeError::Ledger(format!("Corrupt ledger at {}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                return Err(EuterpeError::Ledger(format!(
                    "Failed to read ledger at {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        info!(
            "Opened engagement ledger at {} ({} users)",
            path.display(),
            profiles.len()
        );

        Ok(Self {
            path,
            profiles: RwLock::new(profiles),
        })
    }

    /// Write the full snapshot through a temp file + atomic rename
    ///
    /// Callers hold at least the read lock, so the snapshot is consistent.
    async fn persist(&self, profiles: &HashMap<String, PreferenceProfile>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let json = serde_json::to_vec_pretty(profiles)?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, &json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of users with at least one recorded like
    pub async fn user_count(&self) -> usize {
        self.profiles.read().await.len()
    }
}

#[async_trait]
impl EngagementLedger for FileLedger {
    async fn record_like(&self, user: &str, genre: &str) -> Result<u64> {
        let mut profiles = self.profiles.write().await;
        let count = profiles
            .entry(user.to_string())
            .or_default()
            .record_like(genre);

        // Persist under the write lock: a read after this call sees what
        // the file sees.
        self.persist(&profiles).await?;

        debug!("Recorded like by {} on genre {} (count {})", user, genre, count);
        Ok(count)
    }

    async fn profile(&self, user: &str) -> Result<PreferenceProfile> {
        let profiles = self.profiles.read().await;
        Ok(profiles.get(user).cloned().unwrap_or_default())
    }

    async fn flush(&self) -> Result<()> {
        let profiles = self.profiles.read().await;
        self.persist(&profiles).await
    }
}
