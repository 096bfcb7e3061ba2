//! Engagement ledger
//!
//! Durable per-user genre like-counters behind a capability trait, so the
//! recorder and the rebuild pipeline compose over any implementation.

pub mod file;

pub use file::FileLedger;

use crate::error::Result;
use crate::profile::PreferenceProfile;
use async_trait::async_trait;

/// Ledger trait defining the counter operations
#[async_trait]
pub trait EngagementLedger: Send + Sync {
    /// Increment the like counter for `(user, genre)`, creating user and
    /// genre entries on first touch; returns the new count
    async fn record_like(&self, user: &str, genre: &str) -> Result<u64>;

    /// Snapshot of `user`'s profile; empty for a never-seen user
    async fn profile(&self, user: &str) -> Result<PreferenceProfile>;

    /// Persist any buffered state
    async fn flush(&self) -> Result<()>;
}
