//! Activity store
//!
//! Feed CRUD behind a capability trait with two implementations: an
//! in-process store for standalone serving and tests, and a REST client
//! for a remote feed service.

pub mod memory;
pub mod rest;

pub use memory::MemoryStore;
pub use rest::RestStore;

use crate::error::Result;
use crate::types::{Activity, FeedKey};
use async_trait::async_trait;

/// Store trait defining the feed operations
#[async_trait]
pub trait ActivityStore: Send + Sync {
    /// Batch upsert keyed by foreign ID; returns the number written
    ///
    /// An activity whose foreign ID already exists in the feed replaces
    /// the prior entry. This is what makes re-adding during a rebuild
    /// safe.
    async fn add_activities(&self, feed: &FeedKey, activities: Vec<Activity>) -> Result<usize>;

    /// Newest-first page of at most `limit` activities
    async fn read_feed(&self, feed: &FeedKey, limit: usize) -> Result<Vec<Activity>>;

    /// Remove one activity by foreign ID
    ///
    /// Removing an absent ID succeeds; the remove phase of a rebuild is
    /// keyed off a feed read that may race other writers, so absence is
    /// normal.
    async fn remove_activity(&self, feed: &FeedKey, foreign_id: &str) -> Result<()>;
}
