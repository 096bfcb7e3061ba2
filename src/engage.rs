//! Engagement recording
//!
//! Turns a like into a durable preference signal: resolve the liked
//! activity in the global feed, require its genre, and increment the
//! ledger counter for `(user, genre)`.

use crate::error::{EuterpeError, Result};
use crate::ledger::EngagementLedger;
use crate::store::ActivityStore;
use crate::types::FeedKey;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Receipt for one recorded like
#[derive(Debug, Clone, Serialize)]
pub struct Engagement {
    pub user: String,
    pub foreign_id: String,
    /// Genre resolved from the liked activity
    pub genre: String,
    /// Like count for this genre after the increment
    pub likes: u64,
}

/// Records likes against the ledger
pub struct EngagementRecorder {
    store: Arc<dyn ActivityStore>,
    ledger: Arc<dyn EngagementLedger>,
    lookup_limit: usize,
}

impl EngagementRecorder {
    pub fn new(
        store: Arc<dyn ActivityStore>,
        ledger: Arc<dyn EngagementLedger>,
        lookup_limit: usize,
    ) -> Self {
        Self {
            store,
            ledger,
            lookup_limit,
        }
    }

    /// Record a like by `user` on the global activity `foreign_id`
    ///
    /// Resolution failures (unknown ID, missing genre) leave the ledger
    /// untouched. Repeat likes keep counting: the profile weighs repeated
    /// interest rather than deduplicating it.
    pub async fn record_like(&self, user: &str, foreign_id: &str) -> Result<Engagement> {
        let global = self
            .store
            .read_feed(&FeedKey::global(), self.lookup_limit)
            .await?;

        let post = global
            .iter()
            .find(|a| a.foreign_id == foreign_id)
            .ok_or_else(|| EuterpeError::NotFound(foreign_id.to_string()))?;

        let genre = post
            .genre
            .clone()
            .ok_or_else(|| EuterpeError::MissingGenre(foreign_id.to_string()))?;

        let likes = self.ledger.record_like(user, &genre).await?;
        info!("Recorded like by {} on genre {}", user, genre);

        Ok(Engagement {
            user: user.to_string(),
            foreign_id: foreign_id.to_string(),
            genre,
            likes,
        })
    }
}
