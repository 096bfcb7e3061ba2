//! Feed reconciliation
//!
//! Rebuilds one user's personalized feed from the global pool: load the
//! profile, score candidates, select above the threshold, then replace the
//! feed contents with remove-then-add. Deterministic derived IDs plus the
//! store's upsert semantics make rebuilds idempotent; per-item failures in
//! the replace phase are reported rather than swallowed.

use crate::config::RebuildSettings;
use crate::error::{EuterpeError, Result};
use crate::ledger::EngagementLedger;
use crate::profile::PreferenceSummary;
use crate::scoring::RelevanceScorer;
use crate::store::ActivityStore;
use crate::types::{Activity, FeedKey};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

// === Single-flight gate ===

/// Per-user single-flight guard for rebuilds
///
/// A second rebuild for the same user while one runs would race the
/// remove-then-add sequence, so the gate rejects it. Different users
/// proceed independently.
#[derive(Default)]
pub struct RebuildGate {
    in_flight: Mutex<HashSet<String>>,
}

impl RebuildGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to start a rebuild for `user`; `None` while one is in flight
    pub fn try_begin(self: &Arc<Self>, user: &str) -> Option<RebuildPermit> {
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if in_flight.insert(user.to_string()) {
            Some(RebuildPermit {
                gate: Arc::clone(self),
                user: user.to_string(),
            })
        } else {
            None
        }
    }
}

/// Releases the per-user slot on drop
pub struct RebuildPermit {
    gate: Arc<RebuildGate>,
    user: String,
}

impl Drop for RebuildPermit {
    fn drop(&mut self) {
        let mut in_flight = self
            .gate
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        in_flight.remove(&self.user);
    }
}

// === Rebuild report ===

/// Outcome classification for one rebuild
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RebuildStatus {
    /// Every removal and the append succeeded
    Full,
    /// The feed was rebuilt but some removals or the append failed
    Partial,
}

/// One failed removal during the replace phase
#[derive(Debug, Clone, Serialize)]
pub struct RemoveFailure {
    pub foreign_id: String,
    pub error: String,
}

/// Outcome of one rebuild
///
/// An `Err` from [`FeedReconciler::rebuild`] means nothing was mutated; a
/// report means the feed was rebuilt, with `Partial` flagging whatever
/// failed along the way.
#[derive(Debug, Clone, Serialize)]
pub struct RebuildReport {
    pub user: String,
    pub status: RebuildStatus,

    /// Candidates read from the global pool
    pub candidates: usize,

    /// Candidates whose score cleared the threshold
    pub selected: usize,

    /// Old personalized entries removed
    pub removed: usize,

    /// Personalized copies appended
    pub added: usize,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub remove_failures: Vec<RemoveFailure>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub append_error: Option<String>,
}

impl RebuildReport {
    pub fn is_full(&self) -> bool {
        self.status == RebuildStatus::Full
    }
}

// === Reconciler ===

/// Rebuilds personalized feeds from engagement profiles
pub struct FeedReconciler {
    store: Arc<dyn ActivityStore>,
    ledger: Arc<dyn EngagementLedger>,
    scorer: RelevanceScorer,
    gate: Arc<RebuildGate>,
    threshold: f32,
    candidate_page_size: usize,
    replace_page_size: usize,
}

impl FeedReconciler {
    pub fn new(
        store: Arc<dyn ActivityStore>,
        ledger: Arc<dyn EngagementLedger>,
        scorer: RelevanceScorer,
        settings: &RebuildSettings,
    ) -> Self {
        Self {
            store,
            ledger,
            scorer,
            gate: Arc::new(RebuildGate::new()),
            threshold: settings.relevance_threshold,
            candidate_page_size: settings.candidate_page_size,
            replace_page_size: settings.replace_page_size,
        }
    }

    /// Name of the oracle behind the scorer, for health reporting
    pub fn oracle_name(&self) -> &str {
        self.scorer.oracle_name()
    }

    /// Rebuild `user`'s personalized feed
    ///
    /// Idempotent: rebuild twice with unchanged inputs and the feed
    /// converges to the same content with no duplicates. An empty profile
    /// or an all-below-threshold batch yields an empty feed and a `Full`
    /// report.
    pub async fn rebuild(&self, user: &str) -> Result<RebuildReport> {
        let _permit = self
            .gate
            .try_begin(user)
            .ok_or_else(|| EuterpeError::RebuildInFlight(user.to_string()))?;

        info!("Rebuilding personalized feed for {}", user);

        // Read phase. A failure anywhere in here returns Err with the
        // feed untouched.
        let profile = self.ledger.profile(user).await?;
        let summary = PreferenceSummary::from_profile(&profile);

        let candidates = self
            .store
            .read_feed(&FeedKey::global(), self.candidate_page_size)
            .await?;
        let candidate_count = candidates.len();

        let scored = self.scorer.score_batch(candidates, &summary).await;
        let selected: Vec<Activity> = scored
            .iter()
            .filter(|s| s.relevance > self.threshold)
            .map(|s| s.activity.personalized(user, s.relevance))
            .collect();
        let selected_count = selected.len();

        debug!(
            "Scored {} candidates for {}, {} above threshold {}",
            candidate_count, user, selected_count, self.threshold
        );

        let personalized = FeedKey::personalized(user);
        let current = self
            .store
            .read_feed(&personalized, self.replace_page_size)
            .await?;

        // Replace phase: best-effort removals, then one append. Failures
        // from here on go into the report; the feed may already be
        // partially mutated.
        let mut removed = 0;
        let mut remove_failures = Vec::new();
        for activity in &current {
            match self
                .store
                .remove_activity(&personalized, &activity.foreign_id)
                .await
            {
                Ok(()) => removed += 1,
                Err(e) => {
                    warn!(
                        "Failed to remove {} from {}: {}",
                        activity.foreign_id, personalized, e
                    );
                    remove_failures.push(RemoveFailure {
                        foreign_id: activity.foreign_id.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        let (added, append_error) = match self.store.add_activities(&personalized, selected).await {
            Ok(n) => (n, None),
            Err(e) => {
                warn!("Failed to append personalized entries for {}: {}", user, e);
                (0, Some(e.to_string()))
            }
        };

        let status = if remove_failures.is_empty() && append_error.is_none() {
            RebuildStatus::Full
        } else {
            RebuildStatus::Partial
        };

        info!(
            "Rebuild for {} {:?}: {} candidates, {} selected, {} removed, {} added",
            user, status, candidate_count, selected_count, removed, added
        );

        Ok(RebuildReport {
            user: user.to_string(),
            status,
            candidates: candidate_count,
            selected: selected_count,
            removed,
            added,
            remove_failures,
            append_error,
        })
    }
}
