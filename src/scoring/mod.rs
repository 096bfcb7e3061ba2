//! Relevance scoring
//!
//! Turns a candidate activity plus a preference summary into a prompt,
//! asks the oracle, and parses a score out of the reply. Batches fan out
//! under a concurrency bound with a per-item timeout; any per-item failure
//! substitutes the default score instead of aborting the batch.

pub mod oracle;

pub use oracle::{LlmOracle, PopularityOracle, RelevanceOracle};

use crate::profile::PreferenceSummary;
use crate::types::{Activity, ScoredActivity};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Score substituted when a candidate cannot be scored
pub const DEFAULT_SCORE: f32 = 0.0;

/// Render the scoring prompt for one candidate
///
/// The oracle sees the post metadata and the ranked preference block, and
/// is asked for a single decimal in [0, 1].
pub fn build_prompt(genre: &str, popularity: u32, preference_context: &str) -> String {
    format!(
        r#"Post metadata:
- Genre: {}
- Popularity score: {}

User preference:
{}

On a scale from 0 to 1, how likely is it that this user would find this post highly relevant and engaging? Reply with just a decimal number."#,
        genre, popularity, preference_context
    )
}

/// Parse an oracle reply into a relevance score
///
/// Accepts a bare decimal, falling back to the first whitespace token for
/// chatty replies like `0.8 given the rock preference`. Only finite values
/// in [0, 1] count; anything else is `None` and the caller substitutes the
/// default.
pub fn parse_relevance(reply: &str) -> Option<f32> {
    let trimmed = reply.trim();
    let parsed = trimmed.parse::<f32>().ok().or_else(|| {
        trimmed
            .split_whitespace()
            .next()
            .and_then(|token| token.parse::<f32>().ok())
    })?;

    (parsed.is_finite() && (0.0..=1.0).contains(&parsed)).then_some(parsed)
}

/// Batch scorer fanning out oracle calls under a concurrency bound
pub struct RelevanceScorer {
    oracle: Arc<dyn RelevanceOracle>,
    concurrency: usize,
    timeout: Duration,
}

impl RelevanceScorer {
    pub fn new(oracle: Arc<dyn RelevanceOracle>, concurrency: usize, timeout: Duration) -> Self {
        Self {
            oracle,
            concurrency: concurrency.max(1),
            timeout,
        }
    }

    /// Name of the oracle behind this scorer
    pub fn oracle_name(&self) -> &str {
        self.oracle.name()
    }

    /// Score every candidate against the preference summary
    ///
    /// Output preserves input order and length: a failed, timed-out, or
    /// unscorable candidate comes back with the default score rather than
    /// disappearing. At most `concurrency` oracle calls are in flight.
    pub async fn score_batch(
        &self,
        candidates: Vec<Activity>,
        summary: &PreferenceSummary,
    ) -> Vec<ScoredActivity> {
        if candidates.is_empty() {
            return Vec::new();
        }

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let context = summary.prompt_context();

        let futures = candidates.into_iter().map(|activity| {
            let semaphore = Arc::clone(&semaphore);
            let oracle = Arc::clone(&self.oracle);
            let context = context.clone();
            let timeout = self.timeout;

            async move {
                let relevance =
                    score_one(oracle, semaphore, &activity, &context, timeout).await;
                ScoredActivity {
                    activity,
                    relevance,
                }
            }
        });

        join_all(futures).await
    }
}

/// Score a single candidate, mapping every failure to the default score
async fn score_one(
    oracle: Arc<dyn RelevanceOracle>,
    semaphore: Arc<Semaphore>,
    activity: &Activity,
    context: &str,
    timeout: Duration,
) -> f32 {
    let Some(genre) = activity.genre.as_deref() else {
        debug!(
            "Candidate {} has no genre, using default score",
            activity.foreign_id
        );
        return DEFAULT_SCORE;
    };

    let prompt = build_prompt(genre, activity.popularity, context);

    // The semaphore is never closed; acquisition fails only while the
    // runtime is tearing down.
    let _permit = match semaphore.acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => return DEFAULT_SCORE,
    };

    match tokio::time::timeout(timeout, oracle.score_text(&prompt)).await {
        Ok(Ok(reply)) => match parse_relevance(&reply) {
            Some(score) => score,
            None => {
                warn!(
                    "Unparseable oracle reply for {}: {:?}",
                    activity.foreign_id, reply
                );
                DEFAULT_SCORE
            }
        },
        Ok(Err(e)) => {
            warn!("Oracle call failed for {}: {}", activity.foreign_id, e);
            DEFAULT_SCORE
        }
        Err(_) => {
            warn!(
                "Oracle call for {} timed out after {:?}",
                activity.foreign_id, timeout
            );
            DEFAULT_SCORE
        }
    }
}
