//! Common test utilities and helpers

use async_trait::async_trait;
use euterpe_core::{
    api::{ApiServer, ApiServerConfig},
    config::RebuildSettings,
    engage::EngagementRecorder,
    error::{EuterpeError, Result},
    ledger::{EngagementLedger, FileLedger},
    reconcile::FeedReconciler,
    scoring::{RelevanceOracle, RelevanceScorer},
    seed,
    store::{ActivityStore, MemoryStore},
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Oracle with scripted per-genre replies
///
/// Replies are keyed by the genre named in the prompt. Unscripted genres
/// reply "0.0"; genres listed as failing return an error instead.
pub struct ScriptedOracle {
    replies: HashMap<String, String>,
    failing: Vec<String>,
    delay: Option<Duration>,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self {
            replies: HashMap::new(),
            failing: Vec::new(),
            delay: None,
        }
    }

    pub fn with_reply(mut self, genre: &str, reply: &str) -> Self {
        self.replies.insert(genre.to_string(), reply.to_string());
        self
    }

    pub fn failing_for(mut self, genre: &str) -> Self {
        self.failing.push(genre.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn genre_of(prompt: &str) -> Option<String> {
        prompt
            .lines()
            .find_map(|line| line.trim().strip_prefix("- Genre:"))
            .map(|rest| rest.trim().to_string())
    }
}

#[async_trait]
impl RelevanceOracle for ScriptedOracle {
    async fn score_text(&self, prompt: &str) -> Result<String> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let genre = Self::genre_of(prompt).unwrap_or_default();
        if self.failing.contains(&genre) {
            return Err(EuterpeError::OracleUnavailable(format!(
                "scripted failure for {}",
                genre
            )));
        }

        Ok(self
            .replies
            .get(&genre)
            .cloned()
            .unwrap_or_else(|| "0.0".to_string()))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Assembled pipeline components over the given store and oracle
pub struct TestPipeline {
    pub recorder: Arc<EngagementRecorder>,
    pub reconciler: Arc<FeedReconciler>,
    pub ledger: Arc<FileLedger>,
}

/// Build a full pipeline with a file ledger under `dir`
pub async fn test_pipeline(
    dir: &TempDir,
    store: Arc<dyn ActivityStore>,
    oracle: Arc<dyn RelevanceOracle>,
) -> TestPipeline {
    let ledger = Arc::new(
        FileLedger::open(dir.path().join("engagements.json"))
            .await
            .expect("Failed to open test ledger"),
    );
    let ledger_dyn: Arc<dyn EngagementLedger> = ledger.clone();

    let scorer = RelevanceScorer::new(oracle, 4, Duration::from_secs(5));
    let recorder = Arc::new(EngagementRecorder::new(
        store.clone(),
        ledger_dyn.clone(),
        100,
    ));
    let reconciler = Arc::new(FeedReconciler::new(
        store,
        ledger_dyn,
        scorer,
        &RebuildSettings::default(),
    ));

    TestPipeline {
        recorder,
        reconciler,
        ledger,
    }
}

/// In-memory store pre-loaded with the demo catalog
pub async fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    seed::seed_global(store.as_ref())
        .await
        .expect("Failed to seed demo catalog");
    store
}

/// Full HTTP app over an in-memory store, for oneshot request tests
pub async fn test_router(dir: &TempDir, oracle: Arc<dyn RelevanceOracle>) -> axum::Router {
    let store: Arc<dyn ActivityStore> = Arc::new(MemoryStore::new());
    let pipeline = test_pipeline(dir, store.clone(), oracle).await;

    let server = ApiServer::new(
        ApiServerConfig::default(),
        store,
        pipeline.ledger as Arc<dyn EngagementLedger>,
        pipeline.recorder,
        pipeline.reconciler,
        "memory",
    );
    server.into_router()
}
