//! Euterpe - Personalized Feed Synthesis
//!
//! A feed service that turns raw engagement into personalized timelines:
//! - Durable per-user genre like-counters
//! - Preference profiles ranked by engagement
//! - LLM-scored relevance with bounded concurrency and per-item fault isolation
//! - Idempotent personalized-feed rebuilds with partial-failure reporting
//!
//! # Architecture
//!
//! The system is organized into several layers:
//! - **Types**: Core data structures (Activity, FeedKey, ScoredActivity)
//! - **Ledger**: Durable engagement counters behind the EngagementLedger trait
//! - **Store**: Activity feed backends (in-memory, REST) behind ActivityStore
//! - **Scoring**: Relevance oracles and the batch scorer
//! - **Reconcile**: Remove-then-add feed rebuilds gated per user
//! - **Api**: Axum HTTP surface
//!
//! # Example
//!
//! ```ignore
//! use euterpe_core::{
//!     engage::EngagementRecorder,
//!     ledger::FileLedger,
//!     store::MemoryStore,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = Arc::new(MemoryStore::new());
//!     let ledger = Arc::new(FileLedger::open("engagements.json".into()).await?);
//!
//!     euterpe_core::seed::seed_global(store.as_ref()).await?;
//!
//!     let recorder = EngagementRecorder::new(store, ledger, 100);
//!     let receipt = recorder.record_like("alice", "post:Post:X").await?;
//!     println!("{} now has {} {} likes", receipt.user, receipt.likes, receipt.genre);
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod engage;
pub mod error;
pub mod ledger;
pub mod profile;
pub mod reconcile;
pub mod scoring;
pub mod seed;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use error::{EuterpeError, Result};
pub use ledger::{EngagementLedger, FileLedger};
pub use profile::{GenreCount, PreferenceProfile, PreferenceSummary};
pub use reconcile::{FeedReconciler, RebuildReport, RebuildStatus};
pub use scoring::{RelevanceOracle, RelevanceScorer};
pub use store::{ActivityStore, MemoryStore, RestStore};
pub use types::{derived_feed_id, Activity, FeedKey, ScoredActivity};
