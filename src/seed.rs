//! Demo catalog
//!
//! Five genre-tagged posts for demos and integration tests, timestamped an
//! hour apart so feed ordering is deterministic.

use crate::error::Result;
use crate::store::ActivityStore;
use crate::types::{Activity, FeedKey};
use chrono::{Duration, Utc};
use tracing::info;

/// Catalog entries: object, genre, popularity
const CATALOG: [(&str, &str, u32); 5] = [
    ("Post:X", "rock", 95),
    ("Post:Y", "jazz", 80),
    ("Post:Z", "hip-hop", 60),
    ("Post:W", "classical", 30),
    ("Post:V", "rock", 85),
];

/// Build the demo catalog, newest first
pub fn demo_catalog() -> Vec<Activity> {
    let now = Utc::now();

    CATALOG
        .iter()
        .enumerate()
        .map(|(i, (object, genre, popularity))| {
            let mut activity =
                Activity::new("User:seed", "post", *object, format!("post:{}", object));
            activity.genre = Some((*genre).to_string());
            activity.popularity = *popularity;
            activity.time = now - Duration::hours(i as i64);
            activity
        })
        .collect()
}

/// Upsert the demo catalog into the global feed
///
/// Foreign IDs are stable, so seeding repeatedly refreshes timestamps
/// without duplicating entries.
pub async fn seed_global(store: &dyn ActivityStore) -> Result<usize> {
    let added = store
        .add_activities(&FeedKey::global(), demo_catalog())
        .await?;
    info!("Seeded global feed with {} catalog posts", added);
    Ok(added)
}
