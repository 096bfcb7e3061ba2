//! In-process activity store
//!
//! Keeps every feed in a map guarded by an async lock. Used by the
//! standalone server (no remote store configured), demos, and tests.

use super::ActivityStore;
use crate::error::Result;
use crate::types::{Activity, FeedKey};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-memory feed store
#[derive(Default)]
pub struct MemoryStore {
    feeds: RwLock<HashMap<FeedKey, Vec<Activity>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ActivityStore for MemoryStore {
    async fn add_activities(&self, feed: &FeedKey, activities: Vec<Activity>) -> Result<usize> {
        if activities.is_empty() {
            return Ok(0);
        }

        let mut feeds = self.feeds.write().await;
        let entries = feeds.entry(feed.clone()).or_default();
        let count = activities.len();

        for activity in activities {
            match entries
                .iter_mut()
                .find(|a| a.foreign_id == activity.foreign_id)
            {
                Some(existing) => *existing = activity,
                None => entries.push(activity),
            }
        }

        Ok(count)
    }

    async fn read_feed(&self, feed: &FeedKey, limit: usize) -> Result<Vec<Activity>> {
        let feeds = self.feeds.read().await;
        let mut page = feeds.get(feed).cloned().unwrap_or_default();
        page.sort_by(|a, b| b.time.cmp(&a.time));
        page.truncate(limit);
        Ok(page)
    }

    async fn remove_activity(&self, feed: &FeedKey, foreign_id: &str) -> Result<()> {
        let mut feeds = self.feeds.write().await;
        if let Some(entries) = feeds.get_mut(feed) {
            entries.retain(|a| a.foreign_id != foreign_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn post(foreign_id: &str, hours_ago: i64) -> Activity {
        let mut activity = Activity::new("User:seed", "post", "Post", foreign_id);
        activity.time = Utc::now() - Duration::hours(hours_ago);
        activity
    }

    #[tokio::test]
    async fn test_read_is_newest_first_and_bounded() {
        let store = MemoryStore::new();
        let feed = FeedKey::global();

        store
            .add_activities(&feed, vec![post("a", 3), post("b", 1), post("c", 2)])
            .await
            .unwrap();

        let page = store.read_feed(&feed, 2).await.unwrap();
        let ids: Vec<&str> = page.iter().map(|a| a.foreign_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn test_add_upserts_by_foreign_id() {
        let store = MemoryStore::new();
        let feed = FeedKey::global();

        let mut first = post("a", 1);
        first.popularity = 10;
        store.add_activities(&feed, vec![first]).await.unwrap();

        let mut replacement = post("a", 1);
        replacement.popularity = 99;
        store
            .add_activities(&feed, vec![replacement])
            .await
            .unwrap();

        let page = store.read_feed(&feed, 10).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].popularity, 99);
    }

    #[tokio::test]
    async fn test_remove_absent_id_is_ok() {
        let store = MemoryStore::new();
        let feed = FeedKey::personalized("alice");

        store.remove_activity(&feed, "nope").await.unwrap();

        store.add_activities(&feed, vec![post("a", 1)]).await.unwrap();
        store.remove_activity(&feed, "a").await.unwrap();
        store.remove_activity(&feed, "a").await.unwrap();

        assert!(store.read_feed(&feed, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_feeds_are_isolated() {
        let store = MemoryStore::new();
        store
            .add_activities(&FeedKey::personalized("alice"), vec![post("a", 1)])
            .await
            .unwrap();

        let bob = store
            .read_feed(&FeedKey::personalized("bob"), 10)
            .await
            .unwrap();
        assert!(bob.is_empty());
    }

    #[tokio::test]
    async fn test_empty_batch_is_a_no_op() {
        let store = MemoryStore::new();
        let added = store
            .add_activities(&FeedKey::global(), vec![])
            .await
            .unwrap();
        assert_eq!(added, 0);
    }
}
