//! REST client for a remote feed store
//!
//! Speaks the hosted feed dialect: `{"results": [...]}` read envelopes,
//! `activities` batch posts, and foreign-ID addressed deletes. Reads retry
//! rate limiting and server-side failures with exponential backoff; client
//! errors, writes, and removes surface failures to the caller on the first
//! attempt.

use super::ActivityStore;
use crate::config::StoreSettings;
use crate::error::{EuterpeError, Result};
use crate::types::{Activity, FeedKey};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Backoff base duration in milliseconds
const BACKOFF_BASE_MS: u64 = 1000;

/// Statuses worth retrying: rate limiting and server-side failures
fn retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Remote feed store client
pub struct RestStore {
    client: Client,
    base_url: String,
    read_retries: u32,
}

/// Batch append request body
#[derive(Debug, Serialize)]
struct AppendRequest<'a> {
    activities: &'a [Activity],
}

/// Feed read response envelope
#[derive(Debug, Deserialize)]
struct FeedResponse {
    results: Vec<Activity>,
}

/// Batch append response body
#[derive(Debug, Deserialize)]
struct AppendResponse {
    #[serde(default)]
    added: usize,
}

impl RestStore {
    /// Create a client from store settings
    ///
    /// Requires `base_url`; the in-process store covers the unset case.
    pub fn new(settings: &StoreSettings) -> Result<Self> {
        let base_url = settings.base_url.clone().ok_or_else(|| {
            EuterpeError::Config(config::ConfigError::Message(
                "store.base_url is required for the remote feed store".to_string(),
            ))
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| EuterpeError::StoreUnavailable(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            read_retries: settings.read_retries,
        })
    }

    fn feed_url(&self, feed: &FeedKey) -> String {
        format!("{}/feeds/{}/{}", self.base_url, feed.group, feed.id)
    }

    /// Read a feed page once (no retry)
    async fn read_once(&self, feed: &FeedKey, limit: usize) -> Result<Vec<Activity>> {
        debug!("Reading feed {} (limit {})", feed, limit);

        let response = self
            .client
            .get(self.feed_url(feed))
            .query(&[("limit", limit)])
            .send()
            .await
            .map_err(|e| EuterpeError::StoreUnavailable(e.to_string()))?;

        let status = response.status();
        match status {
            StatusCode::OK => {
                let feed_response = response
                    .json::<FeedResponse>()
                    .await
                    .map_err(|e| EuterpeError::StoreUnavailable(format!(
                        "Malformed feed response: {}",
                        e
                    )))?;

                let mut results = feed_response.results;
                results.truncate(limit);
                Ok(results)
            }
            // An absent feed reads as empty; feeds materialize on first write
            StatusCode::NOT_FOUND => Ok(Vec::new()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(EuterpeError::Config(config::ConfigError::Message(
                    "Feed store rejected the configured credentials".to_string(),
                )))
            }
            _ => {
                let body = response.text().await.unwrap_or_default();
                let message = format!("Feed read failed with status {}: {}", status, body);
                if retryable_status(status) {
                    Err(EuterpeError::StoreUnavailable(message))
                } else {
                    Err(EuterpeError::StoreApi(message))
                }
            }
        }
    }
}

#[async_trait]
impl ActivityStore for RestStore {
    async fn add_activities(&self, feed: &FeedKey, activities: Vec<Activity>) -> Result<usize> {
        if activities.is_empty() {
            return Ok(0);
        }

        debug!("Appending {} activities to {}", activities.len(), feed);

        let response = self
            .client
            .post(format!("{}/activities", self.feed_url(feed)))
            .json(&AppendRequest {
                activities: &activities,
            })
            .send()
            .await
            .map_err(|e| EuterpeError::StoreUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = format!("Feed append failed with status {}: {}", status, body);
            return Err(if retryable_status(status) {
                EuterpeError::StoreUnavailable(message)
            } else {
                EuterpeError::StoreApi(message)
            });
        }

        // Stores that return no counted body still accepted the batch
        let added = response
            .json::<AppendResponse>()
            .await
            .map(|r| r.added)
            .unwrap_or(activities.len());
        Ok(added)
    }

    async fn read_feed(&self, feed: &FeedKey, limit: usize) -> Result<Vec<Activity>> {
        let mut retries = 0;

        loop {
            match self.read_once(feed, limit).await {
                Ok(results) => return Ok(results),
                Err(e) => {
                    if retries >= self.read_retries {
                        return Err(e);
                    }

                    // Only transport failures and store-side errors retry
                    let should_retry = matches!(&e, EuterpeError::StoreUnavailable(_));
                    if !should_retry {
                        return Err(e);
                    }

                    let backoff_ms = BACKOFF_BASE_MS * 2_u64.pow(retries);
                    warn!(
                        "Feed read failed, retrying after {}ms (attempt {}/{})",
                        backoff_ms,
                        retries + 1,
                        self.read_retries
                    );

                    sleep(Duration::from_millis(backoff_ms)).await;
                    retries += 1;
                }
            }
        }
    }

    async fn remove_activity(&self, feed: &FeedKey, foreign_id: &str) -> Result<()> {
        debug!("Removing {} from {}", foreign_id, feed);

        let response = self
            .client
            .delete(format!("{}/activities/{}", self.feed_url(feed), foreign_id))
            .send()
            .await
            .map_err(|e| EuterpeError::StoreUnavailable(e.to_string()))?;

        let status = response.status();
        match status {
            // 404 means the entry is already gone
            s if s.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Ok(()),
            _ => {
                let body = response.text().await.unwrap_or_default();
                let message = format!("Feed remove failed with status {}: {}", status, body);
                if retryable_status(status) {
                    Err(EuterpeError::StoreUnavailable(message))
                } else {
                    Err(EuterpeError::StoreApi(message))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::get, Router};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn settings(base_url: Option<&str>) -> StoreSettings {
        StoreSettings {
            base_url: base_url.map(|s| s.to_string()),
            timeout_secs: 5,
            read_retries: 2,
        }
    }

    #[test]
    fn test_requires_base_url() {
        let result = RestStore::new(&settings(None));
        assert!(result.is_err());
    }

    #[test]
    fn test_feed_url_format() {
        let store = RestStore::new(&settings(Some("http://feeds.internal:9000"))).unwrap();
        assert_eq!(
            store.feed_url(&FeedKey::global()),
            "http://feeds.internal:9000/feeds/global/main"
        );
        assert_eq!(
            store.feed_url(&FeedKey::personalized("alice")),
            "http://feeds.internal:9000/feeds/personalized/alice"
        );
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let store = RestStore::new(&settings(Some("http://feeds.internal:9000/"))).unwrap();
        assert_eq!(
            store.feed_url(&FeedKey::global()),
            "http://feeds.internal:9000/feeds/global/main"
        );
    }

    #[test]
    fn test_retryable_status_classification() {
        assert!(retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(retryable_status(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(retryable_status(StatusCode::SERVICE_UNAVAILABLE));

        assert!(!retryable_status(StatusCode::BAD_REQUEST));
        assert!(!retryable_status(StatusCode::UNPROCESSABLE_ENTITY));
        assert!(!retryable_status(StatusCode::NOT_FOUND));
    }

    #[tokio::test]
    async fn test_client_error_read_is_not_retried() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let app = Router::new().route(
            "/feeds/:group/:id",
            get(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    (axum::http::StatusCode::BAD_REQUEST, "unsupported cursor")
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let base = format!("http://{}", addr);
        let store = RestStore::new(&settings(Some(base.as_str()))).unwrap();
        let result = store.read_feed(&FeedKey::global(), 10).await;

        assert!(matches!(result, Err(EuterpeError::StoreApi(_))));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
