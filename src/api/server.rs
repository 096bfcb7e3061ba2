//! HTTP server wiring the engagement and rebuild pipeline

use super::{ApiError, ApiResult};
use crate::engage::{Engagement, EngagementRecorder};
use crate::ledger::EngagementLedger;
use crate::profile::{GenreCount, PreferenceSummary};
use crate::reconcile::{FeedReconciler, RebuildReport};
use crate::seed;
use crate::store::ActivityStore;
use crate::types::{Activity, FeedKey};
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, sync::Arc};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Server address
    pub addr: SocketAddr,
    /// Activities returned per feed read
    pub view_page_size: usize,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            addr: ([127, 0, 0, 1], 5001).into(),
            view_page_size: 10,
        }
    }
}

/// API server state
#[derive(Clone)]
struct AppState {
    store: Arc<dyn ActivityStore>,
    ledger: Arc<dyn EngagementLedger>,
    recorder: Arc<EngagementRecorder>,
    reconciler: Arc<FeedReconciler>,
    /// Instance ID
    instance_id: String,
    view_page_size: usize,
    /// Backend labels surfaced by /health
    store_label: String,
    oracle_name: String,
}

/// API server
pub struct ApiServer {
    config: ApiServerConfig,
    state: AppState,
}

impl ApiServer {
    /// Create new API server
    pub fn new(
        config: ApiServerConfig,
        store: Arc<dyn ActivityStore>,
        ledger: Arc<dyn EngagementLedger>,
        recorder: Arc<EngagementRecorder>,
        reconciler: Arc<FeedReconciler>,
        store_label: impl Into<String>,
    ) -> Self {
        let instance_id = uuid::Uuid::new_v4().to_string()[..8].to_string();
        let oracle_name = reconciler.oracle_name().to_string();

        let state = AppState {
            store,
            ledger,
            recorder,
            reconciler,
            instance_id,
            view_page_size: config.view_page_size,
            store_label: store_label.into(),
            oracle_name,
        };

        Self { config, state }
    }

    /// Get instance ID
    pub fn instance_id(&self) -> &str {
        &self.state.instance_id
    }

    /// Build router
    fn build_router(state: AppState) -> Router {
        Router::new()
            // Engagement
            .route("/engage/:user_id", post(engage_handler))
            // Feed synthesis
            .route("/rebuild-personalized/:user_id", post(rebuild_handler))
            // Feed reads
            .route("/feed/global", get(global_feed_handler))
            .route(
                "/feed/personalized/:user_id",
                get(personalized_feed_handler),
            )
            // Preference inspection
            .route("/profile/:user_id", get(profile_handler))
            // Demo catalog
            .route("/seed-global", post(seed_handler))
            // Health check
            .route("/health", get(health_handler))
            // State
            .with_state(state)
            // Middleware
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
    }

    /// Consume the server and return its router, for in-process testing
    pub fn into_router(self) -> Router {
        Self::build_router(self.state)
    }

    /// Bind the configured address and serve until the task is cancelled
    pub async fn serve(self) -> anyhow::Result<()> {
        let addr = self.config.addr;
        let instance_id = self.state.instance_id.clone();
        let router = Self::build_router(self.state);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("Feed server [{}] listening on http://{}", instance_id, addr);
        axum::serve(listener, router).await?;
        Ok(())
    }
}

/// Like request body
#[derive(Debug, Deserialize)]
struct EngageRequest {
    foreign_id: String,
}

#[derive(Debug, Serialize)]
struct EngageResponse {
    success: bool,
    engagement: Engagement,
}

/// Record a like and return the updated genre count
async fn engage_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<EngageRequest>,
) -> ApiResult<Json<EngageResponse>> {
    if req.foreign_id.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "foreign_id must not be empty".to_string(),
        ));
    }

    let engagement = state
        .recorder
        .record_like(&user_id, &req.foreign_id)
        .await?;

    Ok(Json(EngageResponse {
        success: true,
        engagement,
    }))
}

/// Rebuild the user's personalized feed and return the full report
async fn rebuild_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<RebuildReport>> {
    let report = state.reconciler.rebuild(&user_id).await?;
    Ok(Json(report))
}

#[derive(Debug, Serialize)]
struct FeedPage {
    results: Vec<Activity>,
}

/// Global feed, newest first
async fn global_feed_handler(State(state): State<AppState>) -> ApiResult<Json<FeedPage>> {
    let results = state
        .store
        .read_feed(&FeedKey::global(), state.view_page_size)
        .await?;
    Ok(Json(FeedPage { results }))
}

/// Personalized feed, newest first
async fn personalized_feed_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<FeedPage>> {
    let results = state
        .store
        .read_feed(&FeedKey::personalized(&user_id), state.view_page_size)
        .await?;
    Ok(Json(FeedPage { results }))
}

#[derive(Debug, Serialize)]
struct ProfileResponse {
    user: String,
    /// Genres ranked by like count, ties in first-liked order
    ranking: Vec<GenreCount>,
}

/// Ranked genre preferences for a user
async fn profile_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<ProfileResponse>> {
    let profile = state.ledger.profile(&user_id).await?;
    let summary = PreferenceSummary::from_profile(&profile);

    Ok(Json(ProfileResponse {
        user: user_id,
        ranking: summary.entries().to_vec(),
    }))
}

#[derive(Debug, Serialize)]
struct SeedResponse {
    success: bool,
    added: usize,
}

/// Load the demo catalog into the global feed
async fn seed_handler(State(state): State<AppState>) -> ApiResult<Json<SeedResponse>> {
    let added = seed::seed_global(state.store.as_ref()).await?;
    Ok(Json(SeedResponse {
        success: true,
        added,
    }))
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    instance_id: String,
    store: String,
    oracle: String,
}

/// Health check handler
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        instance_id: state.instance_id.clone(),
        store: state.store_label.clone(),
        oracle: state.oracle_name.clone(),
    })
}
