//! HTTP API handlers.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::engine::AssetStatus;

/// Application state shared with handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Whether the engine is quoting at least one market.
    pub ready: Arc<std::sync::atomic::AtomicBool>,
    /// Per-asset engine snapshots, refreshed each tick.
    pub statuses: Arc<tokio::sync::RwLock<Vec<AssetStatus>>>,
}

impl AppState {
    /// Create new app state.
    pub fn new() -> Self {
        Self {
            ready: Arc::new(std::sync::atomic::AtomicBool::new(false)),
            statuses: Arc::new(tokio::sync::RwLock::new(Vec::new())),
        }
    }

    /// Set ready state.
    pub fn set_ready(&self, ready: bool) {
        self.ready
            .store(ready, std::sync::atomic::Ordering::SeqCst);
    }

    /// Check if ready.
    pub fn is_ready(&self) -> bool {
        self.ready.load(std::sync::atomic::Ordering::SeqCst)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status: "ok".
    pub status: &'static str,
}

/// Readiness check response.
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    /// Whether the engine is quoting.
    pub ready: bool,
    /// Number of tracked assets.
    pub assets: usize,
}

/// Status response.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Service status.
    pub status: &'static str,
    /// Per-asset quoting snapshots.
    pub assets: Vec<AssetStatus>,
}

/// Health check handler - always returns 200.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

/// Readiness check handler - returns 200 if quoting, 503 otherwise.
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let is_ready = state.is_ready();
    let assets = state.statuses.read().await.len();

    let response = ReadyResponse {
        ready: is_ready,
        assets,
    };

    if is_ready {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}

/// Status handler - returns per-asset engine snapshots.
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let assets = state.statuses.read().await.clone();
    let status = if state.is_ready() { "running" } else { "starting" };

    Json(StatusResponse { status, assets })
}
