//! Overlay status server

use std::sync::Arc;
use std::time::Instant;

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use overlay_engine::{BackendStatus, OverlaySnapshot};
use serde::Serialize;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Application state shared across handlers
pub struct AppState {
    /// Latest overlay snapshot from the detection loop
    pub snapshot: watch::Receiver<OverlaySnapshot>,
    /// Vision service base URL
    pub backend_url: String,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: Instant,
}

impl AppState {
    pub fn new(snapshot: watch::Receiver<OverlaySnapshot>, backend_url: impl Into<String>) -> Self {
        Self {
            snapshot,
            backend_url: backend_url.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: Instant::now(),
        }
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub backend: BackendStatus,
    pub backend_url: String,
    pub cycles_completed: u64,
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(health_handler))
        .route("/api/v1/overlay", get(overlay_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.snapshot.borrow();
    let status = match snapshot.backend {
        BackendStatus::Online => "healthy",
        BackendStatus::Checking => "starting",
        BackendStatus::Offline => "degraded",
    };

    Json(HealthResponse {
        status: status.to_string(),
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        backend: snapshot.backend,
        backend_url: state.backend_url.clone(),
        cycles_completed: snapshot.cycles_completed,
    })
}

async fn overlay_handler(State(state): State<Arc<AppState>>) -> Json<OverlaySnapshot> {
    Json(state.snapshot.borrow().clone())
}

/// Run the server until the listener fails
pub async fn run_server(addr: &str, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    info!("Starting status server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
