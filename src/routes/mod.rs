//! API Routes
//!
//! - `/api/diagnose` - Upload a leaf image and run the diagnosis pipeline
//! - `/api/reports` - Stored diagnosis reports and Markdown downloads
//! - `/api/health` - Health checks

pub mod diagnosis;
pub mod health;
pub mod reports;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::middleware::cors_layer;
use crate::models::AppState;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    info!("Creating application router");

    let max_upload = state.config.server.max_upload_bytes;
    let cors = cors_layer(&state.config.server.cors_allowed_origins);

    Router::new()
        .merge(diagnosis::router(state.clone()))
        .merge(reports::router(state.clone()))
        .merge(health::router(state))
        .layer(DefaultBodyLimit::max(max_upload))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
