//! HTTP surface over the snapshot cache.

pub mod headers;
pub mod health;
pub mod snapshot;
pub mod status;

use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;

use crate::state::AppState;

/// Assemble the full router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/snapshot", get(snapshot::snapshot))
        .route("/snapshot/:chain", get(snapshot::chain_fee))
        .route("/status", get(status::status))
        .route("/metrics", get(status::metrics))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
