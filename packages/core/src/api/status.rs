use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::chains::ChainType;
use crate::fetch_meta::FetchMetaSummary;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ChainSummary {
    pub key: String,
    pub symbol: String,
    pub chain_type: ChainType,
    pub provider: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub chains: Vec<ChainSummary>,
    pub snapshot_cached: bool,
    pub fetch_meta: FetchMetaSummary,
}

/// `GET /status`: configured chains and per-provider fetch bookkeeping.
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let chains = state
        .orchestrator
        .registry()
        .entries()
        .map(|entry| ChainSummary {
            key: entry.config.key.clone(),
            symbol: entry.config.symbol.clone(),
            chain_type: entry.config.chain_type,
            provider: entry.provider.name().to_string(),
        })
        .collect();

    Json(StatusResponse {
        chains,
        snapshot_cached: state.cache.read().await.is_fresh(),
        fetch_meta: state.fetch_meta.summary(),
    })
}

/// `GET /metrics`
pub async fn metrics(State(state): State<AppState>) -> Response {
    match state.metrics.render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(err) => {
            tracing::error!("Failed to render metrics: {}", err);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics error").into_response()
        }
    }
}
