use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::Response,
};

use super::headers::{cached_json, CachePolicy};
use crate::error::AppError;
use crate::scheduler::current_snapshot;
use crate::state::AppState;
use crate::types::ValidatedFee;

const SNAPSHOT_CACHE: CachePolicy = CachePolicy {
    max_age: 15,
    stale_while_revalidate: 30,
};

/// `GET /snapshot`
pub async fn snapshot(
    State(state): State<AppState>,
    request_headers: HeaderMap,
) -> Result<Response, AppError> {
    let snapshot = current_snapshot(&state).await;
    cached_json(&request_headers, SNAPSHOT_CACHE, snapshot.generated_at, &snapshot)
}

/// `GET /snapshot/:chain`
///
/// Unknown keys are 404. A configured chain missing from the snapshot
/// (the whole run fell back to an empty snapshot) is reported as
/// `api-failed`.
pub async fn chain_fee(
    State(state): State<AppState>,
    Path(chain): Path<String>,
    request_headers: HeaderMap,
) -> Result<Response, AppError> {
    state.orchestrator.registry().get(&chain)?;

    let snapshot = current_snapshot(&state).await;
    let fee = snapshot
        .chains
        .get(&chain)
        .cloned()
        .unwrap_or_else(|| ValidatedFee::api_failed(chain.clone(), None));

    cached_json(&request_headers, SNAPSHOT_CACHE, fee.updated, &fee)
}
