//! Snapshot polling scheduler.
//!
//! Each tick builds a fresh snapshot, stores it in the shared cache and
//! folds it into the metrics, so the API layer normally serves a cached
//! snapshot instead of building one per request.

use std::time::{Duration, Instant};

use tokio::signal;
use tokio::sync::MutexGuard;
use tokio::time;

use crate::state::AppState;
use crate::types::Snapshot;

/// Run the snapshot polling loop until `Ctrl+C` (SIGINT) is received.
///
/// A failed run still produces a (possibly empty) snapshot, so the loop
/// never stops on its own.
pub async fn run_snapshot_polling(state: AppState, poll_interval_seconds: u64) {
    let mut interval = time::interval(Duration::from_secs(poll_interval_seconds));
    interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

    tracing::info!("Snapshot polling started (interval: {}s)", poll_interval_seconds);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                poll_once(&state).await;
            }

            _ = signal::ctrl_c() => {
                tracing::info!("Shutdown signal received. Stopping polling.");
                break;
            }
        }
    }

    tracing::info!("Snapshot polling stopped cleanly");
}

/// Build one snapshot, cache it and record metrics.
pub async fn poll_once(state: &AppState) -> Snapshot {
    let guard = state.refresh_lock.lock().await;
    refresh_locked(state, &guard).await
}

/// Rebuild while the caller holds `refresh_lock`.
async fn refresh_locked(state: &AppState, _guard: &MutexGuard<'_, ()>) -> Snapshot {
    let started = Instant::now();
    let snapshot = state.orchestrator.generate_snapshot().await;
    let elapsed = started.elapsed();

    state
        .metrics
        .record_snapshot(&snapshot, elapsed.as_secs_f64(), &state.fetch_meta);
    state.cache.write().await.set(snapshot.clone());

    tracing::info!(
        "Snapshot cached: {} chains in {:.2}s",
        snapshot.chains.len(),
        elapsed.as_secs_f64()
    );
    snapshot
}

/// The cached snapshot when fresh, otherwise a newly built one.
pub async fn current_snapshot(state: &AppState) -> Snapshot {
    if let Some(snapshot) = state.cache.read().await.get() {
        return snapshot;
    }

    // Another request may have rebuilt it while we waited for the lock.
    let guard = state.refresh_lock.lock().await;
    if let Some(snapshot) = state.cache.read().await.get() {
        return snapshot;
    }

    tracing::debug!("Snapshot cache empty or stale, building on demand");
    refresh_locked(state, &guard).await
}
