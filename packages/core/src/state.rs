use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};

use crate::cache::SnapshotCache;
use crate::fetch_meta::FetchMeta;
use crate::metrics::AppMetrics;
use crate::orchestrator::SnapshotOrchestrator;

/// Everything the scheduler and the HTTP handlers share.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<SnapshotOrchestrator>,
    pub cache: Arc<RwLock<SnapshotCache>>,
    pub metrics: Arc<AppMetrics>,
    pub fetch_meta: FetchMeta,
    /// Serialises snapshot builds so concurrent requests for a stale cache
    /// trigger one build, not many.
    pub refresh_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(
        orchestrator: Arc<SnapshotOrchestrator>,
        metrics: Arc<AppMetrics>,
        fetch_meta: FetchMeta,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            orchestrator,
            cache: Arc::new(RwLock::new(SnapshotCache::new(cache_ttl))),
            metrics,
            fetch_meta,
            refresh_lock: Arc::new(Mutex::new(())),
        }
    }
}
