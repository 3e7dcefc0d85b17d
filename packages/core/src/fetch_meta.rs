//! Per-provider fetch bookkeeping.
//!
//! `FetchMeta` is created by the process entry point and handed to the HTTP
//! client (which records every call outcome) and to the API layer (which
//! reports it at `GET /status`). Entries idle for longer than the TTL are
//! dropped on access.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProviderStats {
    pub successes: u64,
    pub failures: u64,
    pub last_error: Option<String>,
    pub last_error_at: Option<DateTime<Utc>>,
    pub last_success_at: Option<DateTime<Utc>>,
}

impl ProviderStats {
    fn new() -> Self {
        Self {
            successes: 0,
            failures: 0,
            last_error: None,
            last_error_at: None,
            last_success_at: None,
        }
    }

    fn last_seen(&self) -> Option<DateTime<Utc>> {
        match (self.last_error_at, self.last_success_at) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        }
    }
}

#[derive(Debug)]
struct MetaInner {
    providers: HashMap<String, ProviderStats>,
    ttl: chrono::Duration,
}

/// Shared handle; clones observe the same state.
#[derive(Debug, Clone)]
pub struct FetchMeta {
    inner: Arc<Mutex<MetaInner>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FetchMetaSummary {
    pub generated_at: DateTime<Utc>,
    pub ttl_seconds: i64,
    pub providers: Vec<ProviderSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderSummary {
    pub provider: String,
    #[serde(flatten)]
    pub stats: ProviderStats,
}

impl FetchMeta {
    pub fn new(ttl: Duration) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::hours(1));
        Self {
            inner: Arc::new(Mutex::new(MetaInner {
                providers: HashMap::new(),
                ttl,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MetaInner> {
        // A panic while holding the lock leaves counters that are still usable.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn record_success(&self, provider: &str) {
        self.record_success_at(provider, Utc::now());
    }

    pub fn record_failure(&self, provider: &str, error: &str) {
        self.record_failure_at(provider, error, Utc::now());
    }

    fn record_success_at(&self, provider: &str, at: DateTime<Utc>) {
        let mut inner = self.lock();
        let stats = inner
            .providers
            .entry(provider.to_string())
            .or_insert_with(ProviderStats::new);
        stats.successes += 1;
        stats.last_success_at = Some(at);
    }

    fn record_failure_at(&self, provider: &str, error: &str, at: DateTime<Utc>) {
        let mut inner = self.lock();
        let stats = inner
            .providers
            .entry(provider.to_string())
            .or_insert_with(ProviderStats::new);
        stats.failures += 1;
        stats.last_error = Some(error.to_string());
        stats.last_error_at = Some(at);
    }

    fn prune(inner: &mut MetaInner, now: DateTime<Utc>) {
        let ttl = inner.ttl;
        inner
            .providers
            .retain(|_, stats| stats.last_seen().map_or(false, |seen| now - seen <= ttl));
    }

    pub fn stats(&self, provider: &str) -> Option<ProviderStats> {
        let mut inner = self.lock();
        Self::prune(&mut inner, Utc::now());
        inner.providers.get(provider).cloned()
    }

    /// Providers whose most recent call failed.
    pub fn failing_providers(&self) -> usize {
        let mut inner = self.lock();
        Self::prune(&mut inner, Utc::now());
        inner
            .providers
            .values()
            .filter(|s| match (s.last_error_at, s.last_success_at) {
                (Some(err), Some(ok)) => err > ok,
                (Some(_), None) => true,
                _ => false,
            })
            .count()
    }

    pub fn summary(&self) -> FetchMetaSummary {
        let now = Utc::now();
        let mut inner = self.lock();
        Self::prune(&mut inner, now);

        let mut providers: Vec<ProviderSummary> = inner
            .providers
            .iter()
            .map(|(provider, stats)| ProviderSummary {
                provider: provider.clone(),
                stats: stats.clone(),
            })
            .collect();
        providers.sort_by(|a, b| a.provider.cmp(&b.provider));

        FetchMetaSummary {
            generated_at: now,
            ttl_seconds: inner.ttl.num_seconds(),
            providers,
        }
    }
}
