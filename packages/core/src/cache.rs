use std::time::{Duration, Instant};

use crate::types::Snapshot;

/// Latest snapshot with an explicit TTL.
pub struct SnapshotCache {
    value: Option<Snapshot>,
    cached_at: Option<Instant>,
    ttl: Duration,
}

impl SnapshotCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            value: None,
            cached_at: None,
            ttl,
        }
    }

    /// Returns cached snapshot only when still within TTL.
    pub fn get(&self) -> Option<Snapshot> {
        if self.is_fresh() {
            self.value.clone()
        } else {
            None
        }
    }

    pub fn set(&mut self, value: Snapshot) {
        self.value = Some(value);
        self.cached_at = Some(Instant::now());
    }

    pub fn is_fresh(&self) -> bool {
        match (self.value.as_ref(), self.cached_at) {
            (Some(_), Some(cached_at)) => cached_at.elapsed() <= self.ttl,
            _ => false,
        }
    }
}
