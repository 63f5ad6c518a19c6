//! Cache decision counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Lock-free counters for cache manager decisions.
///
/// Shared by reference between concurrent requests; every counter is
/// monotonically increasing for the lifetime of the process.
#[derive(Debug, Default)]
pub struct CacheMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    bypasses: AtomicU64,
    stale_fallbacks: AtomicU64,
    document_fallbacks: AtomicU64,
    offline_payloads: AtomicU64,
    evictions: AtomicU64,
    store_errors: AtomicU64,
}

impl CacheMetrics {
    /// Create a zeroed metrics set.
    pub fn new() -> Self {
        Self::default()
    }

    /// A lookup was served from a region.
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// A lookup found nothing and went to the network.
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// A network response was written to a region.
    pub fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    /// A request bypassed the cache entirely.
    pub fn record_bypass(&self) {
        self.bypasses.fetch_add(1, Ordering::Relaxed);
    }

    /// A dynamic-api request was answered from stale data.
    pub fn record_stale_fallback(&self) {
        self.stale_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    /// A document request was answered with the cached root document.
    pub fn record_document_fallback(&self) {
        self.document_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    /// A dynamic-api request was answered with the offline payload.
    pub fn record_offline_payload(&self) {
        self.offline_payloads.fetch_add(1, Ordering::Relaxed);
    }

    /// Entries removed by the eviction controller.
    pub fn record_evictions(&self, count: u64) {
        self.evictions.fetch_add(count, Ordering::Relaxed);
    }

    /// A store operation failed and was degraded or swallowed.
    pub fn record_store_error(&self) {
        self.store_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a point-in-time snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            bypasses: self.bypasses.load(Ordering::Relaxed),
            stale_fallbacks: self.stale_fallbacks.load(Ordering::Relaxed),
            document_fallbacks: self.document_fallbacks.load(Ordering::Relaxed),
            offline_payloads: self.offline_payloads.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            store_errors: self.store_errors.load(Ordering::Relaxed),
        }
    }
}

/// Serializable view of `CacheMetrics`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub bypasses: u64,
    pub stale_fallbacks: u64,
    pub document_fallbacks: u64,
    pub offline_payloads: u64,
    pub evictions: u64,
    pub store_errors: u64,
}

impl MetricsSnapshot {
    /// Fraction of cache lookups that hit, if any lookups happened.
    pub fn hit_ratio(&self) -> Option<f64> {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            None
        } else {
            Some(self.hits as f64 / lookups as f64)
        }
    }

    /// Format as JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = CacheMetrics::new();
        metrics.record_hit();
        metrics.record_hit();
        metrics.record_miss();
        metrics.record_evictions(3);
        metrics.record_evictions(0);

        let snap = metrics.snapshot();
        assert_eq!(snap.hits, 2);
        assert_eq!(snap.misses, 1);
        assert_eq!(snap.evictions, 3);
        assert_eq!(snap.writes, 0);
    }

    #[test]
    fn test_hit_ratio() {
        assert_eq!(MetricsSnapshot::default().hit_ratio(), None);

        let snap = MetricsSnapshot {
            hits: 3,
            misses: 1,
            ..Default::default()
        };
        assert_eq!(snap.hit_ratio(), Some(0.75));
    }

    #[test]
    fn test_snapshot_json() {
        let snap = MetricsSnapshot {
            offline_payloads: 2,
            ..Default::default()
        };
        let json = snap.to_json();
        assert!(json.contains(r#""offline_payloads":2"#));
    }
}
