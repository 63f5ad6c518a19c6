//! Capture timestamps and advisory freshness for dynamic data.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use edge_core::ResponseEntry;

use crate::headers::header_names::X_CAPTURED_AT;

/// Source of wall-clock time in milliseconds since the Unix epoch.
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now_millis(&self) -> u64;
}

/// Clock backed by `SystemTime`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// Create a clock reading `millis`.
    pub fn new(millis: u64) -> Self {
        Self {
            now: AtomicU64::new(millis),
        }
    }

    /// Set the current time.
    pub fn set(&self, millis: u64) {
        self.now.store(millis, Ordering::SeqCst);
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Capture timestamp of an entry, if it carries a valid one.
pub fn captured_at(entry: &ResponseEntry) -> Option<u64> {
    entry.header(X_CAPTURED_AT)?.trim().parse().ok()
}

/// Stamps and inspects capture timestamps.
///
/// Freshness is advisory: nothing in the cache deletes or skips an entry
/// because it is stale.
#[derive(Debug, Clone)]
pub struct FreshnessTagger {
    clock: Arc<dyn Clock>,
}

impl FreshnessTagger {
    /// Create a tagger reading time from `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Current time in milliseconds.
    pub fn now_millis(&self) -> u64 {
        self.clock.now_millis()
    }

    /// Copy of `entry` stamped with the current time, replacing any prior stamp.
    pub fn tag(&self, entry: &ResponseEntry) -> ResponseEntry {
        entry.replacing_header(X_CAPTURED_AT, self.now_millis().to_string())
    }

    /// True iff the entry has a capture timestamp and `now - captured < ttl`.
    pub fn is_fresh(&self, entry: &ResponseEntry, ttl: Duration) -> bool {
        self.age(entry).is_some_and(|age| age < ttl)
    }

    /// Time since capture, if the entry carries a timestamp.
    pub fn age(&self, entry: &ResponseEntry) -> Option<Duration> {
        let captured = captured_at(entry)?;
        Some(Duration::from_millis(
            self.now_millis().saturating_sub(captured),
        ))
    }
}

impl Default for FreshnessTagger {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_millis(300_000);

    fn tagger_at(millis: u64) -> (Arc<ManualClock>, FreshnessTagger) {
        let clock = Arc::new(ManualClock::new(millis));
        let tagger = FreshnessTagger::new(clock.clone());
        (clock, tagger)
    }

    #[test]
    fn test_tag_sets_timestamp() {
        let (_, tagger) = tagger_at(1_000);
        let tagged = tagger.tag(&ResponseEntry::ok("data"));
        assert_eq!(captured_at(&tagged), Some(1_000));
    }

    #[test]
    fn test_tag_replaces_prior_value() {
        let (clock, tagger) = tagger_at(1_000);
        let first = tagger.tag(&ResponseEntry::ok("data"));
        clock.set(5_000);
        let second = tagger.tag(&first);

        assert_eq!(second.header_all(X_CAPTURED_AT).count(), 1);
        assert_eq!(captured_at(&second), Some(5_000));
    }

    #[test]
    fn test_fresh_then_stale() {
        let (clock, tagger) = tagger_at(0);
        let entry = tagger.tag(&ResponseEntry::ok("data"));

        assert!(tagger.is_fresh(&entry, TTL));

        clock.set(299_999);
        assert!(tagger.is_fresh(&entry, TTL));

        clock.set(300_000);
        assert!(!tagger.is_fresh(&entry, TTL));

        clock.set(301_000);
        assert!(!tagger.is_fresh(&entry, TTL));
        assert_eq!(tagger.age(&entry), Some(Duration::from_millis(301_000)));
    }

    #[test]
    fn test_untagged_is_never_fresh() {
        let (_, tagger) = tagger_at(0);
        let entry = ResponseEntry::ok("data");
        assert!(!tagger.is_fresh(&entry, TTL));
        assert_eq!(tagger.age(&entry), None);
    }

    #[test]
    fn test_garbage_timestamp_is_ignored() {
        let entry = ResponseEntry::ok("data").with_header(X_CAPTURED_AT, "yesterday");
        assert_eq!(captured_at(&entry), None);
    }

    #[test]
    fn test_clock_advance() {
        let clock = ManualClock::new(10);
        clock.advance(Duration::from_secs(1));
        assert_eq!(clock.now_millis(), 1_010);
    }
}
