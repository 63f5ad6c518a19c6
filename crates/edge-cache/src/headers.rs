//! Cache header names and debugging headers.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::freshness::FreshnessTagger;
use crate::strategy::{CacheStatus, Outcome};

/// Header names used by the cache manager.
pub mod header_names {
    /// Capture timestamp (ms since epoch) on dynamic-api entries.
    pub const X_CAPTURED_AT: &str = "X-Edge-Captured-At";
    /// Cache status header (HIT, MISS, STALE, FALLBACK, OFFLINE, BYPASS).
    pub const X_CACHE_STATUS: &str = "X-Cache-Status";
    /// Policy class or pass-through reason.
    pub const X_CACHE_POLICY: &str = "X-Cache-Policy";
    /// Region the response was read from or written to.
    pub const X_CACHE_REGION: &str = "X-Cache-Region";
    /// Age of a captured entry in seconds.
    pub const X_CACHE_AGE: &str = "X-Cache-Age";
    /// Whether the entry is past its freshness window.
    pub const X_CACHE_STALE: &str = "X-Cache-Stale";
}

/// Explain headers a hosting layer may attach for debugging.
///
/// The executor never adds these to responses itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheExplainHeaders {
    /// Overall cache status.
    pub status: Option<CacheStatus>,
    /// Policy class or pass-through reason.
    pub policy: Option<String>,
    /// Region involved.
    pub region: Option<String>,
    /// Age of captured data in seconds.
    pub age_secs: Option<u64>,
    /// Whether captured data is past its TTL.
    pub is_stale: bool,
}

impl CacheExplainHeaders {
    /// Create new explain headers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set cache status.
    pub fn with_status(mut self, status: CacheStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Set policy description.
    pub fn with_policy(mut self, policy: impl Into<String>) -> Self {
        self.policy = Some(policy.into());
        self
    }

    /// Set region.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Set age.
    pub fn with_age(mut self, age: Duration) -> Self {
        self.age_secs = Some(age.as_secs());
        self
    }

    /// Mark as stale.
    pub fn mark_stale(mut self) -> Self {
        self.is_stale = true;
        self
    }

    /// Describe an outcome. Age and staleness are only known for entries
    /// carrying a capture timestamp.
    pub fn from_outcome(outcome: &Outcome, tagger: &FreshnessTagger, ttl: Duration) -> Self {
        let mut explain = Self::new()
            .with_status(outcome.status)
            .with_policy(outcome.classification.to_string());

        if let Some(region) = &outcome.region {
            explain = explain.with_region(region.clone());
        }

        if let Some(age) = tagger.age(&outcome.response) {
            explain = explain.with_age(age);
            if !tagger.is_fresh(&outcome.response, ttl) {
                explain = explain.mark_stale();
            }
        }

        explain
    }

    /// Convert to HTTP headers.
    pub fn to_headers(&self) -> Vec<(String, String)> {
        let mut headers = Vec::new();

        if let Some(status) = &self.status {
            headers.push((header_names::X_CACHE_STATUS.to_string(), status.to_string()));
        }

        if let Some(policy) = &self.policy {
            headers.push((header_names::X_CACHE_POLICY.to_string(), policy.clone()));
        }

        if let Some(region) = &self.region {
            headers.push((header_names::X_CACHE_REGION.to_string(), region.clone()));
        }

        if let Some(age) = self.age_secs {
            headers.push((header_names::X_CACHE_AGE.to_string(), age.to_string()));
        }

        if self.is_stale {
            headers.push((header_names::X_CACHE_STALE.to_string(), "true".to_string()));
        }

        headers
    }

    /// Convert to JSON for a debugging endpoint.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use edge_core::ResponseEntry;

    use super::*;
    use crate::freshness::ManualClock;
    use crate::policy::{Classification, PassThroughReason, PolicyClass};

    #[test]
    fn test_to_headers() {
        let headers = CacheExplainHeaders::new()
            .with_status(CacheStatus::Hit)
            .with_region("pages-v2")
            .to_headers();

        assert_eq!(
            headers,
            vec![
                ("X-Cache-Status".to_string(), "HIT".to_string()),
                ("X-Cache-Region".to_string(), "pages-v2".to_string()),
            ]
        );
    }

    #[test]
    fn test_from_stale_outcome() {
        let clock = Arc::new(ManualClock::new(0));
        let tagger = FreshnessTagger::new(clock.clone());
        let outcome = Outcome {
            response: tagger.tag(&ResponseEntry::ok("[]")),
            status: CacheStatus::Stale,
            classification: Classification::Policy(PolicyClass::DynamicApi),
            region: Some("api-v2".to_string()),
        };
        clock.set(301_000);

        let explain =
            CacheExplainHeaders::from_outcome(&outcome, &tagger, Duration::from_millis(300_000));

        assert_eq!(explain.status, Some(CacheStatus::Stale));
        assert_eq!(explain.policy.as_deref(), Some("dynamic-api"));
        assert_eq!(explain.age_secs, Some(301));
        assert!(explain.is_stale);
    }

    #[test]
    fn test_from_bypass_outcome() {
        let tagger = FreshnessTagger::new(Arc::new(ManualClock::new(0)));
        let outcome = Outcome {
            response: ResponseEntry::new(201),
            status: CacheStatus::Bypass,
            classification: Classification::PassThrough(PassThroughReason::MutatingApi),
            region: None,
        };

        let explain = CacheExplainHeaders::from_outcome(&outcome, &tagger, Duration::from_secs(1));
        assert_eq!(explain.policy.as_deref(), Some("pass-through (mutating-api)"));
        assert_eq!(explain.region, None);
        assert_eq!(explain.age_secs, None);
        assert!(!explain.is_stale);
    }
}
