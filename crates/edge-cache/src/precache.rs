//! Startup precaching into the `static` region.

use edge_core::{RequestDescriptor, ResponseEntry};
use edge_data::Fetcher;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::headers::header_names::X_CAPTURED_AT;
use crate::policy::{Classification, PolicyClass, RouteRules};
use crate::store::Region;

/// Outcome of a precache run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrecacheReport {
    /// Paths fetched and stored.
    pub stored: Vec<String>,
    /// Paths that could not be fetched or stored, with the reason.
    pub failed: Vec<(String, String)>,
}

impl PrecacheReport {
    /// Whether every path was stored.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Fetch every path in `paths` (relative to `origin`) and store the
/// successful responses in `region`.
///
/// Paths resolving off-origin or onto a never-cache route are refused
/// without a fetch. Fetches run concurrently. Failures are logged and
/// reported; a partial precache never stops startup.
pub async fn precache(
    region: &Region,
    rules: &RouteRules,
    origin: &Url,
    paths: &[String],
    fetcher: &dyn Fetcher,
) -> PrecacheReport {
    let results = join_all(
        paths
            .iter()
            .map(|path| precache_one(region, rules, origin, path, fetcher)),
    )
    .await;

    let mut report = PrecacheReport::default();
    for (path, result) in paths.iter().zip(results) {
        match result {
            Ok(()) => report.stored.push(path.clone()),
            Err(reason) => {
                tracing::warn!(path = %path, region = region.name(), reason = %reason, "precache failed");
                report.failed.push((path.clone(), reason));
            }
        }
    }

    tracing::info!(
        region = region.name(),
        stored = report.stored.len(),
        failed = report.failed.len(),
        "precache finished"
    );
    report
}

async fn precache_one(
    region: &Region,
    rules: &RouteRules,
    origin: &Url,
    path: &str,
    fetcher: &dyn Fetcher,
) -> Result<(), String> {
    let url = origin.join(path).map_err(|e| format!("invalid path: {}", e))?;
    let request = RequestDescriptor::from_url(http::Method::GET, url);

    if request.origin() != rules.origin() {
        return Err(format!("refusing cross-origin url {}", request.url()));
    }
    if rules.classify(&request) == Classification::Policy(PolicyClass::NeverCache) {
        return Err("refusing never-cache route".to_string());
    }

    let response: ResponseEntry = fetcher
        .fetch(&request)
        .await
        .map_err(|e| e.to_string())?;
    if !response.is_success() {
        return Err(format!("origin returned {}", response.status));
    }

    region
        .put(request.identity_key(), response.without_header(X_CAPTURED_AT))
        .await
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use edge_core::IdentityKey;
    use edge_data::MockFetcher;

    use super::*;
    use crate::store::{MemoryRegionStore, RegionStore};

    fn origin() -> Url {
        Url::parse("https://example.com").unwrap()
    }

    fn rules() -> RouteRules {
        RouteRules::new("https://example.com").with_sensitive_prefix("/login")
    }

    fn paths(list: &[&str]) -> Vec<String> {
        list.iter().map(|p| p.to_string()).collect()
    }

    #[tokio::test]
    async fn test_stores_successful_paths() {
        let store: Arc<dyn RegionStore> = Arc::new(MemoryRegionStore::new());
        let region = Region::new(store, "static-v1");
        let fetcher = MockFetcher::new();
        fetcher.respond("https://example.com/", ResponseEntry::ok("home"));
        fetcher.respond("https://example.com/offline.html", ResponseEntry::ok("offline"));

        let report = precache(&region, &rules(), &origin(), &paths(&["/", "/offline.html"]), &fetcher).await;

        assert!(report.is_complete());
        assert_eq!(report.stored, paths(&["/", "/offline.html"]));
        let root = IdentityKey::from_raw("GET https://example.com/");
        assert_eq!(region.get(&root).await.unwrap().unwrap().body_text(), "home");
    }

    #[tokio::test]
    async fn test_failures_are_reported_not_fatal() {
        let store: Arc<dyn RegionStore> = Arc::new(MemoryRegionStore::new());
        let region = Region::new(store, "static-v1");
        let fetcher = MockFetcher::new();
        fetcher.respond("https://example.com/", ResponseEntry::ok("home"));
        fetcher.fail("https://example.com/down.css");

        let report = precache(
            &region,
            &rules(),
            &origin(),
            &paths(&["/", "/down.css", "/missing.js"]),
            &fetcher,
        )
        .await;

        assert_eq!(report.stored, paths(&["/"]));
        let failed: Vec<&str> = report.failed.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(failed, vec!["/down.css", "/missing.js"]);
        assert!(report.failed[1].1.contains("404"));
        assert_eq!(region.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_empty_list() {
        let store: Arc<dyn RegionStore> = Arc::new(MemoryRegionStore::new());
        let region = Region::new(store.clone(), "static-v1");
        let report = precache(&region, &rules(), &origin(), &[], &MockFetcher::new()).await;
        assert_eq!(report, PrecacheReport::default());
        assert!(store.list_regions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_refuses_cross_origin_and_never_cache_paths() {
        let store: Arc<dyn RegionStore> = Arc::new(MemoryRegionStore::new());
        let region = Region::new(store, "static-v1");
        let fetcher = MockFetcher::new();
        fetcher.respond("https://example.com/", ResponseEntry::ok("home"));
        fetcher.respond("https://evil.example/track.js", ResponseEntry::ok("track"));
        fetcher.respond("https://example.com/login", ResponseEntry::ok("form"));

        let report = precache(
            &region,
            &rules(),
            &origin(),
            &paths(&["/", "//evil.example/track.js", "/login"]),
            &fetcher,
        )
        .await;

        assert_eq!(report.stored, paths(&["/"]));
        let failed: Vec<&str> = report.failed.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(failed, vec!["//evil.example/track.js", "/login"]);

        let keys: Vec<String> = region
            .keys()
            .await
            .unwrap()
            .iter()
            .map(|k| k.to_string())
            .collect();
        assert_eq!(keys, vec!["GET https://example.com/"]);
        assert_eq!(fetcher.call_count("https://evil.example/track.js"), 0);
        assert_eq!(fetcher.call_count("https://example.com/login"), 0);
    }
}
