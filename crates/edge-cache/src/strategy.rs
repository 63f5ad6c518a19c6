//! Strategy execution: cache-first, network-first and pass-through.

use std::fmt;
use std::sync::Arc;

use edge_core::{IdentityKey, RequestDescriptor, ResponseEntry};
use edge_data::{FetchError, Fetcher};
use edge_observability::CacheMetrics;
use http::Method;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::eviction::enforce_cap;
use crate::freshness::FreshnessTagger;
use crate::headers::header_names::X_CAPTURED_AT;
use crate::policy::{Classification, PolicyClass};
use crate::region::RegionKind;
use crate::store::{Region, RegionStore};

/// How a response was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    /// Served from a region without touching the network.
    Hit,
    /// Served from the network (and stored if cacheable).
    Miss,
    /// Network failed; served a stored dynamic-api entry.
    Stale,
    /// Network failed; served the cached root document.
    Fallback,
    /// Network failed with nothing stored; served a synthesized error payload.
    Offline,
    /// Cache not involved.
    Bypass,
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hit => write!(f, "HIT"),
            Self::Miss => write!(f, "MISS"),
            Self::Stale => write!(f, "STALE"),
            Self::Fallback => write!(f, "FALLBACK"),
            Self::Offline => write!(f, "OFFLINE"),
            Self::Bypass => write!(f, "BYPASS"),
        }
    }
}

/// Result of handling one request.
///
/// A dynamic-api miss carries the capture-tagged response, identical to the
/// stored copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Response handed back to the caller.
    pub response: ResponseEntry,
    /// How the response was produced.
    pub status: CacheStatus,
    /// Classification of the request.
    pub classification: Classification,
    /// Region read from or written to.
    pub region: Option<String>,
}

/// Failure surfaced to the caller.
///
/// Store failures never appear here: reads degrade to a miss and writes are
/// logged and dropped.
#[derive(Debug, thiserror::Error)]
pub enum HandleError {
    #[error("network failure for {key}: {source}")]
    Network {
        key: IdentityKey,
        #[source]
        source: FetchError,
    },
}

/// Body of the synthesized dynamic-api failure response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfflinePayload {
    /// Error kind: `offline` or `upstream`.
    pub error: String,
    /// Human-readable message.
    pub message: String,
}

impl OfflinePayload {
    pub const ERROR_KIND: &'static str = "offline";
    pub const UPSTREAM_ERROR_KIND: &'static str = "upstream";

    /// Payload for a request with no cached data.
    pub fn no_cached_data() -> Self {
        Self {
            error: Self::ERROR_KIND.to_string(),
            message: "You are offline and no cached data is available.".to_string(),
        }
    }

    /// Payload for an origin that answered with a non-2xx status while no
    /// cached data is available.
    pub fn upstream_failed(status: u16) -> Self {
        Self {
            error: Self::UPSTREAM_ERROR_KIND.to_string(),
            message: format!(
                "The server responded with status {} and no cached data is available.",
                status
            ),
        }
    }

    /// Render as a `503 Service Unavailable` JSON response.
    pub fn into_response(self) -> ResponseEntry {
        let body = serde_json::to_vec(&self).unwrap_or_default();
        ResponseEntry::new(503)
            .with_header("Content-Type", "application/json")
            .with_header("Cache-Control", "no-store")
            .with_body(body)
    }
}

/// Executes the caching strategy for a classified request.
pub struct StrategyExecutor {
    store: Arc<dyn RegionStore>,
    version: String,
    caps: edge_core::CapsConfig,
    root_key: IdentityKey,
    tagger: FreshnessTagger,
    metrics: Arc<CacheMetrics>,
}

impl StrategyExecutor {
    /// Create an executor over `store` for the given build version.
    pub fn new(
        store: Arc<dyn RegionStore>,
        version: impl Into<String>,
        caps: edge_core::CapsConfig,
        origin: &Url,
    ) -> Self {
        let mut root = origin.clone();
        root.set_path("/");
        root.set_query(None);
        root.set_fragment(None);

        Self {
            store,
            version: version.into(),
            caps,
            root_key: IdentityKey::derive(&Method::GET, &root),
            tagger: FreshnessTagger::default(),
            metrics: Arc::new(CacheMetrics::new()),
        }
    }

    /// Use a specific freshness tagger (and therefore clock).
    pub fn with_tagger(mut self, tagger: FreshnessTagger) -> Self {
        self.tagger = tagger;
        self
    }

    /// Record into shared metrics.
    pub fn with_metrics(mut self, metrics: Arc<CacheMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// The freshness tagger in use.
    pub fn tagger(&self) -> &FreshnessTagger {
        &self.tagger
    }

    /// Handle to the current-version region of `kind`.
    pub fn region(&self, kind: RegionKind) -> Region {
        Region::new(self.store.clone(), kind.region_name(&self.version))
    }

    /// Run the strategy for `classification`.
    pub async fn execute(
        &self,
        request: &RequestDescriptor,
        classification: Classification,
        fetcher: &dyn Fetcher,
    ) -> Result<Outcome, HandleError> {
        match classification.policy() {
            None | Some(PolicyClass::NeverCache) => {
                self.pass_through(request, classification, fetcher).await
            }
            Some(PolicyClass::StaticImmutable) => {
                self.cache_first(request, classification, RegionKind::Static, false, fetcher)
                    .await
            }
            Some(PolicyClass::Media) => {
                self.cache_first(request, classification, RegionKind::Images, false, fetcher)
                    .await
            }
            Some(PolicyClass::Document) => {
                self.cache_first(request, classification, RegionKind::Pages, true, fetcher)
                    .await
            }
            Some(PolicyClass::DynamicApi) => {
                self.network_first(request, classification, fetcher).await
            }
        }
    }

    async fn pass_through(
        &self,
        request: &RequestDescriptor,
        classification: Classification,
        fetcher: &dyn Fetcher,
    ) -> Result<Outcome, HandleError> {
        self.metrics.record_bypass();
        let response = fetcher
            .fetch(request)
            .await
            .map_err(|source| network_error(request, source))?;

        Ok(Outcome {
            response,
            status: CacheStatus::Bypass,
            classification,
            region: None,
        })
    }

    async fn cache_first(
        &self,
        request: &RequestDescriptor,
        classification: Classification,
        kind: RegionKind,
        root_fallback: bool,
        fetcher: &dyn Fetcher,
    ) -> Result<Outcome, HandleError> {
        let key = request.identity_key();
        let region = self.region(kind);

        if let Some(entry) = self.lookup(&region, key).await {
            tracing::debug!(key = %key, region = region.name(), "cache hit");
            self.metrics.record_hit();
            return Ok(Outcome {
                response: entry,
                status: CacheStatus::Hit,
                classification,
                region: Some(region.name().to_string()),
            });
        }

        tracing::debug!(key = %key, region = region.name(), "cache miss");
        self.metrics.record_miss();

        match fetcher.fetch(request).await {
            Ok(response) => {
                if response.is_success() && request.is_read() {
                    let stored = response.without_header(X_CAPTURED_AT);
                    self.store_and_evict(&region, kind, key, stored).await;
                }
                Ok(Outcome {
                    response,
                    status: CacheStatus::Miss,
                    classification,
                    region: Some(region.name().to_string()),
                })
            }
            Err(source) => {
                if root_fallback {
                    if let Some((root, region_name)) = self.root_document().await {
                        tracing::info!(key = %key, error = %source, "serving cached root document");
                        self.metrics.record_document_fallback();
                        return Ok(Outcome {
                            response: root,
                            status: CacheStatus::Fallback,
                            classification,
                            region: Some(region_name),
                        });
                    }
                }
                Err(network_error(request, source))
            }
        }
    }

    async fn network_first(
        &self,
        request: &RequestDescriptor,
        classification: Classification,
        fetcher: &dyn Fetcher,
    ) -> Result<Outcome, HandleError> {
        let key = request.identity_key();
        let region = self.region(RegionKind::Api);
        let region_name = Some(region.name().to_string());

        let failure = match fetcher.fetch(request).await {
            Ok(response) if response.is_success() => {
                self.metrics.record_miss();
                let tagged = self.tagger.tag(&response);
                self.store_and_evict(&region, RegionKind::Api, key, tagged.clone())
                    .await;
                return Ok(Outcome {
                    response: tagged,
                    status: CacheStatus::Miss,
                    classification,
                    region: region_name,
                });
            }
            Ok(response) => ApiFailure::Status(response),
            Err(source) => ApiFailure::Transport(source),
        };

        // Any stored entry is served, fresh or not.
        if let Some(stale) = self.lookup(&region, key).await {
            tracing::info!(key = %key, "network failed, serving stored api entry");
            self.metrics.record_stale_fallback();
            return Ok(Outcome {
                response: stale,
                status: CacheStatus::Stale,
                classification,
                region: region_name,
            });
        }

        let payload = match failure {
            ApiFailure::Status(response) => {
                tracing::warn!(key = %key, status = response.status, "origin error with no cached api data");
                OfflinePayload::upstream_failed(response.status)
            }
            ApiFailure::Transport(source) => {
                tracing::warn!(key = %key, error = %source, "offline with no cached api data");
                OfflinePayload::no_cached_data()
            }
        };
        self.metrics.record_offline_payload();
        Ok(Outcome {
            response: payload.into_response(),
            status: CacheStatus::Offline,
            classification,
            region: region_name,
        })
    }

    /// Read an entry, treating store failures as a miss.
    async fn lookup(&self, region: &Region, key: &IdentityKey) -> Option<ResponseEntry> {
        match region.get(key).await {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(region = region.name(), key = %key, error = %err, "store read failed, treating as miss");
                self.metrics.record_store_error();
                None
            }
        }
    }

    /// Write an entry and enforce the region cap. Failures are logged and
    /// swallowed.
    async fn store_and_evict(
        &self,
        region: &Region,
        kind: RegionKind,
        key: &IdentityKey,
        entry: ResponseEntry,
    ) {
        if let Err(err) = region.put(key, entry).await {
            tracing::warn!(region = region.name(), key = %key, error = %err, "store write failed");
            self.metrics.record_store_error();
            return;
        }
        self.metrics.record_write();

        let Some(cap) = kind.cap(&self.caps) else {
            return;
        };
        match enforce_cap(region, cap).await {
            Ok(evicted) => self.metrics.record_evictions(evicted as u64),
            Err(err) => {
                tracing::warn!(region = region.name(), error = %err, "eviction failed");
                self.metrics.record_store_error();
            }
        }
    }

    /// Cached root document, looked up in `pages` then `static`.
    async fn root_document(&self) -> Option<(ResponseEntry, String)> {
        for kind in [RegionKind::Pages, RegionKind::Static] {
            let region = self.region(kind);
            if let Some(entry) = self.lookup(&region, &self.root_key).await {
                return Some((entry, region.name().to_string()));
            }
        }
        None
    }
}

/// Why a network-first fetch could not be used as-is.
enum ApiFailure {
    /// Origin answered with a non-2xx status.
    Status(ResponseEntry),
    /// No response at all.
    Transport(FetchError),
}

fn network_error(request: &RequestDescriptor, source: FetchError) -> HandleError {
    HandleError::Network {
        key: request.identity_key().clone(),
        source,
    }
}
