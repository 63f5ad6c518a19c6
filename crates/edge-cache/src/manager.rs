//! Cache manager: startup sequencing and request dispatch.

use std::sync::Arc;

use edge_core::{CacheConfig, ConfigError, RequestDescriptor};
use edge_data::Fetcher;
use edge_observability::{CacheMetrics, MetricsSnapshot};
use serde::{Deserialize, Serialize};

use crate::freshness::{Clock, FreshnessTagger, SystemClock};
use crate::headers::CacheExplainHeaders;
use crate::policy::{Classification, RouteRules};
use crate::precache::{precache, PrecacheReport};
use crate::region::RegionKind;
use crate::store::{Region, RegionStore};
use crate::strategy::{HandleError, Outcome, StrategyExecutor};
use crate::sweeper::{sweep, SweepReport};

/// What happened during startup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartupReport {
    pub precache: PrecacheReport,
    pub sweep: SweepReport,
    /// Set when the store could not list regions, so nothing was swept.
    pub sweep_error: Option<String>,
}

/// Configures and starts a [`CacheManager`].
pub struct CacheManagerBuilder {
    config: CacheConfig,
    store: Arc<dyn RegionStore>,
    clock: Arc<dyn Clock>,
    metrics: Arc<CacheMetrics>,
}

impl CacheManagerBuilder {
    /// Create a builder over `store`.
    pub fn new(config: CacheConfig, store: Arc<dyn RegionStore>) -> Self {
        Self {
            config,
            store,
            clock: Arc::new(SystemClock),
            metrics: Arc::new(CacheMetrics::new()),
        }
    }

    /// Read time from `clock` instead of the system clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Record into externally owned metrics.
    pub fn with_metrics(mut self, metrics: Arc<CacheMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Precache the configured list into `static`, then sweep stale regions.
    ///
    /// Only an invalid configuration fails startup. Precache and sweep
    /// problems are logged and reported.
    pub async fn start(
        self,
        fetcher: &dyn Fetcher,
    ) -> Result<(CacheManager, StartupReport), ConfigError> {
        self.config.validate()?;
        let origin = self.config.origin_url()?;
        let rules = RouteRules::from_config(&self.config)?;
        let version = self.config.build_version.clone();

        tracing::info!(version = %version, origin = %origin, "starting cache manager");

        let static_region = Region::new(
            self.store.clone(),
            RegionKind::Static.region_name(&version),
        );
        let precache_report =
            precache(
            &static_region,
            &rules,
            &origin,
            &self.config.precache_list,
            fetcher,
        )
        .await;

        let mut report = StartupReport {
            precache: precache_report,
            ..Default::default()
        };
        match sweep(self.store.as_ref(), &version).await {
            Ok(swept) => report.sweep = swept,
            Err(err) => {
                tracing::warn!(error = %err, "could not list regions, skipping sweep");
                report.sweep_error = Some(err.to_string());
            }
        }

        let tagger = FreshnessTagger::new(self.clock);
        let executor = StrategyExecutor::new(
            self.store.clone(),
            version,
            self.config.caps,
            &origin,
        )
        .with_tagger(tagger)
        .with_metrics(self.metrics.clone());

        let manager = CacheManager {
            config: self.config,
            rules,
            store: self.store,
            executor,
            metrics: self.metrics,
        };
        Ok((manager, report))
    }
}

/// Classifies requests and runs the matching strategy.
///
/// Only obtainable from [`CacheManagerBuilder::start`], so precache and sweep
/// have always completed before the first request.
pub struct CacheManager {
    config: CacheConfig,
    rules: RouteRules,
    store: Arc<dyn RegionStore>,
    executor: StrategyExecutor,
    metrics: Arc<CacheMetrics>,
}

impl CacheManager {
    /// Shorthand for [`CacheManagerBuilder::new`].
    pub fn builder(config: CacheConfig, store: Arc<dyn RegionStore>) -> CacheManagerBuilder {
        CacheManagerBuilder::new(config, store)
    }

    /// Classify without handling.
    pub fn classify(&self, request: &RequestDescriptor) -> Classification {
        self.rules.classify(request)
    }

    /// Handle one request.
    pub async fn handle(
        &self,
        request: &RequestDescriptor,
        fetcher: &dyn Fetcher,
    ) -> Result<Outcome, HandleError> {
        let classification = self.classify(request);
        tracing::debug!(
            key = %request.identity_key(),
            classification = %classification,
            "classified request"
        );
        self.executor.execute(request, classification, fetcher).await
    }

    /// Debug headers describing `outcome`.
    pub fn explain(&self, outcome: &Outcome) -> CacheExplainHeaders {
        CacheExplainHeaders::from_outcome(outcome, self.executor.tagger(), self.config.ttl())
    }

    /// Handle to the current-version region of `kind`.
    pub fn region(&self, kind: RegionKind) -> Region {
        self.executor.region(kind)
    }

    /// Active configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Underlying store.
    pub fn store(&self) -> &Arc<dyn RegionStore> {
        &self.store
    }

    /// Current counter values.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

impl std::fmt::Debug for CacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheManager")
            .field("version", &self.config.build_version)
            .field("rules", &self.rules)
            .finish_non_exhaustive()
    }
}
