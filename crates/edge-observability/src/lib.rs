//! Observability infrastructure for the edge offline response cache.
//!
//! This crate provides:
//! - `init_logging` - Installs a `tracing` subscriber (JSON or human output)
//! - `CacheMetrics` - Lock-free counters for cache decisions
//! - `MetricsSnapshot` - Serializable point-in-time view of the counters

mod logging;
mod metrics;

pub use logging::*;
pub use metrics::*;
