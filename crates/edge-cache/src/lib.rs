//! Offline response cache manager.
//!
//! This crate provides:
//! - `RouteRules` - Classifies requests into policy classes
//! - `RegionStore` - Versioned named regions (`MemoryRegionStore`, `FsRegionStore`)
//! - `enforce_cap` - Oldest-first eviction for capped regions
//! - `FreshnessTagger` - Capture timestamps and advisory freshness
//! - `StrategyExecutor` - Cache-first, network-first and pass-through paths
//! - `sweep` - Deletes regions left by earlier build versions
//! - `CacheManager` - Startup sequencing and request dispatch
//! - `CacheExplainHeaders` - Debug headers describing an outcome
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use edge_cache::{CacheManager, MemoryRegionStore};
//! use edge_core::{CacheConfig, RequestDescriptor};
//! use edge_data::HttpFetcher;
//!
//! let fetcher = HttpFetcher::new()?;
//! let config = CacheConfig::new("v4", "https://shop.example");
//! let (manager, report) = CacheManager::builder(config, Arc::new(MemoryRegionStore::new()))
//!     .start(&fetcher)
//!     .await?;
//!
//! let request = RequestDescriptor::get("https://shop.example/products")?.navigate();
//! let outcome = manager.handle(&request, &fetcher).await?;
//! println!("{} {}", outcome.status, outcome.response.status);
//! ```

mod eviction;
mod freshness;
mod fs_store;
mod headers;
mod manager;
mod policy;
mod precache;
mod region;
mod store;
mod strategy;
mod sweeper;

pub use eviction::*;
pub use freshness::*;
pub use fs_store::*;
pub use headers::*;
pub use manager::*;
pub use policy::*;
pub use precache::*;
pub use region::*;
pub use store::*;
pub use strategy::*;
pub use sweeper::*;
