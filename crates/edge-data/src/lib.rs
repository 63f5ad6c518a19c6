//! Outbound network surface for the cache manager.
//!
//! This crate provides:
//! - `Fetcher` - The request/response exchange with the origin server
//! - `HttpFetcher` - A reqwest-backed fetcher with transport timeouts
//! - `TimeoutConfig` - Transport timeout settings
//! - `MockFetcher` - Scripted fetcher (feature `mock`)

mod client;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod timeout;

pub use client::*;
#[cfg(any(test, feature = "mock"))]
pub use mock::*;
pub use timeout::*;
