//! Core abstractions for the edge offline response cache.
//!
//! This crate provides the fundamental types shared by every other crate:
//! - `RequestDescriptor` - Immutable view of an inbound request
//! - `ResourceType` - Declared destination of a request (script, image, ...)
//! - `IdentityKey` - Deterministic method + URL cache key
//! - `ResponseEntry` - A network response or a stored cache entry
//! - `CacheConfig` - Recognized configuration options

mod config;
mod context;
mod response;

pub use config::*;
pub use context::*;
pub use response::*;
