//! Cache manager configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

/// Error type for invalid configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("build_version must not be empty")]
    EmptyBuildVersion,

    #[error("build_version '{0}' must not contain whitespace or path separators")]
    InvalidBuildVersion(String),

    #[error("origin '{0}' is not an absolute http(s) URL")]
    InvalidOrigin(String),

    #[error("{field} prefix '{prefix}' must start with '/'")]
    InvalidPrefix { field: &'static str, prefix: String },

    #[error("cap for region '{0}' must be greater than zero")]
    ZeroCap(&'static str),

    #[error("ttl_ms must be greater than zero")]
    ZeroTtl,

    #[error("precache path '{0}' must be site-relative (start with a single '/')")]
    InvalidPrecachePath(String),
}

/// Recognized configuration options for the cache manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Build version; drives region naming and sweeper comparison.
    pub build_version: String,
    /// Origin the cache manager serves (e.g. `https://example.com`).
    pub origin: String,
    /// Path prefixes that are never cached (authentication, payment flows).
    pub sensitive_prefixes: Vec<String>,
    /// Path prefix of the dynamic data API.
    pub api_prefix: String,
    /// Path prefix of web fonts.
    pub fonts_prefix: String,
    /// Freshness window for dynamic-api entries, in milliseconds.
    pub ttl_ms: u64,
    /// Per-region eviction limits.
    pub caps: CapsConfig,
    /// Paths fetched and stored unconditionally at startup.
    pub precache_list: Vec<String>,
}

/// Eviction caps for the capped regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapsConfig {
    /// Maximum entries in the `pages` region.
    pub pages: usize,
    /// Maximum entries in the `images` region.
    pub images: usize,
    /// Maximum entries in the `api` region.
    pub api: usize,
}

impl Default for CapsConfig {
    fn default() -> Self {
        Self {
            pages: 100,
            images: 200,
            api: 50,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            build_version: "v1".to_string(),
            origin: "http://localhost".to_string(),
            sensitive_prefixes: ["/login", "/logout", "/register", "/auth", "/checkout", "/payment"]
                .into_iter()
                .map(String::from)
                .collect(),
            api_prefix: "/api/".to_string(),
            fonts_prefix: "/fonts/".to_string(),
            ttl_ms: 300_000,
            caps: CapsConfig::default(),
            precache_list: vec!["/".to_string()],
        }
    }
}

impl CacheConfig {
    /// Create a default config for a build version and origin.
    pub fn new(build_version: impl Into<String>, origin: impl Into<String>) -> Self {
        Self {
            build_version: build_version.into(),
            origin: origin.into(),
            ..Default::default()
        }
    }

    /// Freshness window as a `Duration`.
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    /// Resolve a site-relative path against the configured origin.
    pub fn resolve(&self, path: &str) -> Result<Url, ConfigError> {
        let base = self.origin_url()?;
        base.join(path)
            .map_err(|_| ConfigError::InvalidOrigin(self.origin.clone()))
    }

    /// Parse the configured origin.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.origin)
            .map_err(|_| ConfigError::InvalidOrigin(self.origin.clone()))?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(ConfigError::InvalidOrigin(self.origin.clone()));
        }
        Ok(url)
    }

    /// Check the configuration for values the cache manager cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.build_version.is_empty() {
            return Err(ConfigError::EmptyBuildVersion);
        }
        if self
            .build_version
            .chars()
            .any(|c| c.is_whitespace() || c == '/' || c == '\\')
        {
            return Err(ConfigError::InvalidBuildVersion(self.build_version.clone()));
        }

        self.origin_url()?;

        for prefix in &self.sensitive_prefixes {
            check_prefix("sensitive", prefix)?;
        }
        check_prefix("api", &self.api_prefix)?;
        check_prefix("fonts", &self.fonts_prefix)?;

        if self.caps.pages == 0 {
            return Err(ConfigError::ZeroCap("pages"));
        }
        if self.caps.images == 0 {
            return Err(ConfigError::ZeroCap("images"));
        }
        if self.caps.api == 0 {
            return Err(ConfigError::ZeroCap("api"));
        }
        if self.ttl_ms == 0 {
            return Err(ConfigError::ZeroTtl);
        }

        if let Some(path) = self.precache_list.iter().find(|p| !is_site_relative(p)) {
            return Err(ConfigError::InvalidPrecachePath(path.clone()));
        }

        Ok(())
    }
}

fn check_prefix(field: &'static str, prefix: &str) -> Result<(), ConfigError> {
    if prefix.starts_with('/') {
        Ok(())
    } else {
        Err(ConfigError::InvalidPrefix {
            field,
            prefix: prefix.to_string(),
        })
    }
}

/// `/path` but not `//host/path`.
fn is_site_relative(path: &str) -> bool {
    path.starts_with('/') && !path.starts_with("//") && !path.starts_with("/\\")
}
