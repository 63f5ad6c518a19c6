//! CLI configuration.

use anyhow::{Context, Result};
use edge_core::CacheConfig;
use serde::{Deserialize, Serialize};

/// CLI configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Cache manager configuration.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Where the cache lives on disk.
    #[serde(default)]
    pub store: StoreConfig,
}

impl CliConfig {
    /// Load config from a file.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        if path.ends_with(".json") {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path))
        } else {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML config: {}", path))
        }
    }
}

/// Store location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding one file per region.
    #[serde(default = "default_store_dir")]
    pub dir: String,
}

fn default_store_dir() -> String {
    ".edge-cache".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: default_store_dir(),
        }
    }
}

/// Generate a default edge-cache.toml config file.
pub fn generate_default_config(origin: &str, build_version: &str) -> String {
    format!(
        r#"# Offline response cache configuration

[cache]
build_version = "{build_version}"
origin = "{origin}"
sensitive_prefixes = ["/login", "/logout", "/register", "/auth", "/checkout", "/payment"]
api_prefix = "/api/"
fonts_prefix = "/fonts/"
# Freshness window for API responses, in milliseconds
ttl_ms = 300000
precache_list = ["/"]

[cache.caps]
pages = 100
images = 200
api = 50

[store]
dir = ".edge-cache"
"#,
        origin = origin,
        build_version = build_version
    )
}
