//! Logical regions and versioned region naming.

use std::fmt;

use edge_core::CapsConfig;
use serde::{Deserialize, Serialize};

/// The fixed set of logical regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionKind {
    /// Scripts, styles, fonts and the precache list.
    Static,
    /// HTML documents.
    Pages,
    /// Images.
    Images,
    /// Dynamic API responses.
    Api,
}

impl RegionKind {
    /// Every logical region.
    pub const ALL: [RegionKind; 4] = [Self::Static, Self::Pages, Self::Images, Self::Api];

    /// Logical name used as the region name prefix.
    pub fn logical_name(&self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Pages => "pages",
            Self::Images => "images",
            Self::Api => "api",
        }
    }

    /// Eviction cap for this region; `None` means uncapped.
    pub fn cap(&self, caps: &CapsConfig) -> Option<usize> {
        match self {
            Self::Static => None,
            Self::Pages => Some(caps.pages),
            Self::Images => Some(caps.images),
            Self::Api => Some(caps.api),
        }
    }

    /// Full region name for a build version: `{logical}-{version}`.
    pub fn region_name(&self, version: &str) -> String {
        format!("{}-{}", self.logical_name(), version)
    }

    /// Look up a kind by logical name.
    pub fn from_logical_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.logical_name() == name)
    }
}

impl fmt::Display for RegionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.logical_name())
    }
}

/// Version suffix of a region name: everything after the first `-`.
///
/// Logical names never contain a dash, so versions may.
pub fn version_suffix(region: &str) -> Option<&str> {
    region
        .split_once('-')
        .map(|(_, version)| version)
        .filter(|version| !version.is_empty())
}

/// Whether a region belongs to a build version other than `current_version`.
pub fn is_stale_region(region: &str, current_version: &str) -> bool {
    version_suffix(region) != Some(current_version)
}
