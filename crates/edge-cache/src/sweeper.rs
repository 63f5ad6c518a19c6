//! Generation sweeper: deletes regions left behind by earlier builds.

use serde::{Deserialize, Serialize};

use crate::region::is_stale_region;
use crate::store::{RegionStore, StoreResult};

/// What a sweep did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    /// Regions belonging to the current version.
    pub kept: Vec<String>,
    /// Stale regions that were deleted.
    pub deleted: Vec<String>,
    /// Stale regions whose deletion failed, with the error.
    pub failed: Vec<(String, String)>,
}

impl SweepReport {
    /// Whether every stale region was removed.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Stale regions in `store` for `current_version`, without deleting anything.
pub async fn stale_regions(
    store: &dyn RegionStore,
    current_version: &str,
) -> StoreResult<Vec<String>> {
    Ok(store
        .list_regions()
        .await?
        .into_iter()
        .filter(|name| is_stale_region(name, current_version))
        .collect())
}

/// Delete every region whose version suffix differs from `current_version`.
///
/// Only listing the regions can fail the sweep. A region that cannot be
/// deleted is logged, recorded and skipped.
pub async fn sweep(store: &dyn RegionStore, current_version: &str) -> StoreResult<SweepReport> {
    let mut report = SweepReport::default();

    for name in store.list_regions().await? {
        if !is_stale_region(&name, current_version) {
            report.kept.push(name);
            continue;
        }

        match store.delete_region(&name).await {
            Ok(_) => {
                tracing::info!(region = %name, current_version, "deleted stale region");
                report.deleted.push(name);
            }
            Err(err) => {
                tracing::warn!(region = %name, error = %err, "failed to delete stale region");
                report.failed.push((name, err.to_string()));
            }
        }
    }

    Ok(report)
}
