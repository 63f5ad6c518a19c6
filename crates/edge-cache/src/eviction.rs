//! Entry-count eviction for capped regions.

use crate::store::{Region, StoreResult};

/// Trim a region to at most `max_entries`, oldest insertions first.
///
/// Returns the number of entries removed. Calling it again on a region
/// already at or under the cap is a no-op.
pub async fn enforce_cap(region: &Region, max_entries: usize) -> StoreResult<usize> {
    let keys = region.keys().await?;
    if keys.len() <= max_entries {
        return Ok(0);
    }

    let excess = keys.len() - max_entries;
    let mut evicted = 0;
    for key in keys.iter().take(excess) {
        if region.delete(key).await? {
            evicted += 1;
        }
    }

    tracing::debug!(region = region.name(), evicted, max_entries, "evicted oldest entries");
    Ok(evicted)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use edge_core::{IdentityKey, ResponseEntry};

    use super::*;
    use crate::store::{MemoryRegionStore, RegionStore};

    fn key(s: &str) -> IdentityKey {
        IdentityKey::from_raw(format!("GET https://example.com/{}", s))
    }

    async fn region_with(keys: &[&str]) -> Region {
        let store: Arc<dyn RegionStore> = Arc::new(MemoryRegionStore::new());
        let region = Region::new(store, "pages-v1");
        for k in keys {
            region.put(&key(k), ResponseEntry::ok(*k)).await.unwrap();
        }
        region
    }

    #[tokio::test]
    async fn test_oldest_first() {
        let region = region_with(&["A", "B", "C"]).await;

        assert_eq!(enforce_cap(&region, 2).await.unwrap(), 1);
        assert_eq!(region.keys().await.unwrap(), vec![key("B"), key("C")]);
    }

    #[tokio::test]
    async fn test_idempotent() {
        let region = region_with(&["A", "B", "C", "D", "E"]).await;

        assert_eq!(enforce_cap(&region, 3).await.unwrap(), 2);
        let once = region.keys().await.unwrap();
        assert_eq!(enforce_cap(&region, 3).await.unwrap(), 0);
        assert_eq!(region.keys().await.unwrap(), once);
    }

    #[tokio::test]
    async fn test_under_cap_is_noop() {
        let region = region_with(&["A"]).await;
        assert_eq!(enforce_cap(&region, 5).await.unwrap(), 0);
        assert_eq!(region.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_replaced_key_counts_as_newest() {
        let region = region_with(&["A", "B"]).await;
        region.put(&key("A"), ResponseEntry::ok("A2")).await.unwrap();
        region.put(&key("C"), ResponseEntry::ok("C")).await.unwrap();

        enforce_cap(&region, 2).await.unwrap();
        assert_eq!(region.keys().await.unwrap(), vec![key("A"), key("C")]);
    }

    #[tokio::test]
    async fn test_cap_invariant_over_many_writes() {
        let region = region_with(&[]).await;
        for i in 0..25 {
            region
                .put(&key(&i.to_string()), ResponseEntry::ok("x"))
                .await
                .unwrap();
            enforce_cap(&region, 7).await.unwrap();
            assert!(region.len().await.unwrap() <= 7);
        }
        let keys = region.keys().await.unwrap();
        assert_eq!(keys.first(), Some(&key("18")));
        assert_eq!(keys.last(), Some(&key("24")));
    }
}
