//! Cache region storage.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use edge_core::{IdentityKey, ResponseEntry};
use tokio::sync::RwLock;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Store operation errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Backing storage cannot be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Filesystem error on a region.
    #[error("I/O error on region '{region}': {source}")]
    Io {
        region: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize/deserialize a region.
    #[error("serialization error on region '{region}': {message}")]
    Serialization { region: String, message: String },

    /// Region name cannot be stored safely.
    #[error("invalid region name: '{0}'")]
    InvalidRegionName(String),
}

/// A set of named regions holding request→response entries.
///
/// Per-key operations are atomic. `keys` returns insertion order, and a
/// replacing `put` moves the key to the end. Reading a region that does not
/// exist yields nothing and does not create it.
#[async_trait]
pub trait RegionStore: Send + Sync {
    /// Create the region if absent. Idempotent.
    async fn open(&self, region: &str) -> StoreResult<()>;

    /// Get a stored entry.
    async fn get(&self, region: &str, key: &IdentityKey) -> StoreResult<Option<ResponseEntry>>;

    /// Store an entry, replacing any previous entry for the key. Creates the
    /// region on first write.
    async fn put(&self, region: &str, key: &IdentityKey, entry: ResponseEntry) -> StoreResult<()>;

    /// Keys in insertion order.
    async fn keys(&self, region: &str) -> StoreResult<Vec<IdentityKey>>;

    /// Delete an entry. Returns whether it existed.
    async fn delete(&self, region: &str, key: &IdentityKey) -> StoreResult<bool>;

    /// Names of all regions.
    async fn list_regions(&self) -> StoreResult<Vec<String>>;

    /// Delete a region and every entry in it. Returns whether it existed.
    async fn delete_region(&self, region: &str) -> StoreResult<bool>;
}

/// Handle to one named region of a store.
#[derive(Clone)]
pub struct Region {
    name: String,
    store: Arc<dyn RegionStore>,
}

impl Region {
    /// Create a handle without touching the store.
    pub fn new(store: Arc<dyn RegionStore>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            store,
        }
    }

    /// Create the region if absent and return a handle to it.
    pub async fn open(store: Arc<dyn RegionStore>, name: impl Into<String>) -> StoreResult<Self> {
        let region = Self::new(store, name);
        region.store.open(&region.name).await?;
        Ok(region)
    }

    /// Region name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get a stored entry.
    pub async fn get(&self, key: &IdentityKey) -> StoreResult<Option<ResponseEntry>> {
        self.store.get(&self.name, key).await
    }

    /// Store an entry with replace semantics.
    pub async fn put(&self, key: &IdentityKey, entry: ResponseEntry) -> StoreResult<()> {
        self.store.put(&self.name, key, entry).await
    }

    /// Keys in insertion order.
    pub async fn keys(&self) -> StoreResult<Vec<IdentityKey>> {
        self.store.keys(&self.name).await
    }

    /// Delete an entry.
    pub async fn delete(&self, key: &IdentityKey) -> StoreResult<bool> {
        self.store.delete(&self.name, key).await
    }

    /// Number of entries.
    pub async fn len(&self) -> StoreResult<usize> {
        Ok(self.keys().await?.len())
    }

    /// Whether the region holds no entries.
    pub async fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len().await? == 0)
    }
}

impl std::fmt::Debug for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Region").field("name", &self.name).finish()
    }
}

type Entries = Vec<(IdentityKey, ResponseEntry)>;

/// In-memory region store.
///
/// State lives for the lifetime of the process; use `FsRegionStore` when
/// regions must survive a restart.
#[derive(Debug, Default)]
pub struct MemoryRegionStore {
    regions: RwLock<BTreeMap<String, Entries>>,
}

impl MemoryRegionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RegionStore for MemoryRegionStore {
    async fn open(&self, region: &str) -> StoreResult<()> {
        self.regions
            .write()
            .await
            .entry(region.to_string())
            .or_default();
        Ok(())
    }

    async fn get(&self, region: &str, key: &IdentityKey) -> StoreResult<Option<ResponseEntry>> {
        let regions = self.regions.read().await;
        Ok(regions.get(region).and_then(|entries| {
            entries
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, entry)| entry.clone())
        }))
    }

    async fn put(&self, region: &str, key: &IdentityKey, entry: ResponseEntry) -> StoreResult<()> {
        let mut regions = self.regions.write().await;
        let entries = regions.entry(region.to_string()).or_default();
        entries.retain(|(k, _)| k != key);
        entries.push((key.clone(), entry));
        Ok(())
    }

    async fn keys(&self, region: &str) -> StoreResult<Vec<IdentityKey>> {
        let regions = self.regions.read().await;
        Ok(regions
            .get(region)
            .map(|entries| entries.iter().map(|(k, _)| k.clone()).collect())
            .unwrap_or_default())
    }

    async fn delete(&self, region: &str, key: &IdentityKey) -> StoreResult<bool> {
        let mut regions = self.regions.write().await;
        let Some(entries) = regions.get_mut(region) else {
            return Ok(false);
        };
        let before = entries.len();
        entries.retain(|(k, _)| k != key);
        Ok(entries.len() != before)
    }

    async fn list_regions(&self) -> StoreResult<Vec<String>> {
        Ok(self.regions.read().await.keys().cloned().collect())
    }

    async fn delete_region(&self, region: &str) -> StoreResult<bool> {
        Ok(self.regions.write().await.remove(region).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> IdentityKey {
        IdentityKey::from_raw(format!("GET https://example.com/{}", s))
    }

    #[tokio::test]
    async fn test_open_is_idempotent() {
        let store = MemoryRegionStore::new();
        store.open("pages-v1").await.unwrap();
        store.put("pages-v1", &key("a"), ResponseEntry::ok("a")).await.unwrap();
        store.open("pages-v1").await.unwrap();

        assert_eq!(store.keys("pages-v1").await.unwrap(), vec![key("a")]);
        assert_eq!(store.list_regions().await.unwrap(), vec!["pages-v1"]);
    }

    #[tokio::test]
    async fn test_reads_do_not_create_regions() {
        let store = MemoryRegionStore::new();
        assert!(store.get("api-v1", &key("a")).await.unwrap().is_none());
        assert!(store.keys("api-v1").await.unwrap().is_empty());
        assert!(store.list_regions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_put_creates_region() {
        let store = MemoryRegionStore::new();
        store.put("images-v1", &key("a"), ResponseEntry::ok("a")).await.unwrap();
        assert_eq!(store.list_regions().await.unwrap(), vec!["images-v1"]);
    }

    #[tokio::test]
    async fn test_keys_preserve_insertion_order() {
        let store = MemoryRegionStore::new();
        for name in ["c", "a", "b"] {
            store.put("static-v1", &key(name), ResponseEntry::ok(name)).await.unwrap();
        }
        assert_eq!(
            store.keys("static-v1").await.unwrap(),
            vec![key("c"), key("a"), key("b")]
        );
    }

    #[tokio::test]
    async fn test_replace_moves_key_to_end() {
        let store = MemoryRegionStore::new();
        store.put("api-v1", &key("a"), ResponseEntry::ok("old")).await.unwrap();
        store.put("api-v1", &key("b"), ResponseEntry::ok("b")).await.unwrap();
        store.put("api-v1", &key("a"), ResponseEntry::ok("new")).await.unwrap();

        assert_eq!(store.keys("api-v1").await.unwrap(), vec![key("b"), key("a")]);
        let a = store.get("api-v1", &key("a")).await.unwrap().unwrap();
        assert_eq!(a.body_text(), "new");
    }

    #[tokio::test]
    async fn test_delete_and_delete_region() {
        let store = MemoryRegionStore::new();
        store.put("pages-v1", &key("a"), ResponseEntry::ok("a")).await.unwrap();

        assert!(store.delete("pages-v1", &key("a")).await.unwrap());
        assert!(!store.delete("pages-v1", &key("a")).await.unwrap());
        assert!(!store.delete("missing-v1", &key("a")).await.unwrap());

        assert!(store.delete_region("pages-v1").await.unwrap());
        assert!(!store.delete_region("pages-v1").await.unwrap());
        assert!(store.list_regions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_regions_are_independent() {
        let store = MemoryRegionStore::new();
        store.put("pages-v1", &key("a"), ResponseEntry::ok("page")).await.unwrap();
        store.put("api-v1", &key("a"), ResponseEntry::ok("api")).await.unwrap();

        let page = store.get("pages-v1", &key("a")).await.unwrap().unwrap();
        let api = store.get("api-v1", &key("a")).await.unwrap().unwrap();
        assert_eq!(page.body_text(), "page");
        assert_eq!(api.body_text(), "api");
    }

    #[tokio::test]
    async fn test_region_handle() {
        let store: Arc<dyn RegionStore> = Arc::new(MemoryRegionStore::new());
        let region = Region::open(store.clone(), "static-v1").await.unwrap();

        assert_eq!(region.name(), "static-v1");
        assert!(region.is_empty().await.unwrap());

        region.put(&key("a"), ResponseEntry::ok("a")).await.unwrap();
        assert_eq!(region.len().await.unwrap(), 1);
        assert!(region.get(&key("a")).await.unwrap().is_some());
        assert!(region.delete(&key("a")).await.unwrap());
    }

    #[tokio::test]
    async fn test_region_handle_open() {
        let store: Arc<dyn RegionStore> = Arc::new(MemoryRegionStore::new());

        let lazy = Region::new(store.clone(), "images-v1");
        assert!(lazy.is_empty().await.unwrap());
        assert!(store.list_regions().await.unwrap().is_empty());

        let opened = Region::open(store.clone(), "pages-v1").await.unwrap();
        assert_eq!(opened.name(), "pages-v1");
        assert!(opened.is_empty().await.unwrap());
        assert_eq!(store.list_regions().await.unwrap(), vec!["pages-v1"]);
    }
}
