//! File-backed region store.
//!
//! One JSON document per region under a root directory. Entries are kept as
//! an ordered list, so insertion order survives a restart. Writes go to a
//! temporary file that is renamed over the region file.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use edge_core::{IdentityKey, ResponseEntry};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::store::{RegionStore, StoreError, StoreResult};

const REGION_EXT: &str = "json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegionFile {
    entries: Vec<StoredEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    key: IdentityKey,
    response: ResponseEntry,
}

/// Region store persisted to a directory.
#[derive(Debug)]
pub struct FsRegionStore {
    root: PathBuf,
    // Serializes read-modify-write cycles so per-key operations stay atomic.
    lock: Mutex<()>,
}

impl FsRegionStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub async fn open_dir(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|source| StoreError::Io {
                region: root.display().to_string(),
                source,
            })?;
        Ok(Self {
            root,
            lock: Mutex::new(()),
        })
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn region_path(&self, region: &str) -> StoreResult<PathBuf> {
        let valid = !region.is_empty()
            && !region.starts_with('.')
            && !region.contains(['/', '\\'])
            && !region.contains("..");
        if !valid {
            return Err(StoreError::InvalidRegionName(region.to_string()));
        }
        Ok(self.root.join(format!("{}.{}", region, REGION_EXT)))
    }

    async fn read_region(&self, region: &str) -> StoreResult<Option<RegionFile>> {
        let path = self.region_path(region)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::Io {
                    region: region.to_string(),
                    source,
                })
            }
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| StoreError::Serialization {
                region: region.to_string(),
                message: e.to_string(),
            })
    }

    async fn write_region(&self, region: &str, file: &RegionFile) -> StoreResult<()> {
        let path = self.region_path(region)?;
        let tmp = path.with_extension(format!("{}.tmp", REGION_EXT));
        let bytes = serde_json::to_vec(file).map_err(|e| StoreError::Serialization {
            region: region.to_string(),
            message: e.to_string(),
        })?;

        let io_err = |source| StoreError::Io {
            region: region.to_string(),
            source,
        };
        tokio::fs::write(&tmp, bytes).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, &path).await.map_err(io_err)
    }
}

#[async_trait]
impl RegionStore for FsRegionStore {
    async fn open(&self, region: &str) -> StoreResult<()> {
        let _guard = self.lock.lock().await;
        if self.read_region(region).await?.is_none() {
            self.write_region(region, &RegionFile::default()).await?;
        }
        Ok(())
    }

    async fn get(&self, region: &str, key: &IdentityKey) -> StoreResult<Option<ResponseEntry>> {
        let _guard = self.lock.lock().await;
        Ok(self.read_region(region).await?.and_then(|file| {
            file.entries
                .into_iter()
                .find(|e| &e.key == key)
                .map(|e| e.response)
        }))
    }

    async fn put(&self, region: &str, key: &IdentityKey, entry: ResponseEntry) -> StoreResult<()> {
        let _guard = self.lock.lock().await;
        let mut file = self.read_region(region).await?.unwrap_or_default();
        file.entries.retain(|e| &e.key != key);
        file.entries.push(StoredEntry {
            key: key.clone(),
            response: entry,
        });
        self.write_region(region, &file).await
    }

    async fn keys(&self, region: &str) -> StoreResult<Vec<IdentityKey>> {
        let _guard = self.lock.lock().await;
        Ok(self
            .read_region(region)
            .await?
            .map(|file| file.entries.into_iter().map(|e| e.key).collect())
            .unwrap_or_default())
    }

    async fn delete(&self, region: &str, key: &IdentityKey) -> StoreResult<bool> {
        let _guard = self.lock.lock().await;
        let Some(mut file) = self.read_region(region).await? else {
            return Ok(false);
        };
        let before = file.entries.len();
        file.entries.retain(|e| &e.key != key);
        if file.entries.len() == before {
            return Ok(false);
        }
        self.write_region(region, &file).await?;
        Ok(true)
    }

    async fn list_regions(&self) -> StoreResult<Vec<String>> {
        let _guard = self.lock.lock().await;
        let io_err = |source| StoreError::Io {
            region: self.root.display().to_string(),
            source,
        };

        let mut dir = match tokio::fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(io_err(source)),
        };

        let mut names = Vec::new();
        while let Some(entry) = dir.next_entry().await.map_err(io_err)? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(REGION_EXT) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    async fn delete_region(&self, region: &str) -> StoreResult<bool> {
        let _guard = self.lock.lock().await;
        let path = self.region_path(region)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(StoreError::Io {
                region: region.to_string(),
                source,
            }),
        }
    }
}
