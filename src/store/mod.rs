pub mod disk;
pub mod memory;
pub mod portfolio;

use crate::core::cache::{KeyValueCollection, Store};
use anyhow::{Context, Result};
use disk::DiskCollection;
use fjall::{Keyspace, PartitionCreateOptions};
use memory::MemoryCollection;
use std::{
    collections::HashMap,
    path::Path,
    sync::{Arc, RwLock},
};
use tracing::{debug, warn};

/// A thread-safe key-value store that can hold multiple collections.
pub struct KeyValueStore {
    collections: RwLock<HashMap<String, Arc<dyn KeyValueCollection>>>,
    keyspace: Option<Keyspace>,
}

impl KeyValueStore {
    /// Opens a durable store under `path`, degrading to memory-only when the
    /// keyspace cannot be opened.
    pub fn open(path: &Path) -> Self {
        let keyspace = std::fs::create_dir_all(path)
            .context("Failed to create data directory")
            .and_then(|_| {
                fjall::Config::new(path.join("store"))
                    .open()
                    .context("Failed to open keyspace")
            });
        match keyspace {
            Ok(keyspace) => {
                debug!("Opened keyspace at {}", path.display());
                Self::with_keyspace(Some(keyspace))
            }
            Err(e) => {
                warn!("Falling back to in-memory store: {e:#}");
                Self::in_memory()
            }
        }
    }

    pub fn in_memory() -> Self {
        Self::with_keyspace(None)
    }

    fn with_keyspace(keyspace: Option<Keyspace>) -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            keyspace,
        }
    }

    pub fn is_persistent(&self) -> bool {
        self.keyspace.is_some()
    }

    /// Writes `value` straight into a disk partition, skipping the entry
    /// envelope collections wrap values in.
    #[cfg(test)]
    pub(crate) fn insert_raw(&self, collection: &str, key: &[u8], value: &[u8]) -> Result<()> {
        let keyspace = self
            .keyspace
            .as_ref()
            .context("Store has no keyspace")?;
        keyspace
            .open_partition(collection, PartitionCreateOptions::default())?
            .insert(key, value)?;
        Ok(())
    }
}

impl Store for KeyValueStore {
    fn get_collection(&self, name: &str, persist: bool) -> Result<Arc<dyn KeyValueCollection>> {
        if let Some(collection) = self
            .collections
            .read()
            .map_err(|_| anyhow::anyhow!("Store lock poisoned"))?
            .get(name)
        {
            return Ok(Arc::clone(collection));
        }

        let mut collections = self
            .collections
            .write()
            .map_err(|_| anyhow::anyhow!("Store lock poisoned"))?;
        if let Some(collection) = collections.get(name) {
            return Ok(Arc::clone(collection));
        }

        let collection: Arc<dyn KeyValueCollection> = match (&self.keyspace, persist) {
            (Some(keyspace), true) => {
                let partition = keyspace
                    .open_partition(name, PartitionCreateOptions::default())
                    .with_context(|| format!("Failed to open partition {name}"))?;
                Arc::new(DiskCollection::new(keyspace.clone(), partition))
            }
            _ => Arc::new(MemoryCollection::new()),
        };
        collections.insert(name.to_string(), Arc::clone(&collection));
        Ok(collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_collections_are_shared_by_name() {
        let store = KeyValueStore::in_memory();
        let a = store.get_collection("rates", false).unwrap();
        a.put(b"USDEUR", b"0.9", None).await.unwrap();

        let b = store.get_collection("rates", false).unwrap();
        assert_eq!(b.get(b"USDEUR").await.unwrap(), Some(b"0.9".to_vec()));

        let other = store.get_collection("portfolio", false).unwrap();
        assert!(other.get(b"USDEUR").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_disk_store_persists_requested_collections() {
        let dir = tempdir().unwrap();
        let store = KeyValueStore::open(dir.path());
        assert!(store.is_persistent());

        let collection = store.get_collection("portfolio", true).unwrap();
        collection.put(b"holdings", b"[]", None).await.unwrap();
        assert_eq!(collection.get(b"holdings").await.unwrap(), Some(b"[]".to_vec()));
    }
}
