use crate::core::cache::KeyValueCollection;
use anyhow::{Context, Result};
use async_trait::async_trait;
use fjall::{Keyspace, PartitionHandle, PersistMode};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};
use tracing::debug;

#[derive(Serialize, Deserialize)]
struct DiskEntry {
    value: Vec<u8>,
    expires_at: Option<SystemTime>,
}

/// Collection backed by a fjall partition; writes are synced before returning.
pub struct DiskCollection {
    keyspace: Keyspace,
    partition: PartitionHandle,
}

impl DiskCollection {
    pub fn new(keyspace: Keyspace, partition: PartitionHandle) -> Self {
        Self {
            keyspace,
            partition,
        }
    }

    fn read(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let Some(raw) = self.partition.get(key)? else {
            return Ok(None);
        };
        let entry: DiskEntry =
            serde_json::from_slice(&raw).context("Stored entry is not a valid envelope")?;
        if entry
            .expires_at
            .is_some_and(|expires_at| SystemTime::now() > expires_at)
        {
            debug!("Disk entry expired for key: {}", String::from_utf8_lossy(key));
            self.partition.remove(key)?;
            return Ok(None);
        }
        Ok(Some(entry.value))
    }
}

#[async_trait]
impl KeyValueCollection for DiskCollection {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.read(key)
            .with_context(|| format!("Failed to read key {}", String::from_utf8_lossy(key)))
    }

    async fn put(&self, key: &[u8], value: &[u8], ttl: Option<Duration>) -> Result<()> {
        let entry = DiskEntry {
            value: value.to_vec(),
            expires_at: ttl.map(|d| SystemTime::now() + d),
        };
        self.partition.insert(key, serde_json::to_vec(&entry)?)?;
        self.keyspace.persist(PersistMode::SyncAll)?;
        debug!("Disk PUT for key: {}", String::from_utf8_lossy(key));
        Ok(())
    }

    async fn remove(&self, key: &[u8]) -> Result<()> {
        self.partition.remove(key)?;
        self.keyspace.persist(PersistMode::SyncAll)?;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let keys = self
            .partition
            .keys()
            .collect::<std::result::Result<Vec<_>, _>>()?;
        for key in keys {
            self.partition.remove(key)?;
        }
        self.keyspace.persist(PersistMode::SyncAll)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fjall::PartitionCreateOptions;
    use tempfile::tempdir;

    fn open(path: &std::path::Path) -> DiskCollection {
        let keyspace = fjall::Config::new(path).open().unwrap();
        let partition = keyspace
            .open_partition("test", PartitionCreateOptions::default())
            .unwrap();
        DiskCollection::new(keyspace, partition)
    }

    #[tokio::test]
    async fn test_disk_get_put_remove() {
        let dir = tempdir().unwrap();
        let collection = open(dir.path());

        assert!(collection.get(b"key1").await.unwrap().is_none());
        collection.put(b"key1", b"[1,2]", None).await.unwrap();
        assert_eq!(collection.get(b"key1").await.unwrap(), Some(b"[1,2]".to_vec()));

        collection.remove(b"key1").await.unwrap();
        assert!(collection.get(b"key1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_disk_ttl_expiration() {
        let dir = tempdir().unwrap();
        let collection = open(dir.path());

        collection
            .put(b"key1", b"1", Some(Duration::from_millis(10)))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(collection.get(b"key1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_disk_clear() {
        let dir = tempdir().unwrap();
        let collection = open(dir.path());
        collection.put(b"key1", b"1", None).await.unwrap();
        collection.put(b"key2", b"2", None).await.unwrap();

        collection.clear().await.unwrap();

        assert!(collection.get(b"key1").await.unwrap().is_none());
        assert!(collection.get(b"key2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_disk_get_reports_damaged_entries() {
        let dir = tempdir().unwrap();
        let collection = open(dir.path());
        collection
            .partition
            .insert(b"holdings", b"\x00garbage")
            .unwrap();

        let err = collection.get(b"holdings").await.unwrap_err();
        assert!(format!("{err:#}").contains("holdings"));
        // The damaged entry is left in place.
        assert!(collection.partition.get(b"holdings").unwrap().is_some());
    }
}
