//! Key-value storage abstractions

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// A named bucket of opaque byte values.
#[async_trait]
pub trait KeyValueCollection: Send + Sync {
    /// `Ok(None)` for a missing or expired key; an unreadable entry is an error.
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;
    async fn put(&self, key: &[u8], value: &[u8], ttl: Option<Duration>) -> Result<()>;
    async fn remove(&self, key: &[u8]) -> Result<()>;
    async fn clear(&self) -> Result<()>;
}

pub trait Store: Send + Sync {
    /// Opens (creating when needed) the collection called `name`. `persist`
    /// selects durable storage when the store has it.
    fn get_collection(&self, name: &str, persist: bool) -> Result<Arc<dyn KeyValueCollection>>;
}
