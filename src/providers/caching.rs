use crate::core::cache::KeyValueCollection;
use crate::core::currency::CurrencyRateProvider;
use crate::core::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Remembers successful rates for `ttl`. Failures are never cached so the
/// next conversion retries upstream.
pub struct CachingCurrencyRateProvider {
    inner: Arc<dyn CurrencyRateProvider>,
    cache: Arc<dyn KeyValueCollection>,
    ttl: Duration,
}

impl CachingCurrencyRateProvider {
    pub fn new(
        inner: Arc<dyn CurrencyRateProvider>,
        cache: Arc<dyn KeyValueCollection>,
        ttl: Duration,
    ) -> Self {
        Self { inner, cache, ttl }
    }

    fn cache_key(from: &str, to: &str) -> String {
        format!("rate:{}:{}", from.to_uppercase(), to.to_uppercase())
    }
}

#[async_trait]
impl CurrencyRateProvider for CachingCurrencyRateProvider {
    async fn get_rate(&self, from: &str, to: &str) -> Result<f64> {
        let key = Self::cache_key(from, to);
        match self.cache.get(key.as_bytes()).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<f64>(&bytes) {
                Ok(rate) => {
                    debug!("Cache hit for currency rate: {}", key);
                    return Ok(rate);
                }
                Err(e) => warn!("Discarding unreadable cached rate {}: {}", key, e),
            },
            Ok(None) => {}
            Err(e) => warn!("Failed to read cached rate {}: {:#}", key, e),
        }

        debug!("Cache miss for currency rate: {}", key);
        let rate = self.inner.get_rate(from, to).await?;
        match serde_json::to_vec(&rate) {
            Ok(bytes) => {
                if let Err(e) = self.cache.put(key.as_bytes(), &bytes, Some(self.ttl)).await {
                    warn!("Failed to cache rate {}: {}", key, e);
                }
            }
            Err(e) => warn!("Failed to encode rate {}: {}", key, e),
        }
        Ok(rate)
    }
}
