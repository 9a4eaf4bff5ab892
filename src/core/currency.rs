//! Currency conversion abstractions

use crate::core::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait CurrencyRateProvider: Send + Sync {
    /// Units of `to` bought by one unit of `from`.
    async fn get_rate(&self, from: &str, to: &str) -> Result<f64>;
}
