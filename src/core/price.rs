//! Pricing abstractions and core types

use crate::core::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Raw quote as reported by an exchange data provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceResult {
    pub symbol: String,
    pub price: f64,
    pub currency: String,
    pub short_name: Option<String>,
}

/// Quote source for exchange-listed symbols (equities, ETFs, futures).
#[async_trait]
pub trait PriceProvider: Send + Sync {
    async fn fetch_price(&self, symbol: &str) -> Result<PriceResult>;
}

/// One independent source of USD prices for crypto assets.
#[async_trait]
pub trait CryptoQuoteProvider: Send + Sync {
    fn name(&self) -> &str;

    /// USD price for `symbol`; `coingecko_id` is passed for id-keyed APIs.
    async fn fetch_usd_price(&self, symbol: &str, coingecko_id: &str) -> Result<f64>;
}

/// Canonical, currency-tagged price for a resolved asset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quote {
    pub symbol: String,
    pub price: f64,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Priced metal position, `total_value` already in `currency`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetalQuote {
    pub symbol: String,
    pub metal_type: String,
    pub price_per_ounce: f64,
    pub weight_grams: f64,
    pub total_value: f64,
    pub currency: String,
}
