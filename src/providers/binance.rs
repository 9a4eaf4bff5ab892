use crate::core::error::{PortfolioError, Result};
use crate::core::price::CryptoQuoteProvider;
use crate::providers::util::{get_checked, http_client};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

/// Binance spot ticker, priced against USDT.
pub struct BinanceProvider {
    base_url: String,
    client: Client,
}

impl BinanceProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: http_client(timeout)?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct TickerPrice {
    price: String,
}

#[async_trait]
impl CryptoQuoteProvider for BinanceProvider {
    fn name(&self) -> &str {
        "binance"
    }

    #[instrument(name = "BinancePriceFetch", skip(self, _coingecko_id))]
    async fn fetch_usd_price(&self, symbol: &str, _coingecko_id: &str) -> Result<f64> {
        let pair = format!("{symbol}USDT");
        let url = format!("{}/api/v3/ticker/price?symbol={pair}", self.base_url);
        debug!("Requesting ticker from {}", url);

        let ticker: TickerPrice = get_checked(&self.client, &url, &pair)
            .await?
            .json()
            .await
            .map_err(|e| PortfolioError::from(e).with_subject(&pair))?;

        ticker
            .price
            .parse::<f64>()
            .map_err(|e| PortfolioError::upstream(format!("Invalid price {:?} for {pair}: {e}", ticker.price)))
    }
}
