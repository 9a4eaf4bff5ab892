use crate::core::error::{PortfolioError, Result};
use crate::core::price::CryptoQuoteProvider;
use crate::providers::util::{get_checked, http_client};
use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument};

/// CoinGecko simple price API, keyed by coin id rather than ticker.
pub struct CoinGeckoProvider {
    base_url: String,
    client: Client,
}

impl CoinGeckoProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: http_client(timeout)?,
        })
    }
}

#[async_trait]
impl CryptoQuoteProvider for CoinGeckoProvider {
    fn name(&self) -> &str {
        "coingecko"
    }

    #[instrument(name = "CoinGeckoPriceFetch", skip(self))]
    async fn fetch_usd_price(&self, symbol: &str, coingecko_id: &str) -> Result<f64> {
        let url = format!(
            "{}/api/v3/simple/price?ids={coingecko_id}&vs_currencies=usd",
            self.base_url
        );
        debug!("Requesting price from {}", url);

        let data: HashMap<String, HashMap<String, f64>> =
            get_checked(&self.client, &url, coingecko_id)
                .await?
                .json()
                .await
                .map_err(|e| PortfolioError::from(e).with_subject(coingecko_id))?;

        data.get(coingecko_id)
            .and_then(|prices| prices.get("usd"))
            .copied()
            .ok_or_else(|| PortfolioError::upstream(format!("No USD price for {symbol} ({coingecko_id})")))
    }
}
