use crate::core::error::{PortfolioError, Result};
use crate::core::price::CryptoQuoteProvider;
use crate::providers::util::{get_checked, http_client};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

pub struct CryptoCompareProvider {
    base_url: String,
    client: Client,
}

impl CryptoCompareProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: http_client(timeout)?,
        })
    }
}

/// Either `{"USD": price}` or an error envelope with a `Message`.
#[derive(Debug, Deserialize)]
struct PriceResponse {
    #[serde(rename = "USD")]
    usd: Option<f64>,
    #[serde(rename = "Message")]
    message: Option<String>,
}

#[async_trait]
impl CryptoQuoteProvider for CryptoCompareProvider {
    fn name(&self) -> &str {
        "cryptocompare"
    }

    #[instrument(name = "CryptoComparePriceFetch", skip(self, _coingecko_id))]
    async fn fetch_usd_price(&self, symbol: &str, _coingecko_id: &str) -> Result<f64> {
        let url = format!("{}/data/price?fsym={symbol}&tsyms=USD", self.base_url);
        debug!("Requesting price from {}", url);

        let data: PriceResponse = get_checked(&self.client, &url, symbol)
            .await?
            .json()
            .await
            .map_err(|e| PortfolioError::from(e).with_subject(symbol))?;

        match (data.usd, data.message) {
            (Some(price), _) => Ok(price),
            (None, Some(message)) => Err(PortfolioError::upstream(message)),
            (None, None) => Err(PortfolioError::upstream(format!(
                "No USD price in response for {symbol}"
            ))),
        }
    }
}
