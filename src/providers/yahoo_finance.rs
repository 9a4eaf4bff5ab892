use crate::core::currency::CurrencyRateProvider;
use crate::core::error::{PortfolioError, Result};
use crate::core::price::{PriceProvider, PriceResult};
use crate::providers::util::{get_checked, http_client};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

// YahooFinanceProvider implementation for PriceProvider
pub struct YahooFinanceProvider {
    base_url: String,
    client: Client,
}

impl YahooFinanceProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(YahooFinanceProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: http_client(timeout)?,
        })
    }
}

#[derive(Deserialize, Debug)]
struct YahooChartResponse {
    chart: ChartResult,
}

#[derive(Deserialize, Debug)]
struct ChartResult {
    result: Option<Vec<ChartItem>>,
}

#[derive(Deserialize, Debug)]
struct ChartItem {
    meta: ChartMeta,
}

#[derive(Deserialize, Debug)]
struct ChartMeta {
    #[serde(alias = "regularMarketPrice")]
    regular_market_price: Option<f64>,
    currency: Option<String>,
    symbol: Option<String>,
    #[serde(alias = "shortName")]
    short_name: Option<String>,
}

/// Chart endpoint for `symbol`, which is escaped as a single path segment.
fn chart_url(base_url: &str, symbol: &str) -> Result<Url> {
    let invalid = || PortfolioError::upstream(format!("Invalid Yahoo Finance base URL: {base_url}"));
    let mut url = Url::parse(base_url).map_err(|_| invalid())?;
    url.path_segments_mut()
        .map_err(|_| invalid())?
        .pop_if_empty()
        .extend(["v8", "finance", "chart", symbol]);
    url.query_pairs_mut()
        .append_pair("interval", "1d")
        .append_pair("range", "1d");
    Ok(url)
}

async fn fetch_chart_meta(client: &Client, base_url: &str, symbol: &str) -> Result<Option<ChartMeta>> {
    let url = chart_url(base_url, symbol)?;
    debug!("Requesting chart data from {}", url);

    let response = get_checked(client, url.as_str(), symbol).await?;
    let text = response
        .text()
        .await
        .map_err(|e| PortfolioError::from(e).with_subject(symbol))?;
    let data: YahooChartResponse = serde_json::from_str(&text).map_err(|e| {
        PortfolioError::upstream(format!("Failed to parse JSON response for {symbol}: {e}"))
    })?;

    Ok(data
        .chart
        .result
        .and_then(|items| items.into_iter().next())
        .map(|item| item.meta))
}

#[async_trait]
impl PriceProvider for YahooFinanceProvider {
    #[instrument(
        name = "YahooPriceFetch",
        skip(self),
        fields(symbol = %symbol)
    )]
    async fn fetch_price(&self, symbol: &str) -> Result<PriceResult> {
        let meta = fetch_chart_meta(&self.client, &self.base_url, symbol)
            .await?
            .ok_or_else(|| PortfolioError::NotFound(format!("No price data found for symbol: {symbol}")))?;

        let price = meta
            .regular_market_price
            .filter(|p| p.is_finite() && *p > 0.0)
            .ok_or_else(|| PortfolioError::NotFound(format!("No price data found for symbol: {symbol}")))?;

        Ok(PriceResult {
            symbol: meta.symbol.unwrap_or_else(|| symbol.to_string()),
            price,
            currency: meta.currency.unwrap_or_else(|| "USD".to_string()),
            short_name: meta.short_name,
        })
    }
}

// YahooCurrencyProvider implementation for CurrencyRateProvider
pub struct YahooCurrencyProvider {
    base_url: String,
    client: Client,
}

impl YahooCurrencyProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(YahooCurrencyProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: http_client(timeout)?,
        })
    }
}

#[async_trait]
impl CurrencyRateProvider for YahooCurrencyProvider {
    async fn get_rate(&self, from: &str, to: &str) -> Result<f64> {
        let symbol = format!("{from}{to}=X");
        let meta = match fetch_chart_meta(&self.client, &self.base_url, &symbol).await {
            Ok(meta) => meta,
            // An unknown pair is still an upstream failure for conversions.
            Err(PortfolioError::NotFound(_)) => None,
            Err(e) => return Err(e),
        };

        meta.and_then(|m| m.regular_market_price)
            .ok_or_else(|| {
                PortfolioError::upstream(format!("No rate data found for currency pair: {symbol}"))
            })
    }
}
