//! Wires providers, storage and the core engines into the operations the
//! CLI exposes.

use crate::core::cache::Store;
use crate::core::config::AppConfig;
use crate::core::converter::{Conversions, CurrencyConverter};
use crate::core::currency::CurrencyRateProvider;
use crate::core::error::PortfolioError;
use crate::core::holding::Holding;
use crate::core::market::{AssetClass, Market};
use crate::core::price::{CryptoQuoteProvider, MetalQuote, Quote};
use crate::core::resolver::{PriceResolver, ProviderChain};
use crate::core::sort::{SortColumn, SortDirection, sort_order};
use crate::core::valuation::{
    BASE_CURRENCY, HoldingContribution, PortfolioValuation, Valuation, ValuationEngine,
};
use crate::providers::{
    binance::BinanceProvider, caching::CachingCurrencyRateProvider,
    coingecko::CoinGeckoProvider, cryptocompare::CryptoCompareProvider,
    exchange_rate_api::ExchangeRateApiProvider,
    yahoo_finance::{YahooCurrencyProvider, YahooFinanceProvider},
};
use crate::store::KeyValueStore;
use crate::store::portfolio::PortfolioRepository;
use anyhow::{Context, Result, bail};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

const RATE_COLLECTION: &str = "rates";
const EMPTY_MESSAGE: &str = "Portfolio is empty";

/// `price` result: a unit quote, or a weighed metal position.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum PriceReport {
    Quote(Quote),
    Metal(MetalQuote),
}

#[derive(Debug, Clone, Serialize)]
pub struct AddReport {
    pub success: bool,
    pub merged: bool,
    pub holding: Holding,
    pub portfolio: Vec<Holding>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BaseAmount {
    pub amount: f64,
    pub currency: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct TotalValue {
    pub base: BaseAmount,
    pub conversions: Conversions,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ValueReport {
    #[serde(rename_all = "camelCase")]
    Empty {
        message: &'static str,
        total_value: f64,
    },
    #[serde(rename_all = "camelCase")]
    Valued {
        holdings: Vec<Holding>,
        total_value: TotalValue,
        contributions: Vec<HoldingContribution>,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CalculateReport {
    Empty {
        message: &'static str,
        #[serde(rename = "totalUSD")]
        total_usd: f64,
        conversions: Conversions,
    },
    Valued(PortfolioValuation),
}

/// A holding with its position in the stored portfolio, which is what
/// `remove` takes regardless of display order.
#[derive(Debug, Clone, Serialize)]
pub struct ListedHolding {
    pub index: usize,
    #[serde(flatten)]
    pub holding: Holding,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListReport {
    pub holdings: Vec<ListedHolding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortColumn>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<SortDirection>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MutationReport {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removed: Option<Holding>,
}

pub struct App {
    resolver: PriceResolver,
    engine: ValuationEngine,
    repository: PortfolioRepository,
    // Owns the keyspace the repository's collections live in.
    _store: KeyValueStore,
}

impl App {
    /// Builds the application against the durable store under the configured
    /// data path.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let data_path = config.default_data_path()?;
        debug!("Using data path {}", data_path.display());
        Self::with_store(config, KeyValueStore::open(&data_path))
    }

    pub fn with_store(config: &AppConfig, store: KeyValueStore) -> Result<Self> {
        let timeout = config.request_timeout();
        let listed = Arc::new(
            YahooFinanceProvider::new(&config.providers.yahoo.base_url, timeout)
                .context("Failed to create Yahoo Finance provider")?,
        );
        let chain = ProviderChain::new(crypto_providers(config)?, timeout);
        info!(providers = ?chain.provider_names(), "Crypto fallback chain ready");

        let rates: Arc<dyn CurrencyRateProvider> = match &config.providers.exchange_rate {
            Some(exchange_rate) => Arc::new(ExchangeRateApiProvider::new(
                &exchange_rate.base_url,
                &exchange_rate.api_key,
                timeout,
            )?),
            None => Arc::new(YahooCurrencyProvider::new(
                &config.providers.yahoo.base_url,
                timeout,
            )?),
        };
        let cached_rates = Arc::new(CachingCurrencyRateProvider::new(
            rates,
            store.get_collection(RATE_COLLECTION, false)?,
            config.rate_cache_ttl(),
        ));

        Ok(Self {
            resolver: PriceResolver::new(listed, chain),
            engine: ValuationEngine::new(CurrencyConverter::new(cached_rates)),
            repository: PortfolioRepository::new(&store)?,
            _store: store,
        })
    }

    /// Quotes a symbol without touching the portfolio. Metals are priced for
    /// `weight_grams` when it is given.
    pub async fn price(
        &self,
        market: Market,
        symbol: &str,
        weight_grams: Option<f64>,
    ) -> Result<PriceReport, PortfolioError> {
        match (market, weight_grams) {
            (Market::Metal, Some(weight)) => self
                .resolver
                .resolve_metal(symbol, weight)
                .await
                .map(PriceReport::Metal),
            (Market::Cash, _) => Err(PortfolioError::validation(
                "Cash balances have no market price",
            )),
            _ => self.resolver.resolve(market, symbol).await.map(PriceReport::Quote),
        }
    }

    /// Prices and stores a position. `amount` is the unit count, the weight in
    /// grams for metals, or the balance for cash (`symbol` is the currency).
    pub async fn add(&self, market: Market, symbol: &str, amount: f64) -> Result<AddReport> {
        if !(amount.is_finite() && amount > 0.0) {
            return Err(PortfolioError::validation("Amount must be a positive number").into());
        }

        let holding = match market.asset_class() {
            AssetClass::Cash => Holding::cash(symbol, amount)?,
            AssetClass::Metal => {
                let quote = self.resolver.resolve_metal(symbol, amount).await?;
                Holding::from_metal_quote(&quote)?
            }
            AssetClass::Security => {
                let quote = self.resolver.resolve(market, symbol).await?;
                Holding::from_quote(market, &quote, amount)?
            }
        };

        let mut store = self.repository.load().await?;
        let outcome = store.add_or_merge(holding);
        self.repository.save(&store).await?;

        Ok(AddReport {
            success: true,
            merged: outcome.merged,
            holding: outcome.holding,
            portfolio: store.into_holdings(),
        })
    }

    pub async fn value(&self) -> Result<ValueReport> {
        let store = self.repository.load().await?;
        match self.engine.compute_total(store.holdings()).await? {
            Valuation::Empty => Ok(ValueReport::Empty {
                message: EMPTY_MESSAGE,
                total_value: 0.0,
            }),
            Valuation::Valued(valuation) => Ok(ValueReport::Valued {
                holdings: store.into_holdings(),
                total_value: TotalValue {
                    base: BaseAmount {
                        amount: valuation.total_usd,
                        currency: BASE_CURRENCY,
                    },
                    conversions: valuation.conversions,
                },
                contributions: valuation.contributions,
            }),
        }
    }

    /// Values an ad-hoc list of holdings; nothing is stored.
    pub async fn calculate(&self, holdings: &[Holding]) -> Result<CalculateReport, PortfolioError> {
        match self.engine.compute_total(holdings).await? {
            Valuation::Empty => Ok(CalculateReport::Empty {
                message: EMPTY_MESSAGE,
                total_usd: 0.0,
                conversions: Conversions::new(),
            }),
            Valuation::Valued(valuation) => Ok(CalculateReport::Valued(valuation)),
        }
    }

    /// Lists holdings in stored order, or ordered by `sort`. Sorting the same
    /// column on consecutive calls alternates the direction.
    pub async fn list(&self, sort: Option<SortColumn>) -> Result<ListReport> {
        let holdings = self.repository.load().await?.into_holdings();
        let Some(column) = sort else {
            return Ok(ListReport {
                holdings: holdings
                    .into_iter()
                    .enumerate()
                    .map(|(index, holding)| ListedHolding { index, holding })
                    .collect(),
                sort: None,
                direction: None,
            });
        };

        let mut state = self.repository.load_sort_state().await;
        let direction = state.select(column);
        self.repository.save_sort_state(&state).await?;
        debug!(%column, ?direction, "Sorting holdings");

        let listed = sort_order(&holdings, column, direction)
            .into_iter()
            .map(|index| ListedHolding {
                index,
                holding: holdings[index].clone(),
            })
            .collect();
        Ok(ListReport {
            holdings: listed,
            sort: Some(column),
            direction: Some(direction),
        })
    }

    pub async fn remove(&self, index: usize) -> Result<MutationReport> {
        let mut store = self.repository.load().await?;
        let removed = store.remove_at(index)?;
        self.repository.save(&store).await?;
        Ok(MutationReport {
            success: true,
            message: None,
            removed: Some(removed),
        })
    }

    pub async fn clear(&self) -> Result<MutationReport> {
        let mut store = self.repository.load().await?;
        store.clear();
        self.repository.save(&store).await?;
        Ok(MutationReport {
            success: true,
            message: Some("Portfolio cleared".to_string()),
            removed: None,
        })
    }
}

/// Crypto providers in configured order.
fn crypto_providers(config: &AppConfig) -> Result<Vec<Arc<dyn CryptoQuoteProvider>>> {
    let timeout = config.request_timeout();
    let providers = &config.providers;
    if config.crypto_providers.is_empty() {
        bail!("At least one crypto provider must be configured");
    }

    config
        .crypto_providers
        .iter()
        .map(|name| -> Result<Arc<dyn CryptoQuoteProvider>> {
            let provider: Arc<dyn CryptoQuoteProvider> = match name.trim().to_lowercase().as_str() {
                "binance" => Arc::new(BinanceProvider::new(&providers.binance.base_url, timeout)?),
                "cryptocompare" => Arc::new(CryptoCompareProvider::new(
                    &providers.cryptocompare.base_url,
                    timeout,
                )?),
                "coingecko" => {
                    Arc::new(CoinGeckoProvider::new(&providers.coingecko.base_url, timeout)?)
                }
                other => bail!(
                    "Unknown crypto provider '{other}', expected binance, cryptocompare or coingecko"
                ),
            };
            Ok(provider)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_crypto_provider_is_rejected() {
        let config = AppConfig {
            crypto_providers: vec!["binance".to_string(), "kraken".to_string()],
            ..AppConfig::default()
        };
        let err = App::with_store(&config, KeyValueStore::in_memory())
            .err()
            .expect("config should be rejected");
        assert!(err.to_string().contains("Unknown crypto provider 'kraken'"));
    }

    #[test]
    fn test_empty_crypto_provider_list_is_rejected() {
        let config = AppConfig {
            crypto_providers: Vec::new(),
            ..AppConfig::default()
        };
        assert!(App::with_store(&config, KeyValueStore::in_memory()).is_err());
    }

    #[tokio::test]
    async fn test_cash_add_and_remove_without_network() {
        let app = App::with_store(&AppConfig::default(), KeyValueStore::in_memory()).unwrap();

        let first = app.add(Market::Cash, "usd", 100.0).await.unwrap();
        assert!(!first.merged);
        let second = app.add(Market::Cash, "USD", 50.0).await.unwrap();
        assert!(second.merged);
        assert_eq!(second.holding.value, 150.0);
        assert_eq!(second.portfolio.len(), 1);

        let err = app.remove(3).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PortfolioError>(),
            Some(PortfolioError::IndexOutOfRange { index: 3, len: 1 })
        ));

        let removed = app.remove(0).await.unwrap();
        assert_eq!(removed.removed.map(|h| h.symbol), Some("USD".to_string()));
        assert!(app.list(None).await.unwrap().holdings.is_empty());
    }

    #[tokio::test]
    async fn test_non_positive_amount_fails_before_lookup() {
        let app = App::with_store(&AppConfig::default(), KeyValueStore::in_memory()).unwrap();
        let err = app.add(Market::Us, "AAPL", 0.0).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PortfolioError>(),
            Some(PortfolioError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_portfolio_reports_empty() {
        let app = App::with_store(&AppConfig::default(), KeyValueStore::in_memory()).unwrap();
        let report = app.value().await.unwrap();
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            serde_json::json!({"message": "Portfolio is empty", "totalValue": 0.0})
        );
    }

    #[tokio::test]
    async fn test_list_sort_toggles_between_calls() {
        let app = App::with_store(&AppConfig::default(), KeyValueStore::in_memory()).unwrap();
        app.add(Market::Cash, "EUR", 20.0).await.unwrap();
        app.add(Market::Cash, "USD", 10.0).await.unwrap();

        let ascending = app.list(Some(SortColumn::Symbol)).await.unwrap();
        assert_eq!(ascending.direction, Some(SortDirection::Ascending));
        let symbols: Vec<_> = ascending.holdings.iter().map(|h| h.holding.symbol.as_str()).collect();
        assert_eq!(symbols, ["EUR", "USD"]);

        let descending = app.list(Some(SortColumn::Symbol)).await.unwrap();
        assert_eq!(descending.direction, Some(SortDirection::Descending));
        let listed: Vec<_> = descending
            .holdings
            .iter()
            .map(|h| (h.index, h.holding.symbol.as_str()))
            .collect();
        assert_eq!(listed, [(1, "USD"), (0, "EUR")]);
    }

    #[tokio::test]
    async fn test_add_refuses_to_overwrite_damaged_holdings() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyValueStore::open(dir.path());
        store
            .insert_raw("portfolio", b"holdings", b"\x00garbage")
            .unwrap();
        let app = App::with_store(&AppConfig::default(), store).unwrap();

        let err = app.add(Market::Cash, "JPY", 5.0).await.unwrap_err();
        assert!(format!("{err:#}").contains("Failed to read saved holdings"));
        assert!(app.clear().await.is_err());

        // The damaged blob is still there rather than a one-holding portfolio.
        assert!(app.list(None).await.is_err());
    }
}
