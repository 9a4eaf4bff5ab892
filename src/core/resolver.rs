//! Resolves a market-specific symbol into a canonical quote.

use crate::core::error::{PortfolioError, ProviderFailure, Result};
use crate::core::market::{CryptoAsset, GRAMS_PER_TROY_OUNCE, Market, MetalCode};
use crate::core::price::{CryptoQuoteProvider, MetalQuote, PriceProvider, Quote};
use crate::core::symbol::{QualifiedSymbol, normalize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Winning price plus the attempts that failed before it.
#[derive(Debug, Clone)]
pub struct ChainOutcome {
    pub provider: String,
    pub price: f64,
    pub failures: Vec<ProviderFailure>,
}

/// Ordered crypto providers, tried one after another until one yields a
/// strictly positive price.
pub struct ProviderChain {
    providers: Vec<Arc<dyn CryptoQuoteProvider>>,
    attempt_timeout: Duration,
}

impl ProviderChain {
    pub fn new(providers: Vec<Arc<dyn CryptoQuoteProvider>>, attempt_timeout: Duration) -> Self {
        Self {
            providers,
            attempt_timeout,
        }
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub async fn fetch(&self, asset: &CryptoAsset) -> Result<ChainOutcome> {
        let mut failures = Vec::with_capacity(self.providers.len());

        for provider in &self.providers {
            debug!(provider = provider.name(), asset = asset.symbol, "Trying crypto provider");
            let attempt = tokio::time::timeout(
                self.attempt_timeout,
                provider.fetch_usd_price(asset.symbol, asset.coingecko_id),
            )
            .await;

            let reason = match attempt {
                Ok(Ok(price)) if price.is_finite() && price > 0.0 => {
                    info!(provider = provider.name(), asset = asset.symbol, price, "Got crypto price");
                    return Ok(ChainOutcome {
                        provider: provider.name().to_string(),
                        price,
                        failures,
                    });
                }
                Ok(Ok(price)) => format!("no price data (got {price})"),
                Ok(Err(e)) => e.to_string(),
                Err(_) => format!("timed out after {}ms", self.attempt_timeout.as_millis()),
            };
            warn!(provider = provider.name(), asset = asset.symbol, %reason, "Crypto provider failed");
            failures.push(ProviderFailure::new(provider.name(), reason));
        }

        Err(PortfolioError::Upstream {
            message: format!(
                "Failed to fetch crypto price for {} from all providers",
                asset.symbol
            ),
            attempts: failures,
        })
    }
}

pub struct PriceResolver {
    listed: Arc<dyn PriceProvider>,
    crypto: ProviderChain,
}

impl PriceResolver {
    pub fn new(listed: Arc<dyn PriceProvider>, crypto: ProviderChain) -> Self {
        Self { listed, crypto }
    }

    pub async fn resolve(&self, market: Market, raw_symbol: &str) -> Result<Quote> {
        match normalize(market, raw_symbol)? {
            QualifiedSymbol::Listed {
                display,
                provider_symbol,
                alternate,
                currency,
            } => {
                let result = match self.listed.fetch_price(&provider_symbol).await {
                    Err(PortfolioError::NotFound(reason)) => match alternate {
                        Some(alternate) => {
                            debug!(%provider_symbol, %alternate, "No quote, retrying alternate listing");
                            self.listed.fetch_price(&alternate).await?
                        }
                        None => return Err(PortfolioError::NotFound(reason)),
                    },
                    other => other?,
                };

                // US tickers keep whatever the provider reports; other markets
                // are pinned to their exchange currency.
                let (symbol, currency) = match market {
                    Market::Us => (result.symbol, result.currency),
                    _ => (
                        display,
                        currency.map_or(result.currency, str::to_string),
                    ),
                };
                Ok(Quote {
                    symbol,
                    price: result.price,
                    currency,
                    name: result.short_name,
                    source: None,
                })
            }
            QualifiedSymbol::Crypto(asset) => {
                let outcome = self.crypto.fetch(&asset).await?;
                Ok(Quote {
                    symbol: asset.symbol.to_string(),
                    price: outcome.price,
                    currency: "USD".to_string(),
                    name: None,
                    source: Some(outcome.provider),
                })
            }
            QualifiedSymbol::Metal(metal) => {
                let result = self.listed.fetch_price(metal.futures_code()).await?;
                Ok(Quote {
                    symbol: metal.name().to_string(),
                    price: result.price,
                    currency: "USD".to_string(),
                    name: result.short_name,
                    source: None,
                })
            }
        }
    }

    /// Prices `weight_grams` of a metal off its per-ounce futures quote.
    pub async fn resolve_metal(&self, raw_symbol: &str, weight_grams: f64) -> Result<MetalQuote> {
        if !(weight_grams.is_finite() && weight_grams > 0.0) {
            return Err(PortfolioError::validation(
                "Weight in grams must be a positive number",
            ));
        }
        let metal: MetalCode = raw_symbol.parse()?;
        let quote = self.resolve(Market::Metal, raw_symbol).await?;
        Ok(MetalQuote {
            symbol: quote.symbol,
            metal_type: metal.futures_code().to_string(),
            price_per_ounce: quote.price,
            weight_grams,
            total_value: (weight_grams / GRAMS_PER_TROY_OUNCE) * quote.price,
            currency: quote.currency,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::price::PriceResult;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockListedProvider {
        prices: HashMap<String, PriceResult>,
        requested: Mutex<Vec<String>>,
    }

    impl MockListedProvider {
        fn new(entries: &[(&str, f64, &str)]) -> Self {
            let prices = entries
                .iter()
                .map(|(symbol, price, currency)| {
                    (
                        symbol.to_string(),
                        PriceResult {
                            symbol: symbol.to_string(),
                            price: *price,
                            currency: currency.to_string(),
                            short_name: None,
                        },
                    )
                })
                .collect();
            Self {
                prices,
                requested: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PriceProvider for MockListedProvider {
        async fn fetch_price(&self, symbol: &str) -> Result<PriceResult> {
            self.requested.lock().unwrap().push(symbol.to_string());
            self.prices
                .get(symbol)
                .cloned()
                .ok_or_else(|| PortfolioError::NotFound(format!("No data found for {symbol}")))
        }
    }

    enum Behaviour {
        Price(f64),
        Fail(&'static str),
        Hang,
    }

    struct MockCryptoProvider {
        name: &'static str,
        behaviour: Behaviour,
        calls: AtomicUsize,
    }

    impl MockCryptoProvider {
        fn new(name: &'static str, behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self {
                name,
                behaviour,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl CryptoQuoteProvider for MockCryptoProvider {
        fn name(&self) -> &str {
            self.name
        }

        async fn fetch_usd_price(&self, _symbol: &str, _coingecko_id: &str) -> Result<f64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behaviour {
                Behaviour::Price(p) => Ok(p),
                Behaviour::Fail(reason) => Err(PortfolioError::upstream(reason)),
                Behaviour::Hang => {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(1.0)
                }
            }
        }
    }

    fn resolver_with(
        listed: MockListedProvider,
        crypto: Vec<Arc<dyn CryptoQuoteProvider>>,
    ) -> PriceResolver {
        PriceResolver::new(
            Arc::new(listed),
            ProviderChain::new(crypto, Duration::from_millis(50)),
        )
    }

    #[tokio::test]
    async fn test_resolve_hk_pins_currency_and_keeps_user_symbol() {
        let resolver = resolver_with(MockListedProvider::new(&[("0700.HK", 320.5, "HKD")]), vec![]);

        let quote = resolver.resolve(Market::Hk, "700").await.unwrap();
        assert_eq!(quote.symbol, "700");
        assert_eq!(quote.price, 320.5);
        assert_eq!(quote.currency, "HKD");
    }

    #[tokio::test]
    async fn test_resolve_us_uses_provider_currency() {
        let resolver = resolver_with(MockListedProvider::new(&[("AAPL", 150.0, "USD")]), vec![]);

        let quote = resolver.resolve(Market::Us, "aapl").await.unwrap();
        assert_eq!(quote.symbol, "AAPL");
        assert_eq!(quote.currency, "USD");
        assert_eq!(quote.source, None);
    }

    #[tokio::test]
    async fn test_tw_falls_back_to_otc_listing() {
        let listed = MockListedProvider::new(&[("6488A.TWO", 88.0, "TWD")]);
        let resolver = resolver_with(listed, vec![]);

        let quote = resolver.resolve(Market::Tw, "6488A").await.unwrap();
        assert_eq!(quote.price, 88.0);
        assert_eq!(quote.currency, "TWD");
    }

    #[tokio::test]
    async fn test_tw_numeric_symbol_does_not_retry() {
        let listed = Arc::new(MockListedProvider::new(&[]));
        let resolver = PriceResolver::new(
            listed.clone(),
            ProviderChain::new(vec![], Duration::from_millis(50)),
        );

        let err = resolver.resolve(Market::Tw, "2330").await.unwrap_err();
        assert!(matches!(err, PortfolioError::NotFound(_)));
        assert_eq!(*listed.requested.lock().unwrap(), vec!["2330.TW".to_string()]);
    }

    #[tokio::test]
    async fn test_unsupported_crypto_never_reaches_providers() {
        let provider = MockCryptoProvider::new("first", Behaviour::Price(1.0));
        let resolver = resolver_with(MockListedProvider::new(&[]), vec![provider.clone()]);

        let err = resolver.resolve(Market::Crypto, "NOPE").await.unwrap_err();
        assert!(matches!(err, PortfolioError::UnsupportedAsset(_)));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_crypto_fallback_after_timeout() {
        let first = MockCryptoProvider::new("first", Behaviour::Hang);
        let second = MockCryptoProvider::new("second", Behaviour::Price(65000.0));
        let third = MockCryptoProvider::new("third", Behaviour::Price(1.0));
        let chain = ProviderChain::new(
            vec![first.clone(), second.clone(), third.clone()],
            Duration::from_millis(50),
        );

        let outcome = chain.fetch(&CryptoAsset::lookup("BTC").unwrap()).await.unwrap();
        assert_eq!(outcome.price, 65000.0);
        assert_eq!(outcome.provider, "second");
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].provider, "first");
        assert!(outcome.failures[0].reason.contains("timed out"));
        assert_eq!(third.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_crypto_zero_price_is_a_failure() {
        let resolver = resolver_with(
            MockListedProvider::new(&[]),
            vec![
                MockCryptoProvider::new("zero", Behaviour::Price(0.0)),
                MockCryptoProvider::new("good", Behaviour::Price(3200.0)),
            ],
        );

        let quote = resolver.resolve(Market::Crypto, "eth").await.unwrap();
        assert_eq!(quote.symbol, "ETH");
        assert_eq!(quote.price, 3200.0);
        assert_eq!(quote.currency, "USD");
        assert_eq!(quote.source.as_deref(), Some("good"));
    }

    #[tokio::test]
    async fn test_crypto_exhaustion_reports_every_attempt_in_order() {
        let resolver = resolver_with(
            MockListedProvider::new(&[]),
            vec![
                MockCryptoProvider::new("binance", Behaviour::Fail("HTTP 451")),
                MockCryptoProvider::new("cryptocompare", Behaviour::Price(0.0)),
                MockCryptoProvider::new("coingecko", Behaviour::Hang),
            ],
        );

        match resolver.resolve(Market::Crypto, "SOL").await {
            Err(PortfolioError::Upstream { message, attempts }) => {
                assert!(message.contains("SOL"));
                let names: Vec<_> = attempts.iter().map(|a| a.provider.as_str()).collect();
                assert_eq!(names, vec!["binance", "cryptocompare", "coingecko"]);
                assert_eq!(attempts[0].reason, "HTTP 451");
                assert!(attempts[1].reason.contains("no price data"));
                assert!(attempts[2].reason.contains("timed out"));
            }
            other => panic!("Expected upstream failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_resolve_metal_computes_total_from_grams() {
        let resolver = resolver_with(MockListedProvider::new(&[("GC=F", 2000.0, "USD")]), vec![]);

        let quote = resolver.resolve_metal("gold", 31.1035).await.unwrap();
        assert_eq!(quote.symbol, "Gold");
        assert_eq!(quote.metal_type, "GC=F");
        assert_eq!(quote.price_per_ounce, 2000.0);
        assert!((quote.total_value - 2000.0).abs() < 1e-9);
        assert_eq!(quote.currency, "USD");

        assert!(matches!(
            resolver.resolve_metal("gold", 0.0).await,
            Err(PortfolioError::Validation(_))
        ));
    }
}
