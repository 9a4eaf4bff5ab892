//! Converts amounts between currencies and fans a total out to many of them.

use crate::core::currency::CurrencyRateProvider;
use crate::core::error::{PortfolioError, Result};
use futures::future::join_all;
use indexmap::IndexMap;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Result of converting into a single target currency.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ConversionEntry {
    Amount(f64),
    Failed { error: String },
}

impl ConversionEntry {
    pub fn amount(&self) -> Option<f64> {
        match self {
            ConversionEntry::Amount(v) => Some(*v),
            ConversionEntry::Failed { .. } => None,
        }
    }
}

/// Conversions keyed by currency code, in the order they were requested.
pub type Conversions = IndexMap<String, ConversionEntry>;

#[derive(Clone)]
pub struct CurrencyConverter {
    rates: Arc<dyn CurrencyRateProvider>,
}

impl CurrencyConverter {
    pub fn new(rates: Arc<dyn CurrencyRateProvider>) -> Self {
        Self { rates }
    }

    pub async fn convert(&self, amount: f64, from: &str, to: &str) -> Result<f64> {
        if from.eq_ignore_ascii_case(to) {
            return Ok(amount);
        }

        debug!("Converting {amount} from {from} to {to}");
        Ok(amount * self.rate(from, to).await?)
    }

    /// Units of `to` per unit of `from`. Same-currency pairs are 1 without a
    /// lookup.
    pub async fn rate(&self, from: &str, to: &str) -> Result<f64> {
        if from.eq_ignore_ascii_case(to) {
            return Ok(1.0);
        }

        match self.rates.get_rate(from, to).await {
            Ok(rate) if rate.is_finite() && rate > 0.0 => Ok(rate),
            Ok(rate) => Err(PortfolioError::upstream(format!(
                "Currency conversion failed from {from} to {to}: invalid rate {rate}"
            ))),
            Err(e) => Err(PortfolioError::upstream(format!(
                "Currency conversion failed from {from} to {to}: {e}"
            ))),
        }
    }

    /// Converts `amount` into every target independently. A failed target
    /// is recorded in place and never affects the others.
    pub async fn fan_out(&self, amount: f64, from: &str, targets: &[&str]) -> Conversions {
        let conversions = targets.iter().map(|target| async move {
            let entry = match self.convert(amount, from, target).await {
                Ok(value) => ConversionEntry::Amount(value),
                Err(e) => {
                    debug!("Fan-out conversion to {target} failed: {e}");
                    ConversionEntry::Failed {
                        error: e.to_string(),
                    }
                }
            };
            (target.to_string(), entry)
        });

        join_all(conversions).await.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::market::CANONICAL_CURRENCIES;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockRates {
        rates: HashMap<String, f64>,
        failing: Vec<String>,
        calls: AtomicUsize,
    }

    impl MockRates {
        fn new(rates: &[(&str, &str, f64)]) -> Self {
            Self {
                rates: rates
                    .iter()
                    .map(|(from, to, rate)| (format!("{from}:{to}"), *rate))
                    .collect(),
                failing: Vec::new(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CurrencyRateProvider for MockRates {
        async fn get_rate(&self, from: &str, to: &str) -> Result<f64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.iter().any(|c| c == to) {
                return Err(PortfolioError::upstream(format!("unsupported pair {from}{to}")));
            }
            Ok(self.rates.get(&format!("{from}:{to}")).copied().unwrap_or(1.0))
        }
    }

    #[tokio::test]
    async fn test_identity_conversion_makes_no_calls() {
        let rates = Arc::new(MockRates::new(&[]));
        let converter = CurrencyConverter::new(rates.clone());

        for x in [0.0, 0.1 + 0.2, 1234567.891, f64::MAX, -42.5] {
            let converted = converter.convert(x, "USD", "USD").await.unwrap();
            assert_eq!(converted.to_bits(), x.to_bits());
        }
        assert_eq!(rates.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_convert_applies_rate() {
        let converter = CurrencyConverter::new(Arc::new(MockRates::new(&[("HKD", "USD", 0.128)])));

        let converted = converter.convert(1000.0, "HKD", "USD").await.unwrap();
        assert!((converted - 128.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_convert_failure_is_upstream() {
        let mut rates = MockRates::new(&[]);
        rates.failing.push("XYZ".to_string());
        let converter = CurrencyConverter::new(Arc::new(rates));

        let err = converter.convert(10.0, "USD", "XYZ").await.unwrap_err();
        assert!(matches!(err, PortfolioError::Upstream { .. }));
        assert!(err.to_string().contains("USD to XYZ"));
    }

    #[tokio::test]
    async fn test_fan_out_isolates_failed_currency() {
        let mut rates = MockRates::new(&[("USD", "JPY", 150.0)]);
        rates.failing.push("KRW".to_string());
        let rates = Arc::new(rates);
        let converter = CurrencyConverter::new(rates.clone());

        let conversions = converter
            .fan_out(100.0, "USD", &CANONICAL_CURRENCIES)
            .await;

        assert_eq!(conversions.len(), CANONICAL_CURRENCIES.len());
        let order: Vec<_> = conversions.keys().map(String::as_str).collect();
        assert_eq!(order, CANONICAL_CURRENCIES.to_vec());

        assert_eq!(conversions["USD"], ConversionEntry::Amount(100.0));
        assert_eq!(conversions["JPY"], ConversionEntry::Amount(15000.0));
        assert!(matches!(conversions["KRW"], ConversionEntry::Failed { .. }));
        assert!(
            conversions
                .iter()
                .filter(|(code, _)| code.as_str() != "KRW")
                .all(|(_, entry)| entry.amount().is_some())
        );
        // USD short-circuits, the other nine ask the provider.
        assert_eq!(rates.calls.load(Ordering::SeqCst), 9);
    }

    #[test]
    fn test_conversion_entry_serialization() {
        let amount = serde_json::to_string(&ConversionEntry::Amount(1.5)).unwrap();
        assert_eq!(amount, "1.5");
        let failed = serde_json::to_string(&ConversionEntry::Failed {
            error: "boom".to_string(),
        })
        .unwrap();
        assert_eq!(failed, r#"{"error":"boom"}"#);
    }
}
