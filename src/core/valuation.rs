//! Aggregates holdings into a USD total and fans it out to other currencies.

use crate::core::converter::{Conversions, CurrencyConverter};
use crate::core::error::{PortfolioError, Result};
use crate::core::holding::Holding;
use crate::core::market::{AssetClass, CANONICAL_CURRENCIES};
use futures::future::try_join_all;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::debug;

pub const BASE_CURRENCY: &str = "USD";

/// USD contribution of one holding and its share of the total.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingContribution {
    pub symbol: String,
    pub value_usd: f64,
    pub weight_pct: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioValuation {
    #[serde(rename = "totalUSD")]
    pub total_usd: f64,
    pub contributions: Vec<HoldingContribution>,
    pub conversions: Conversions,
}

#[derive(Debug, Clone)]
pub enum Valuation {
    Empty,
    Valued(PortfolioValuation),
}

pub struct ValuationEngine {
    converter: CurrencyConverter,
    targets: Vec<String>,
}

impl ValuationEngine {
    pub fn new(converter: CurrencyConverter) -> Self {
        Self {
            converter,
            targets: CANONICAL_CURRENCIES.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Values every holding in USD; any failed conversion aborts the total.
    pub async fn compute_total(&self, holdings: &[Holding]) -> Result<Valuation> {
        if holdings.is_empty() {
            debug!("Portfolio is empty, skipping valuation");
            return Ok(Valuation::Empty);
        }

        let rates = self.usd_rates(holdings).await?;
        let usd_values = holdings
            .iter()
            .map(|holding| usd_contribution(holding, &rates))
            .collect::<Result<Vec<f64>>>()?;
        let total_usd: f64 = usd_values.iter().sum();
        debug!(total_usd, holdings = holdings.len(), "Computed portfolio total");

        let contributions = holdings
            .iter()
            .zip(&usd_values)
            .map(|(holding, value_usd)| HoldingContribution {
                symbol: holding.symbol.clone(),
                value_usd: *value_usd,
                weight_pct: (total_usd > 0.0).then(|| value_usd / total_usd * 100.0),
            })
            .collect();

        let targets: Vec<&str> = self.targets.iter().map(String::as_str).collect();
        let conversions = self
            .converter
            .fan_out(total_usd, BASE_CURRENCY, &targets)
            .await;

        Ok(Valuation::Valued(PortfolioValuation {
            total_usd,
            contributions,
            conversions,
        }))
    }

    /// One USD rate per distinct holding currency, fetched concurrently.
    async fn usd_rates(&self, holdings: &[Holding]) -> Result<HashMap<String, f64>> {
        let currencies: HashSet<String> = holdings
            .iter()
            .filter(|holding| !matches!(holding.market.asset_class(), AssetClass::Metal))
            .map(|holding| holding.currency.to_uppercase())
            .collect();

        let rates = try_join_all(currencies.into_iter().map(|currency| async move {
            let rate = self.converter.rate(&currency, BASE_CURRENCY).await?;
            Ok::<_, PortfolioError>((currency, rate))
        }))
        .await?;
        Ok(rates.into_iter().collect())
    }
}

fn usd_contribution(holding: &Holding, rates: &HashMap<String, f64>) -> Result<f64> {
    match holding.market.asset_class() {
        // Metal values are priced off USD futures.
        AssetClass::Metal => Ok(holding.value),
        AssetClass::Cash | AssetClass::Security => rates
            .get(&holding.currency.to_uppercase())
            .map(|rate| holding.value * rate)
            .ok_or_else(|| {
                PortfolioError::upstream(format!(
                    "Currency conversion failed from {} to {BASE_CURRENCY}: no rate",
                    holding.currency
                ))
            }),
    }
}
