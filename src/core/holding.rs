//! Holding records and their per-asset-class arithmetic.

use crate::core::error::PortfolioError;
use crate::core::market::{AssetClass, GRAMS_PER_TROY_OUNCE, Market, MetalCode};
use crate::core::price::{MetalQuote, Quote};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a holding is made of; each variant carries its own size measure.
#[derive(Debug, Clone, PartialEq)]
pub enum Position {
    /// Shares or coins.
    Units { quantity: f64 },
    Metal {
        metal: Option<MetalCode>,
        weight_grams: f64,
    },
    Cash,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "HoldingRecord", into = "HoldingRecord")]
pub struct Holding {
    pub symbol: String,
    pub market: Market,
    pub position: Position,
    /// Unit price in `currency`; per troy ounce for metals, the balance for cash.
    pub price: f64,
    pub currency: String,
    pub value: f64,
    pub added_at: DateTime<Utc>,
}

/// Identity used to merge an incoming holding into an existing one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HoldingKey {
    symbol: String,
    market: Market,
    metal: Option<MetalCode>,
}

impl Holding {
    /// Security or crypto position priced by `quote`.
    pub fn from_quote(market: Market, quote: &Quote, quantity: f64) -> Result<Self, PortfolioError> {
        if matches!(market.asset_class(), AssetClass::Metal | AssetClass::Cash) {
            return Err(PortfolioError::validation(format!(
                "{market} holdings cannot be built from a unit quote"
            )));
        }
        require_positive(quantity, "Quantity")?;
        Ok(Self {
            symbol: quote.symbol.clone(),
            market,
            position: Position::Units { quantity },
            price: quote.price,
            currency: quote.currency.clone(),
            value: quantity * quote.price,
            added_at: Utc::now(),
        })
    }

    pub fn from_metal_quote(quote: &MetalQuote) -> Result<Self, PortfolioError> {
        require_positive(quote.weight_grams, "Weight in grams")?;
        let metal: MetalCode = quote.metal_type.parse()?;
        Ok(Self {
            symbol: quote.symbol.clone(),
            market: Market::Metal,
            position: Position::Metal {
                metal: Some(metal),
                weight_grams: quote.weight_grams,
            },
            price: quote.price_per_ounce,
            currency: quote.currency.clone(),
            value: metal_value(quote.weight_grams, quote.price_per_ounce),
            added_at: Utc::now(),
        })
    }

    pub fn cash(currency: &str, amount: f64) -> Result<Self, PortfolioError> {
        let currency = currency.trim().to_uppercase();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(PortfolioError::validation(format!(
                "Invalid currency code: {currency}"
            )));
        }
        require_positive(amount, "Amount")?;
        Ok(Self {
            symbol: currency.clone(),
            market: Market::Cash,
            position: Position::Cash,
            price: amount,
            currency,
            value: amount,
            added_at: Utc::now(),
        })
    }

    pub fn key(&self) -> HoldingKey {
        let metal = match &self.position {
            Position::Metal { metal, .. } => *metal,
            _ => None,
        };
        HoldingKey {
            symbol: self.symbol.clone(),
            market: self.market,
            metal,
        }
    }

    /// Share count, coin amount, grams for metal, 1 for cash.
    pub fn quantity(&self) -> f64 {
        match self.position {
            Position::Units { quantity } => quantity,
            Position::Metal { weight_grams, .. } => weight_grams,
            Position::Cash => 1.0,
        }
    }

    pub fn weight_grams(&self) -> Option<f64> {
        match self.position {
            Position::Metal { weight_grams, .. } => Some(weight_grams),
            _ => None,
        }
    }

    /// Folds `incoming` into `self` according to the asset class rule.
    /// Both holdings must share the same key.
    pub(crate) fn absorb(&mut self, incoming: &Holding, at: DateTime<Utc>) {
        match (&mut self.position, &incoming.position) {
            (Position::Cash, _) => {
                self.value += incoming.value;
                self.price = self.value;
            }
            (
                Position::Metal { weight_grams, .. },
                Position::Metal {
                    weight_grams: added,
                    ..
                },
            ) => {
                *weight_grams += added;
                self.price = incoming.price;
                self.value = metal_value(*weight_grams, self.price);
            }
            (Position::Units { quantity }, _) => {
                *quantity += incoming.quantity();
                // Latest quote wins; no cost basis is tracked.
                self.price = incoming.price;
                self.value = *quantity * self.price;
            }
            (Position::Metal { .. }, _) => {
                self.price = incoming.price;
            }
        }
        self.added_at = at;
    }
}

pub fn metal_value(weight_grams: f64, price_per_ounce: f64) -> f64 {
    (weight_grams / GRAMS_PER_TROY_OUNCE) * price_per_ounce
}

fn require_positive(v: f64, what: &str) -> Result<(), PortfolioError> {
    if v.is_finite() && v > 0.0 {
        Ok(())
    } else {
        Err(PortfolioError::validation(format!(
            "{what} must be a positive number"
        )))
    }
}

/// Flat wire/storage shape. Optional fields may be absent in stored data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HoldingRecord {
    symbol: String,
    market: Market,
    #[serde(default)]
    quantity: Option<f64>,
    #[serde(default)]
    price: f64,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metal_type: Option<MetalCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    weight_grams: Option<f64>,
    #[serde(default)]
    added_at: Option<DateTime<Utc>>,
}

impl From<HoldingRecord> for Holding {
    fn from(r: HoldingRecord) -> Self {
        let currency = r
            .currency
            .or_else(|| r.market.settlement_currency().map(str::to_string))
            .unwrap_or_else(|| r.symbol.to_uppercase());
        let added_at = r.added_at.unwrap_or_else(Utc::now);

        let (position, price, value) = match r.market.asset_class() {
            AssetClass::Cash => {
                let value = r.value.unwrap_or(r.price);
                (Position::Cash, value, value)
            }
            AssetClass::Metal => {
                let weight_grams = r.weight_grams.or(r.quantity).unwrap_or(0.0);
                let metal = r.metal_type.or_else(|| r.symbol.parse().ok());
                let value = r.value.unwrap_or_else(|| metal_value(weight_grams, r.price));
                (
                    Position::Metal {
                        metal,
                        weight_grams,
                    },
                    r.price,
                    value,
                )
            }
            AssetClass::Security => {
                let quantity = r.quantity.unwrap_or(0.0);
                let value = r.value.unwrap_or(quantity * r.price);
                (Position::Units { quantity }, r.price, value)
            }
        };

        Holding {
            symbol: r.symbol,
            market: r.market,
            position,
            price,
            currency,
            value,
            added_at,
        }
    }
}

impl From<Holding> for HoldingRecord {
    fn from(h: Holding) -> Self {
        let quantity = h.quantity();
        let (metal_type, weight_grams) = match h.position {
            Position::Metal {
                metal,
                weight_grams,
            } => (metal, Some(weight_grams)),
            _ => (None, None),
        };
        HoldingRecord {
            symbol: h.symbol,
            market: h.market,
            quantity: Some(quantity),
            price: h.price,
            currency: Some(h.currency),
            value: Some(h.value),
            metal_type,
            weight_grams,
            added_at: Some(h.added_at),
        }
    }
}
