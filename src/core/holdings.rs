//! Ordered holdings collection with add-or-merge semantics.

use crate::core::error::{PortfolioError, Result};
use crate::core::holding::Holding;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct MergeOutcome {
    pub merged: bool,
    pub holding: Holding,
}

#[derive(Debug, Clone, Default)]
pub struct HoldingsStore {
    holdings: Vec<Holding>,
}

impl HoldingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_holdings(holdings: Vec<Holding>) -> Self {
        let mut store = Self::new();
        for holding in holdings {
            let at = holding.added_at;
            store.add_or_merge_at(holding, at);
        }
        store
    }

    pub fn holdings(&self) -> &[Holding] {
        &self.holdings
    }

    pub fn len(&self) -> usize {
        self.holdings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty()
    }

    pub fn add_or_merge(&mut self, holding: Holding) -> MergeOutcome {
        self.add_or_merge_at(holding, Utc::now())
    }

    /// Merges into the holding with the same key, or appends. `at` becomes
    /// the merged holding's `added_at`.
    pub fn add_or_merge_at(&mut self, holding: Holding, at: DateTime<Utc>) -> MergeOutcome {
        let key = holding.key();
        match self.holdings.iter_mut().find(|h| h.key() == key) {
            Some(existing) => {
                existing.absorb(&holding, at);
                info!(
                    symbol = %existing.symbol,
                    market = %existing.market,
                    value = existing.value,
                    "Merged into existing holding"
                );
                MergeOutcome {
                    merged: true,
                    holding: existing.clone(),
                }
            }
            None => {
                info!(symbol = %holding.symbol, market = %holding.market, "Added new holding");
                self.holdings.push(holding.clone());
                MergeOutcome {
                    merged: false,
                    holding,
                }
            }
        }
    }

    pub fn remove_at(&mut self, index: usize) -> Result<Holding> {
        if index >= self.holdings.len() {
            return Err(PortfolioError::IndexOutOfRange {
                index,
                len: self.holdings.len(),
            });
        }
        let removed = self.holdings.remove(index);
        info!(index, symbol = %removed.symbol, "Removed holding");
        Ok(removed)
    }

    pub fn clear(&mut self) {
        self.holdings.clear();
        info!("Cleared all holdings");
    }

    pub fn into_holdings(self) -> Vec<Holding> {
        self.holdings
    }
}
