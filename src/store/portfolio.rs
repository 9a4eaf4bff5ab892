//! Holdings and table ordering persisted as JSON blobs.

use crate::core::cache::{KeyValueCollection, Store};
use crate::core::holding::Holding;
use crate::core::holdings::HoldingsStore;
use crate::core::sort::SortState;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, warn};

const COLLECTION: &str = "portfolio";
const HOLDINGS_KEY: &[u8] = b"holdings";
const SORT_KEY: &[u8] = b"sort";

pub struct PortfolioRepository {
    collection: Arc<dyn KeyValueCollection>,
}

impl PortfolioRepository {
    pub fn new(store: &dyn Store) -> Result<Self> {
        Ok(Self {
            collection: store.get_collection(COLLECTION, true)?,
        })
    }

    pub async fn load(&self) -> Result<HoldingsStore> {
        let saved = self
            .collection
            .get(HOLDINGS_KEY)
            .await
            .context("Failed to read saved holdings")?;
        let Some(raw) = saved else {
            debug!("No saved holdings, starting empty");
            return Ok(HoldingsStore::new());
        };
        let holdings: Vec<Holding> =
            serde_json::from_slice(&raw).context("Failed to parse saved holdings")?;
        debug!("Loaded {} saved holdings", holdings.len());
        Ok(HoldingsStore::from_holdings(holdings))
    }

    pub async fn save(&self, holdings: &HoldingsStore) -> Result<()> {
        let raw = serde_json::to_vec(holdings.holdings())?;
        self.collection
            .put(HOLDINGS_KEY, &raw, None)
            .await
            .context("Failed to save holdings")
    }

    pub async fn load_sort_state(&self) -> SortState {
        let raw = match self.collection.get(SORT_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return SortState::default(),
            Err(e) => {
                warn!("Ignoring unreadable sort state: {e:#}");
                return SortState::default();
            }
        };
        serde_json::from_slice(&raw).unwrap_or_else(|e| {
            warn!("Ignoring unreadable sort state: {e}");
            SortState::default()
        })
    }

    pub async fn save_sort_state(&self, state: &SortState) -> Result<()> {
        let raw = serde_json::to_vec(state)?;
        self.collection
            .put(SORT_KEY, &raw, None)
            .await
            .context("Failed to save sort state")
    }
}
