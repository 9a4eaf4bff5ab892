//! Core business logic abstractions

pub mod cache;
pub mod config;
pub mod converter;
pub mod currency;
pub mod error;
pub mod holding;
pub mod holdings;
pub mod log;
pub mod market;
pub mod price;
pub mod resolver;
pub mod sort;
pub mod symbol;
pub mod valuation;

// Re-export main types for cleaner imports
pub use currency::CurrencyRateProvider;
pub use error::{PortfolioError, ProviderFailure};
pub use holding::Holding;
pub use holdings::HoldingsStore;
pub use market::Market;
pub use price::{CryptoQuoteProvider, MetalQuote, PriceProvider, PriceResult, Quote};
