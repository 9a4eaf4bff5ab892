//! Markets, precious metals and the supported crypto assets.

use crate::core::error::PortfolioError;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// Grams in one troy ounce.
pub const GRAMS_PER_TROY_OUNCE: f64 = 31.1035;

/// Currencies a portfolio total is fanned out to, in display order.
pub const CANONICAL_CURRENCIES: [&str; 10] = [
    "USD", "CAD", "HKD", "TWD", "CNY", "JPY", "EUR", "GBP", "KRW", "AUD",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Market {
    Us,
    Ca,
    Hk,
    Tw,
    CnShanghai,
    CnShenzhen,
    Crypto,
    Metal,
    Cash,
}

/// Merge and valuation rules are chosen per asset class, not per market.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetClass {
    Security,
    Metal,
    Cash,
}

impl Market {
    pub const ALL: [Market; 9] = [
        Market::Us,
        Market::Ca,
        Market::Hk,
        Market::Tw,
        Market::CnShanghai,
        Market::CnShenzhen,
        Market::Crypto,
        Market::Metal,
        Market::Cash,
    ];

    pub fn asset_class(&self) -> AssetClass {
        match self {
            Market::Metal => AssetClass::Metal,
            Market::Cash => AssetClass::Cash,
            _ => AssetClass::Security,
        }
    }

    /// Settlement currency implied by the market, if it has a fixed one.
    pub fn settlement_currency(&self) -> Option<&'static str> {
        match self {
            Market::Us | Market::Crypto | Market::Metal => Some("USD"),
            Market::Ca => Some("CAD"),
            Market::Hk => Some("HKD"),
            Market::Tw => Some("TWD"),
            Market::CnShanghai | Market::CnShenzhen => Some("CNY"),
            Market::Cash => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Market::Us => "US",
            Market::Ca => "CA",
            Market::Hk => "HK",
            Market::Tw => "TW",
            Market::CnShanghai => "CN_SHANGHAI",
            Market::CnShenzhen => "CN_SHENZHEN",
            Market::Crypto => "CRYPTO",
            Market::Metal => "METAL",
            Market::Cash => "CASH",
        }
    }
}

impl Display for Market {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Market {
    type Err = PortfolioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().replace('-', "_").as_str() {
            "US" => Ok(Market::Us),
            "CA" => Ok(Market::Ca),
            "HK" => Ok(Market::Hk),
            "TW" => Ok(Market::Tw),
            "CN_SHANGHAI" | "SS" | "SH" => Ok(Market::CnShanghai),
            "CN_SHENZHEN" | "SZ" => Ok(Market::CnShenzhen),
            "CRYPTO" => Ok(Market::Crypto),
            "METAL" | "METALS" => Ok(Market::Metal),
            "CASH" => Ok(Market::Cash),
            _ => Err(PortfolioError::validation(format!("Unknown market: {s}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetalCode {
    #[serde(rename = "GC=F")]
    Gold,
    #[serde(rename = "SI=F")]
    Silver,
    #[serde(rename = "PL=F")]
    Platinum,
    #[serde(rename = "PA=F")]
    Palladium,
}

impl MetalCode {
    pub const ALL: [MetalCode; 4] = [
        MetalCode::Gold,
        MetalCode::Silver,
        MetalCode::Platinum,
        MetalCode::Palladium,
    ];

    /// Futures symbol quoted per troy ounce.
    pub fn futures_code(&self) -> &'static str {
        match self {
            MetalCode::Gold => "GC=F",
            MetalCode::Silver => "SI=F",
            MetalCode::Platinum => "PL=F",
            MetalCode::Palladium => "PA=F",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            MetalCode::Gold => "Gold",
            MetalCode::Silver => "Silver",
            MetalCode::Platinum => "Platinum",
            MetalCode::Palladium => "Palladium",
        }
    }
}

impl Display for MetalCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for MetalCode {
    type Err = PortfolioError;

    /// Accepts either the metal's name or its futures code.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        MetalCode::ALL
            .into_iter()
            .find(|m| {
                m.name().eq_ignore_ascii_case(wanted) || m.futures_code().eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| {
                PortfolioError::UnsupportedAsset(format!(
                    "Metal {s} not supported. Supported: Gold, Silver, Platinum, Palladium"
                ))
            })
    }
}

/// Crypto assets with a known price feed, keyed by ticker, with their CoinGecko id.
const SUPPORTED_CRYPTO: [(&str, &str); 19] = [
    ("BTC", "bitcoin"),
    ("ETH", "ethereum"),
    ("USDT", "tether"),
    ("BNB", "binancecoin"),
    ("SOL", "solana"),
    ("ADA", "cardano"),
    ("XRP", "ripple"),
    ("DOT", "polkadot"),
    ("DOGE", "dogecoin"),
    ("MATIC", "matic-network"),
    ("AVAX", "avalanche-2"),
    ("LINK", "chainlink"),
    ("UNI", "uniswap"),
    ("ATOM", "cosmos"),
    ("LTC", "litecoin"),
    ("BCH", "bitcoin-cash"),
    ("ALGO", "algorand"),
    ("TRX", "tron"),
    ("SHIB", "shiba-inu"),
];

/// A validated, uppercased crypto ticker.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CryptoAsset {
    pub symbol: &'static str,
    pub coingecko_id: &'static str,
}

impl CryptoAsset {
    pub fn lookup(symbol: &str) -> Result<Self, PortfolioError> {
        let upper = symbol.trim().to_uppercase();
        SUPPORTED_CRYPTO
            .iter()
            .find(|(ticker, _)| *ticker == upper)
            .map(|&(symbol, coingecko_id)| CryptoAsset {
                symbol,
                coingecko_id,
            })
            .ok_or_else(|| {
                let supported = SUPPORTED_CRYPTO
                    .iter()
                    .map(|(ticker, _)| *ticker)
                    .collect::<Vec<_>>()
                    .join(", ");
                PortfolioError::UnsupportedAsset(format!(
                    "Crypto symbol {symbol} not supported. Supported: {supported}"
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_market_parsing_accepts_aliases() {
        assert_eq!("us".parse::<Market>().unwrap(), Market::Us);
        assert_eq!("cn-shanghai".parse::<Market>().unwrap(), Market::CnShanghai);
        assert_eq!("SZ".parse::<Market>().unwrap(), Market::CnShenzhen);
        assert_eq!("Metal".parse::<Market>().unwrap(), Market::Metal);
        assert!(matches!(
            "NYSE".parse::<Market>(),
            Err(PortfolioError::Validation(_))
        ));
    }

    #[test]
    fn test_market_serializes_as_screaming_code() {
        let json = serde_json::to_string(&Market::CnShenzhen).unwrap();
        assert_eq!(json, "\"CN_SHENZHEN\"");
        let market: Market = serde_json::from_str("\"CRYPTO\"").unwrap();
        assert_eq!(market, Market::Crypto);
    }

    #[test]
    fn test_metal_code_from_name_or_futures_code() {
        assert_eq!("gold".parse::<MetalCode>().unwrap(), MetalCode::Gold);
        assert_eq!("SI=F".parse::<MetalCode>().unwrap(), MetalCode::Silver);
        assert_eq!(MetalCode::Palladium.futures_code(), "PA=F");
        assert!(matches!(
            "copper".parse::<MetalCode>(),
            Err(PortfolioError::UnsupportedAsset(_))
        ));
    }

    #[test]
    fn test_crypto_lookup() {
        let asset = CryptoAsset::lookup("eth").unwrap();
        assert_eq!(asset.symbol, "ETH");
        assert_eq!(asset.coingecko_id, "ethereum");

        let err = CryptoAsset::lookup("FOO").unwrap_err();
        assert!(err.to_string().contains("not supported"));
        assert!(err.to_string().contains("BTC"));
    }
}
