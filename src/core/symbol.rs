//! Maps user-entered tickers onto provider-qualified symbols.

use crate::core::error::{PortfolioError, Result};
use crate::core::market::{CryptoAsset, Market, MetalCode};

/// A symbol ready to be sent to a quote provider.
#[derive(Debug, Clone, PartialEq)]
pub enum QualifiedSymbol {
    /// Exchange-listed security, with the suffix the quote provider expects.
    Listed {
        display: String,
        provider_symbol: String,
        /// Tried when the primary symbol has no quote.
        alternate: Option<String>,
        currency: Option<&'static str>,
    },
    Crypto(CryptoAsset),
    Metal(MetalCode),
}

/// Normalizes `raw` for `market`. Pure; never performs I/O.
pub fn normalize(market: Market, raw: &str) -> Result<QualifiedSymbol> {
    let symbol = raw.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(PortfolioError::validation("Symbol is required"));
    }
    if let Some(c) = symbol.chars().find(|c| !is_symbol_char(*c)) {
        return Err(PortfolioError::validation(format!(
            "Symbol {symbol} contains unsupported character '{c}'"
        )));
    }

    let listed = |provider_symbol: String, alternate: Option<String>| QualifiedSymbol::Listed {
        display: symbol.clone(),
        provider_symbol,
        alternate,
        currency: market.settlement_currency(),
    };

    match market {
        Market::Us => Ok(listed(symbol.clone(), None)),
        Market::Ca => Ok(listed(with_suffix(&symbol, ".TO"), None)),
        Market::Hk => {
            let qualified = if symbol.contains(".HK") {
                symbol.clone()
            } else if symbol.chars().all(|c| c.is_ascii_digit()) {
                format!("{symbol:0>4}.HK")
            } else {
                format!("{symbol}.HK")
            };
            Ok(listed(qualified, None))
        }
        Market::Tw => {
            // Letters usually mean an OTC (TPEx) listing, which lives under .TWO.
            // An explicit .TW or .TWO suffix is taken as given.
            if symbol.contains(".TW") {
                return Ok(listed(symbol.clone(), None));
            }
            let alternate = symbol
                .chars()
                .any(|c| c.is_ascii_alphabetic())
                .then(|| format!("{symbol}.TWO"));
            Ok(listed(format!("{symbol}.TW"), alternate))
        }
        Market::CnShanghai => Ok(listed(with_suffix(&symbol, ".SS"), None)),
        Market::CnShenzhen => Ok(listed(with_suffix(&symbol, ".SZ"), None)),
        Market::Crypto => CryptoAsset::lookup(&symbol).map(QualifiedSymbol::Crypto),
        Market::Metal => symbol.parse::<MetalCode>().map(QualifiedSymbol::Metal),
        Market::Cash => Err(PortfolioError::validation(
            "Cash holdings have no quote; add them with a currency and amount",
        )),
    }
}

/// Letters, digits and the punctuation exchange tickers use (`BRK-B`,
/// `^GSPC`, `GC=F`).
fn is_symbol_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '=' | '^')
}

fn with_suffix(symbol: &str, suffix: &str) -> String {
    if symbol.contains(suffix) {
        symbol.to_string()
    } else {
        format!("{symbol}{suffix}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider_symbol(market: Market, raw: &str) -> String {
        match normalize(market, raw).unwrap() {
            QualifiedSymbol::Listed {
                provider_symbol, ..
            } => provider_symbol,
            other => panic!("Expected a listed symbol, got {other:?}"),
        }
    }

    #[test]
    fn test_us_symbol_is_used_as_is() {
        assert_eq!(provider_symbol(Market::Us, "aapl"), "AAPL");
    }

    #[test]
    fn test_ca_suffix_added_once() {
        assert_eq!(provider_symbol(Market::Ca, "shop"), "SHOP.TO");
        assert_eq!(provider_symbol(Market::Ca, "SHOP.TO"), "SHOP.TO");
    }

    #[test]
    fn test_hk_numeric_symbol_is_padded() {
        assert_eq!(provider_symbol(Market::Hk, "5"), "0005.HK");
        assert_eq!(provider_symbol(Market::Hk, "700"), "0700.HK");
        assert_eq!(provider_symbol(Market::Hk, "9988"), "9988.HK");
        assert_eq!(provider_symbol(Market::Hk, "0700.HK"), "0700.HK");
    }

    #[test]
    fn test_tw_alternate_only_for_symbols_with_letters() {
        match normalize(Market::Tw, "2330").unwrap() {
            QualifiedSymbol::Listed {
                provider_symbol,
                alternate,
                currency,
                ..
            } => {
                assert_eq!(provider_symbol, "2330.TW");
                assert_eq!(alternate, None);
                assert_eq!(currency, Some("TWD"));
            }
            other => panic!("Unexpected {other:?}"),
        }

        match normalize(Market::Tw, "6488a").unwrap() {
            QualifiedSymbol::Listed {
                provider_symbol,
                alternate,
                ..
            } => {
                assert_eq!(provider_symbol, "6488A.TW");
                assert_eq!(alternate.as_deref(), Some("6488A.TWO"));
            }
            other => panic!("Unexpected {other:?}"),
        }
    }

    #[test]
    fn test_tw_explicit_suffix_is_kept() {
        for raw in ["6488a.two", "2330.TW"] {
            match normalize(Market::Tw, raw).unwrap() {
                QualifiedSymbol::Listed {
                    provider_symbol,
                    alternate,
                    ..
                } => {
                    assert_eq!(provider_symbol, raw.to_uppercase());
                    assert_eq!(alternate, None);
                }
                other => panic!("Unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn test_china_suffixes() {
        assert_eq!(provider_symbol(Market::CnShanghai, "600519"), "600519.SS");
        assert_eq!(provider_symbol(Market::CnShenzhen, "000858"), "000858.SZ");
    }

    #[test]
    fn test_crypto_and_metal_validation() {
        assert_eq!(
            normalize(Market::Crypto, "btc").unwrap(),
            QualifiedSymbol::Crypto(CryptoAsset::lookup("BTC").unwrap())
        );
        assert!(matches!(
            normalize(Market::Crypto, "NOTACOIN"),
            Err(PortfolioError::UnsupportedAsset(_))
        ));
        assert_eq!(
            normalize(Market::Metal, "GC=F").unwrap(),
            QualifiedSymbol::Metal(MetalCode::Gold)
        );
        assert!(matches!(
            normalize(Market::Metal, "HG=F"),
            Err(PortfolioError::UnsupportedAsset(_))
        ));
    }

    #[test]
    fn test_symbols_with_url_characters_are_rejected() {
        for raw in ["AAPL/../MSFT", "AAPL?range=5y", "AAPL#x", "BRK B", "0700%2F"] {
            assert!(
                matches!(normalize(Market::Us, raw), Err(PortfolioError::Validation(_))),
                "{raw} should be rejected"
            );
        }
        assert_eq!(provider_symbol(Market::Us, "brk-b"), "BRK-B");
        assert_eq!(provider_symbol(Market::Us, "^gspc"), "^GSPC");
    }

    #[test]
    fn test_blank_symbol_is_rejected() {
        assert!(matches!(
            normalize(Market::Us, "   "),
            Err(PortfolioError::Validation(_))
        ));
    }
}
