pub mod binance;
pub mod caching;
pub mod coingecko;
pub mod cryptocompare;
pub mod exchange_rate_api;
pub mod util;
pub mod yahoo_finance;
