use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EndpointConfig {
    pub base_url: String,
}

impl EndpointConfig {
    fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ExchangeRateConfig {
    #[serde(default = "ExchangeRateConfig::default_base_url")]
    pub base_url: String,
    pub api_key: String,
}

impl ExchangeRateConfig {
    fn default_base_url() -> String {
        "https://v6.exchangerate-api.com/v6".to_string()
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ProvidersConfig {
    pub yahoo: EndpointConfig,
    pub binance: EndpointConfig,
    pub cryptocompare: EndpointConfig,
    pub coingecko: EndpointConfig,
    /// Replaces Yahoo FX pairs for currency rates when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange_rate: Option<ExchangeRateConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            yahoo: EndpointConfig::new("https://query1.finance.yahoo.com"),
            binance: EndpointConfig::new("https://api.binance.com"),
            cryptocompare: EndpointConfig::new("https://min-api.cryptocompare.com"),
            coingecko: EndpointConfig::new("https://api.coingecko.com"),
            exchange_rate: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub providers: ProvidersConfig,
    /// Crypto providers in the order they are tried.
    pub crypto_providers: Vec<String>,
    pub request_timeout_ms: u64,
    pub rate_cache_ttl_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            providers: ProvidersConfig::default(),
            crypto_providers: vec![
                "binance".to_string(),
                "cryptocompare".to_string(),
                "coingecko".to_string(),
            ],
            request_timeout_ms: 10_000,
            rate_cache_ttl_secs: 300,
            data_path: None,
        }
    }
}

impl AppConfig {
    /// Loads the config from the default location, or the defaults when no
    /// file has been written there yet.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!("No config at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "folio", "folio")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("dev", "folio", "folio")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        // An empty document deserializes as unit, not as an empty mapping.
        if config_str.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn rate_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.rate_cache_ttl_secs)
    }
}
