use crate::core::currency::CurrencyRateProvider;
use crate::core::error::{PortfolioError, Result};
use crate::providers::util::{get_checked, http_client};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

/// exchangerate-api.com pair endpoint. Needs an API key.
pub struct ExchangeRateApiProvider {
    base_url: String,
    api_key: String,
    client: Client,
}

impl ExchangeRateApiProvider {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(PortfolioError::validation(
                "exchange_rate provider requires an api_key",
            ));
        }
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client: http_client(timeout)?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct PairResponse {
    result: String,
    conversion_rate: Option<f64>,
    #[serde(rename = "error-type")]
    error_type: Option<String>,
}

#[async_trait]
impl CurrencyRateProvider for ExchangeRateApiProvider {
    #[instrument(name = "ExchangeRatePairFetch", skip(self))]
    async fn get_rate(&self, from: &str, to: &str) -> Result<f64> {
        let pair = format!("{from}/{to}");
        let url = format!("{}/{}/pair/{pair}", self.base_url, self.api_key);
        debug!("Requesting conversion rate for {}", pair);

        let data: PairResponse = get_checked(&self.client, &url, &pair)
            .await?
            .json()
            .await
            .map_err(|e| PortfolioError::from(e).with_subject(&pair))?;

        if data.result != "success" {
            let reason = data.error_type.unwrap_or(data.result);
            return Err(PortfolioError::upstream(format!(
                "Exchange rate lookup failed for {pair}: {reason}"
            )));
        }

        data.conversion_rate.ok_or_else(|| {
            PortfolioError::upstream(format!("No conversion rate returned for {pair}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn server_with(body: &str) -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/test-key/pair/CAD/USD"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&mock_server)
            .await;
        mock_server
    }

    #[tokio::test]
    async fn test_reads_conversion_rate() {
        let server =
            server_with(r#"{"result":"success","base_code":"CAD","target_code":"USD","conversion_rate":0.73}"#)
                .await;
        let provider =
            ExchangeRateApiProvider::new(&server.uri(), "test-key", Duration::from_secs(5)).unwrap();
        assert_eq!(provider.get_rate("CAD", "USD").await.unwrap(), 0.73);
    }

    #[tokio::test]
    async fn test_error_result_is_upstream() {
        let server = server_with(r#"{"result":"error","error-type":"unsupported-code"}"#).await;
        let provider =
            ExchangeRateApiProvider::new(&server.uri(), "test-key", Duration::from_secs(5)).unwrap();
        let err = provider.get_rate("CAD", "USD").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Exchange rate lookup failed for CAD/USD: unsupported-code"
        );
    }

    #[test]
    fn test_blank_api_key_is_rejected() {
        let result = ExchangeRateApiProvider::new("http://localhost", "  ", Duration::from_secs(1));
        assert!(matches!(result, Err(PortfolioError::Validation(_))));
    }
}
