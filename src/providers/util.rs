use crate::core::error::{PortfolioError, Result};
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;

pub const USER_AGENT: &str = "folio/1.0";

/// Client shared by a provider; every request is bounded by `timeout`.
pub fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| PortfolioError::upstream(format!("Failed to build HTTP client: {e}")))
}

/// Sends a GET, mapping 404 to `NotFound` and other non-2xx codes to `Upstream`.
pub async fn get_checked(client: &Client, url: &str, what: &str) -> Result<Response> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| PortfolioError::from(e).with_subject(what))?;

    match response.status() {
        status if status.is_success() => Ok(response),
        StatusCode::NOT_FOUND => Err(PortfolioError::NotFound(format!(
            "No quote found for {what}"
        ))),
        status => Err(PortfolioError::upstream(format!(
            "HTTP error: {status} for {what}"
        ))),
    }
}
