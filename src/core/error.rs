//! Error taxonomy shared by the pricing, conversion and holdings code.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// One failed attempt against a named upstream provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderFailure {
    pub provider: String,
    pub reason: String,
}

impl ProviderFailure {
    pub fn new(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.provider, self.reason)
    }
}

#[derive(Debug, Clone, Error)]
pub enum PortfolioError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    UnsupportedAsset(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{}", format_upstream(.message, .attempts))]
    Upstream {
        message: String,
        attempts: Vec<ProviderFailure>,
    },

    #[error("No holding at index {index} (portfolio has {len} holdings)")]
    IndexOutOfRange { index: usize, len: usize },
}

fn format_upstream(message: &str, attempts: &[ProviderFailure]) -> String {
    if attempts.is_empty() {
        return message.to_string();
    }
    let trail = attempts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ");
    format!("{message} [{trail}]")
}

impl PortfolioError {
    pub fn validation(message: impl Into<String>) -> Self {
        PortfolioError::Validation(message.into())
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        PortfolioError::Upstream {
            message: message.into(),
            attempts: Vec::new(),
        }
    }

    /// Names what was being fetched in an upstream failure message.
    pub fn with_subject(self, subject: &str) -> Self {
        match self {
            PortfolioError::Upstream { message, attempts } => PortfolioError::Upstream {
                message: format!("{message} for {subject}"),
                attempts,
            },
            other => other,
        }
    }

    /// Status class a request boundary should answer with.
    pub fn status(&self) -> u16 {
        match self {
            PortfolioError::Validation(_) | PortfolioError::UnsupportedAsset(_) => 400,
            PortfolioError::NotFound(_) | PortfolioError::IndexOutOfRange { .. } => 404,
            PortfolioError::Upstream { .. } => 502,
        }
    }
}

impl From<reqwest::Error> for PortfolioError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            PortfolioError::upstream(format!("Request timed out: {e}"))
        } else if e.is_decode() {
            PortfolioError::upstream(format!("Unexpected response shape: {e}"))
        } else {
            PortfolioError::upstream(format!("Request error: {e}"))
        }
    }
}

pub type Result<T, E = PortfolioError> = std::result::Result<T, E>;
