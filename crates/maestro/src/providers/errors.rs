use std::time::Duration;

use thiserror::Error;

/// Transport and API failures from a provider shim.
///
/// None of these are retried inside a provider attempt; the fallback controller
/// decides whether another provider gets a turn.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider API error (status {}): {}", display_status(.status), .body.as_deref().unwrap_or("<empty body>"))]
    Api {
        status: Option<u16>,
        body: Option<String>,
    },

    #[error("Provider request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid provider request: {0}")]
    InvalidRequest(String),

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("Context length exceeded: {0}")]
    ContextLengthExceeded(String),
}

fn display_status(status: &Option<u16>) -> String {
    status
        .map(|s| s.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub type ProviderResult<T> = Result<T, ProviderError>;
