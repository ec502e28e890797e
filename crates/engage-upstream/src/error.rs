use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors returned by the upstream social API client.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Network or TLS failure, including per-call timeouts.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// HTTP 403: the credential's API plan does not include this endpoint.
    #[error(
        "access tier insufficient for {endpoint}; upgrade the API plan to elevated access to poll this engagement type"
    )]
    InsufficientAccessTier { endpoint: String },

    /// HTTP 429. `reset_at` comes from `x-rate-limit-reset` when present.
    #[error("rate limited by upstream{}", reset_suffix(.reset_at))]
    RateLimited { reset_at: Option<DateTime<Utc>> },

    /// Any other non-2xx response.
    #[error("unexpected HTTP status {status} from {endpoint}: {body}")]
    Status {
        status: u16,
        endpoint: String,
        body: String,
    },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("user @{0} not found")]
    UserNotFound(String),

    #[error("invalid upstream base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

fn reset_suffix(reset_at: &Option<DateTime<Utc>>) -> String {
    reset_at
        .map(|t| format!(" until {}", t.to_rfc3339()))
        .unwrap_or_default()
}
