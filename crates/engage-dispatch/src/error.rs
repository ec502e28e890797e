use thiserror::Error;

/// Failure delivering a reward event over one channel.
///
/// These never escape [`crate::RewardDispatcher::dispatch`]; they are logged
/// and collapsed into a `false` success flag.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Network, TLS, or timeout failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The reward service answered with a non-2xx status.
    #[error("{channel} channel returned HTTP {status}: {body}")]
    Status {
        channel: String,
        status: u16,
        body: String,
    },

    /// A 2xx answer whose body was not JSON.
    #[error("{channel} channel returned a non-JSON body: {source}")]
    NotJson {
        channel: String,
        #[source]
        source: serde_json::Error,
    },

    /// A 2xx JSON answer that reported `"success": false`.
    #[error("{channel} channel rejected the event: {message}")]
    Rejected { channel: String, message: String },

    #[error("invalid reward endpoint '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}
