use engage_core::StoreError;
use engage_upstream::UpstreamError;
use engage_vault::VaultError;
use thiserror::Error;

/// Why one unit of work (a tenant, or a tenant × engagement type) failed.
///
/// None of these stop a cycle; they end up as strings in the report.
#[derive(Debug, Error)]
pub enum PollError {
    /// Missing credential, handle, hashtags, or an unknown tenant.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("credential error: {0}")]
    Vault(#[from] VaultError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl PollError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}
