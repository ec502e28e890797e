use thiserror::Error;

/// Errors returned while opening or sealing tenant credentials.
#[derive(Debug, Error)]
pub enum VaultError {
    /// The deployment private key could not be parsed.
    #[error("invalid vault private key: {0}")]
    InvalidKey(String),

    /// The blob carries the scheme prefix but a missing or unknown version.
    #[error("unsupported credential version: {0}")]
    UnsupportedVersion(String),

    /// The payload is malformed or failed authentication.
    #[error("credential decryption failed: {0}")]
    Decryption(String),

    #[error("credential encryption failed")]
    Encryption,
}
