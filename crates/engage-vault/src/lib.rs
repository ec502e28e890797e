//! Tenant credential decryption.
//!
//! Stored credentials use the layout `enc:<version>:<base64 payload>`, where
//! the `v1` payload is `ephemeral public key (32) || nonce (24) || ciphertext`
//! sealed with an X25519 + XSalsa20-Poly1305 box to the deployment key.
//! Anything not starting with `enc:` is treated as legacy plaintext.

pub mod error;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use crypto_box::aead::generic_array::GenericArray;
use crypto_box::aead::{Aead, AeadCore, OsRng};
use crypto_box::{PublicKey, SalsaBox, SecretKey};

pub use error::VaultError;

pub const SCHEME_PREFIX: &str = "enc:";
pub const CURRENT_VERSION: &str = "v1";

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 24;
const TAG_LEN: usize = 16;

/// A decrypted credential. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential([redacted])")
    }
}

/// Holds the deployment's static private key.
pub struct CredentialVault {
    secret: SecretKey,
}

impl CredentialVault {
    #[must_use]
    pub fn new(secret: SecretKey) -> Self {
        Self { secret }
    }

    /// Builds a vault from a base64-encoded 32-byte private key.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::InvalidKey`] if the input is not base64 or not 32 bytes.
    pub fn from_base64(encoded: &str) -> Result<Self, VaultError> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| VaultError::InvalidKey(format!("not valid base64: {e}")))?;
        let key: [u8; KEY_LEN] = bytes.try_into().map_err(|b: Vec<u8>| {
            VaultError::InvalidKey(format!("expected {KEY_LEN} bytes, got {}", b.len()))
        })?;
        Ok(Self::new(SecretKey::from(key)))
    }

    /// Generates a fresh keypair. Used when provisioning a deployment.
    #[must_use]
    pub fn generate() -> Self {
        Self::new(SecretKey::generate(&mut OsRng))
    }

    #[must_use]
    pub fn public_key(&self) -> PublicKey {
        self.secret.public_key()
    }

    #[must_use]
    pub fn secret_key_base64(&self) -> String {
        STANDARD.encode(self.secret.to_bytes())
    }

    /// Opens a stored credential blob.
    ///
    /// # Errors
    ///
    /// - [`VaultError::UnsupportedVersion`] if the blob carries the scheme
    ///   prefix but no version or an unknown one.
    /// - [`VaultError::Decryption`] if the payload is malformed or fails
    ///   authentication.
    pub fn decrypt(&self, blob: &str) -> Result<Credential, VaultError> {
        let blob = blob.trim();
        let Some(rest) = blob.strip_prefix(SCHEME_PREFIX) else {
            // TODO: reject plaintext once every tenant has been re-provisioned with `enc:v1:`.
            tracing::warn!("credential is not encrypted; using it as plaintext");
            return Ok(Credential::new(blob));
        };

        let (version, payload) = rest
            .split_once(':')
            .ok_or_else(|| VaultError::UnsupportedVersion("<none>".to_string()))?;
        if version != CURRENT_VERSION {
            return Err(VaultError::UnsupportedVersion(version.to_string()));
        }

        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|e| VaultError::Decryption(format!("payload is not valid base64: {e}")))?;
        if bytes.len() < KEY_LEN + NONCE_LEN + TAG_LEN {
            return Err(VaultError::Decryption(format!(
                "payload too short: {} bytes",
                bytes.len()
            )));
        }

        let (ephemeral, rest) = bytes.split_at(KEY_LEN);
        let (nonce, ciphertext) = rest.split_at(NONCE_LEN);
        let ephemeral: [u8; KEY_LEN] = ephemeral
            .try_into()
            .map_err(|_| VaultError::Decryption("malformed ephemeral key".to_string()))?;

        let salsa_box = SalsaBox::new(&PublicKey::from(ephemeral), &self.secret);
        let plaintext = salsa_box
            .decrypt(GenericArray::from_slice(nonce), ciphertext)
            .map_err(|_| VaultError::Decryption("authentication failed".to_string()))?;

        String::from_utf8(plaintext)
            .map(Credential::new)
            .map_err(|_| VaultError::Decryption("plaintext is not UTF-8".to_string()))
    }
}

/// Whether `blob` uses the encrypted layout, whatever its version.
#[must_use]
pub fn is_sealed(blob: &str) -> bool {
    blob.trim_start().starts_with(SCHEME_PREFIX)
}

/// Encrypts `plaintext` to `recipient` in the current blob format.
///
/// # Errors
///
/// Returns [`VaultError::Encryption`] if the AEAD rejects the input.
pub fn seal(recipient: &PublicKey, plaintext: &str) -> Result<String, VaultError> {
    let ephemeral = SecretKey::generate(&mut OsRng);
    let salsa_box = SalsaBox::new(recipient, &ephemeral);
    let nonce = SalsaBox::generate_nonce(&mut OsRng);
    let ciphertext = salsa_box
        .encrypt(&nonce, plaintext.as_bytes())
        .map_err(|_| VaultError::Encryption)?;

    let mut payload = Vec::with_capacity(KEY_LEN + NONCE_LEN + ciphertext.len());
    payload.extend_from_slice(ephemeral.public_key().as_bytes());
    payload.extend_from_slice(nonce.as_slice());
    payload.extend_from_slice(&ciphertext);

    Ok(format!(
        "{SCHEME_PREFIX}{CURRENT_VERSION}:{}",
        STANDARD.encode(payload)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: &str = "AAAAAAAAAAAAAAAAAAAAABearerTokenForAcme%2Fxyz";

    fn tamper(blob: &str, index: usize) -> String {
        let payload = blob.strip_prefix("enc:v1:").unwrap();
        let mut bytes = STANDARD.decode(payload).unwrap();
        bytes[index] ^= 0x01;
        format!("enc:v1:{}", STANDARD.encode(bytes))
    }

    #[test]
    fn round_trips_with_known_keypair() {
        let vault = CredentialVault::generate();
        let blob = seal(&vault.public_key(), TOKEN).unwrap();
        assert!(blob.starts_with("enc:v1:"));
        assert_eq!(vault.decrypt(&blob).unwrap().expose(), TOKEN);
    }

    #[test]
    fn vault_rebuilt_from_base64_key_decrypts() {
        let vault = CredentialVault::generate();
        let blob = seal(&vault.public_key(), TOKEN).unwrap();
        let reloaded = CredentialVault::from_base64(&vault.secret_key_base64()).unwrap();
        assert_eq!(reloaded.decrypt(&blob).unwrap().expose(), TOKEN);
    }

    #[test]
    fn tampering_with_any_byte_fails_closed() {
        let vault = CredentialVault::generate();
        let blob = seal(&vault.public_key(), TOKEN).unwrap();
        let len = STANDARD
            .decode(blob.strip_prefix("enc:v1:").unwrap())
            .unwrap()
            .len();
        for index in 0..len {
            let result = vault.decrypt(&tamper(&blob, index));
            assert!(
                matches!(result, Err(VaultError::Decryption(_))),
                "byte {index} flipped should fail, got {result:?}"
            );
        }
    }

    #[test]
    fn wrong_key_fails() {
        let vault = CredentialVault::generate();
        let other = CredentialVault::generate();
        let blob = seal(&vault.public_key(), TOKEN).unwrap();
        assert!(matches!(
            other.decrypt(&blob),
            Err(VaultError::Decryption(_))
        ));
    }

    #[test]
    fn unknown_version_is_rejected() {
        let vault = CredentialVault::generate();
        let blob = seal(&vault.public_key(), TOKEN)
            .unwrap()
            .replacen("enc:v1:", "enc:v2:", 1);
        assert!(matches!(
            vault.decrypt(&blob),
            Err(VaultError::UnsupportedVersion(ref v)) if v == "v2"
        ));
    }

    #[test]
    fn unversioned_blob_is_rejected() {
        let vault = CredentialVault::generate();
        assert!(matches!(
            vault.decrypt("enc:c29tZXRoaW5n"),
            Err(VaultError::UnsupportedVersion(_))
        ));
    }

    #[test]
    fn unprefixed_blob_passes_through_as_plaintext() {
        let vault = CredentialVault::generate();
        assert_eq!(vault.decrypt("  legacy-token ").unwrap().expose(), "legacy-token");
    }

    #[test]
    fn sealed_detection_ignores_version() {
        assert!(is_sealed("enc:v1:AAAA"));
        assert!(is_sealed(" enc:v9:AAAA"));
        assert!(!is_sealed("AAAAbearer"));
    }

    #[test]
    fn short_or_garbled_payload_fails() {
        let vault = CredentialVault::generate();
        assert!(matches!(
            vault.decrypt("enc:v1:AAAA"),
            Err(VaultError::Decryption(ref m)) if m.contains("too short")
        ));
        assert!(matches!(
            vault.decrypt("enc:v1:!!!not-base64!!!"),
            Err(VaultError::Decryption(_))
        ));
    }

    #[test]
    fn invalid_private_keys_are_rejected() {
        assert!(matches!(
            CredentialVault::from_base64("not base64 at all"),
            Err(VaultError::InvalidKey(_))
        ));
        assert!(matches!(
            CredentialVault::from_base64(&STANDARD.encode([7u8; 16])),
            Err(VaultError::InvalidKey(ref m)) if m.contains("32 bytes")
        ));
    }

    #[test]
    fn credential_debug_is_redacted() {
        let credential = Credential::new("secret-token");
        assert!(!format!("{credential:?}").contains("secret-token"));
    }
}
