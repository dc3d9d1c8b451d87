//! Authentication credentials for Kraken API
//!
//! # Security
//!
//! Secrets are stored using the `secrecy` crate which:
//! - Zeroizes memory on drop (prevents memory scanning)
//! - Prevents accidental logging via Debug impl
//! - Provides explicit access via `expose_secret()`

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use secrecy::{ExposeSecret, SecretBox};
use std::sync::Arc;
use tracing::debug;

use crate::error::{AuthError, AuthResult};
use crate::nonce::{IncreasingNonce, NonceProvider};
use crate::signer;

/// API credentials for authenticated requests
///
/// The secret is validated and decoded once, here, so a malformed secret is
/// reported when the credentials are loaded rather than on the first private
/// call. Clones share the nonce source: they are the same API key as far as
/// the exchange is concerned.
pub struct Credentials {
    /// API key (public)
    api_key: String,
    /// Secret (decoded from base64, zeroized on drop)
    secret: SecretBox<Vec<u8>>,
    nonce: Arc<dyn NonceProvider>,
}

impl Credentials {
    /// Create new credentials from API key and secret
    ///
    /// # Arguments
    /// * `api_key` - Your Kraken API key
    /// * `secret` - Your private key (base64 encoded string)
    ///
    /// # Errors
    /// [`AuthError::InvalidCredentials`] if the key is empty or the secret is
    /// empty or not valid base64.
    pub fn new(api_key: impl Into<String>, secret: impl AsRef<str>) -> AuthResult<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(AuthError::InvalidCredentials("API key is empty".to_string()));
        }

        let decoded = BASE64.decode(secret.as_ref().trim()).map_err(|e| {
            AuthError::InvalidCredentials(format!("Invalid base64 private key: {}", e))
        })?;
        if decoded.is_empty() {
            return Err(AuthError::InvalidCredentials(
                "Private key is empty".to_string(),
            ));
        }

        debug!(secret_len = decoded.len(), "Loaded API credentials");

        Ok(Self {
            api_key,
            secret: SecretBox::new(Box::new(decoded)),
            nonce: Arc::new(IncreasingNonce::new()),
        })
    }

    /// Create credentials from environment variables
    ///
    /// Reads `KRAKEN_API_KEY` and `KRAKEN_PRIVATE_KEY` from the environment.
    pub fn from_env() -> AuthResult<Self> {
        let api_key = std::env::var("KRAKEN_API_KEY")
            .map_err(|_| AuthError::EnvVarNotSet("KRAKEN_API_KEY".to_string()))?;
        let secret = std::env::var("KRAKEN_PRIVATE_KEY")
            .map_err(|_| AuthError::EnvVarNotSet("KRAKEN_PRIVATE_KEY".to_string()))?;

        Self::new(api_key, secret)
    }

    /// Replace the nonce source
    pub fn with_nonce_provider(mut self, nonce: Arc<dyn NonceProvider>) -> Self {
        self.nonce = nonce;
        self
    }

    /// Get the API key
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Draw the next nonce for this key
    pub fn next_nonce(&self) -> u64 {
        self.nonce.next_nonce()
    }

    /// Sign a request for Kraken's API
    ///
    /// # Arguments
    /// * `path` - API endpoint path (e.g., "/0/private/Balance")
    /// * `nonce` - Nonce for this request, also present in `post_data`
    /// * `post_data` - URL-encoded POST body
    pub fn sign(&self, path: &str, nonce: u64, post_data: &str) -> AuthResult<String> {
        signer::sign(self.secret.expose_secret(), path, nonce, post_data)
    }
}

impl Clone for Credentials {
    fn clone(&self) -> Self {
        Self {
            api_key: self.api_key.clone(),
            secret: SecretBox::new(Box::new(self.secret.expose_secret().clone())),
            nonce: Arc::clone(&self.nonce),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let shown = self
            .api_key
            .char_indices()
            .nth(8)
            .map_or(self.api_key.as_str(), |(idx, _)| &self.api_key[..idx]);
        f.debug_struct("Credentials")
            .field("api_key", &format!("{}...", shown))
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[derive(Debug, Default)]
    struct Sequence(AtomicU64);

    impl NonceProvider for Sequence {
        fn next_nonce(&self) -> u64 {
            self.0.fetch_add(1, Ordering::SeqCst) + 1
        }
    }

    #[test]
    fn test_valid_credentials() {
        let creds = Credentials::new("key", "c2VjcmV0").unwrap();
        assert_eq!(creds.api_key(), "key");
    }

    #[test]
    fn test_invalid_base64_rejected_at_load() {
        let result = Credentials::new("key", "not base64!!");
        assert!(matches!(result, Err(AuthError::InvalidCredentials(_))));
    }

    #[test]
    fn test_empty_secret_rejected_at_load() {
        assert!(matches!(
            Credentials::new("key", ""),
            Err(AuthError::InvalidCredentials(_))
        ));
        assert!(matches!(
            Credentials::new("", "c2VjcmV0"),
            Err(AuthError::InvalidCredentials(_))
        ));
    }

    #[test]
    fn test_credentials_debug_redacts_key() {
        let creds = Credentials::new("test_api_key_long", "dGVzdF9wcml2YXRlX2tleQ==").unwrap();
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("test_private_key"));
        assert!(!debug.contains("test_api_key_long"));
        assert!(debug.contains("test_api..."));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_clones_share_nonce_sequence() {
        let creds = Credentials::new("key", "c2VjcmV0")
            .unwrap()
            .with_nonce_provider(Arc::new(Sequence::default()));
        let clone = creds.clone();

        assert_eq!(creds.next_nonce(), 1);
        assert_eq!(clone.next_nonce(), 2);
        assert_eq!(creds.next_nonce(), 3);
    }

    #[test]
    fn test_from_env_missing_var() {
        std::env::remove_var("KRAKEN_API_KEY");
        let result = Credentials::from_env();
        assert!(matches!(result, Err(AuthError::EnvVarNotSet(_))));
    }
}
