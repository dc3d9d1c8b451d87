//! `API-Sign` computation
//!
//! Kraken signature algorithm:
//! 1. SHA256(nonce + POST data)
//! 2. HMAC-SHA512(decoded secret, URI path + SHA256 result)
//! 3. Base64 encode the MAC

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256, Sha512};

use crate::credentials::Credentials;
use crate::error::{AuthError, AuthResult};

type HmacSha512 = Hmac<Sha512>;

/// Sign a private request
///
/// # Arguments
/// * `secret` - Decoded (raw) API secret
/// * `path` - URI path, e.g. `/0/private/Balance`
/// * `nonce` - Nonce also present in `post_data`
/// * `post_data` - URL-encoded body exactly as it will be sent
///
/// # Returns
/// Base64-encoded signature
pub fn sign(secret: &[u8], path: &str, nonce: u64, post_data: &str) -> AuthResult<String> {
    let mut sha256 = Sha256::new();
    sha256.update(nonce.to_string().as_bytes());
    sha256.update(post_data.as_bytes());
    let digest = sha256.finalize();

    let mut mac =
        HmacSha512::new_from_slice(secret).map_err(|e| AuthError::Signing(e.to_string()))?;
    mac.update(path.as_bytes());
    mac.update(&digest);

    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

/// Signs one private request: holds the nonce drawn for it
#[derive(Debug)]
pub struct RequestSigner<'a> {
    credentials: &'a Credentials,
    path: String,
    nonce: u64,
}

impl<'a> RequestSigner<'a> {
    /// Create a new request signer, drawing a fresh nonce from the credentials
    pub fn new(credentials: &'a Credentials, path: impl Into<String>) -> Self {
        Self {
            credentials,
            path: path.into(),
            nonce: credentials.next_nonce(),
        }
    }

    /// Get the nonce for this request
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// Get the API key
    pub fn api_key(&self) -> &str {
        self.credentials.api_key()
    }

    /// Sign the request with the given POST data
    pub fn sign(&self, post_data: &str) -> AuthResult<String> {
        self.credentials.sign(&self.path, self.nonce, post_data)
    }
}
