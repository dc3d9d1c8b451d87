//! Credentials, nonces and request signing for Kraken's private REST endpoints
//!
//! Private endpoints authenticate every call with two headers: `API-Key` and
//! `API-Sign`, where the signature covers the URI path, a strictly increasing
//! nonce and the exact POST body sent.
//!
//! # Example
//!
//! ```no_run
//! use kraken_auth::{Credentials, RequestSigner};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load credentials from environment
//! let creds = Credentials::from_env()?;
//!
//! let signer = RequestSigner::new(&creds, "/0/private/Balance");
//! let body = format!("nonce={}", signer.nonce());
//! let signature = signer.sign(&body)?;
//! println!("API-Sign: {}", signature);
//! # Ok(())
//! # }
//! ```

mod credentials;
mod error;
mod nonce;
mod signer;

pub use credentials::Credentials;
pub use error::{AuthError, AuthResult};
pub use nonce::{IncreasingNonce, NonceProvider};
pub use signer::{sign, RequestSigner};
