//! Declarative endpoint configuration
//!
//! An endpoint is a zero-sized marker type implementing [`Endpoint`]. The
//! trait carries everything the request pipeline needs to know about a call:
//! verb, path, call weight, whether it is signed, and the type its `result`
//! deserializes into. [`RequestBuilder`](crate::RequestBuilder) is generic
//! over it, and endpoint-specific parameter setters are inherent impls on
//! `RequestBuilder<ThatEndpoint>`.
//!
//! ```
//! use kraken_rest::{Endpoint, HttpMethod, Visibility};
//! use serde_json::Value;
//!
//! /// An endpoint this crate does not ship
//! struct SystemStatus;
//!
//! impl Endpoint for SystemStatus {
//!     type Output = Value;
//!     const NAME: &'static str = "SystemStatus";
//!     const METHOD: HttpMethod = HttpMethod::Get;
//!     const PATH: &'static str = "/0/public/SystemStatus";
//!     const WEIGHT: u32 = 1;
//!     const VISIBILITY: Visibility = Visibility::Public;
//! }
//! ```

use serde::de::DeserializeOwned;

use crate::transport::HttpMethod;

/// Whether an endpoint needs a signed request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    /// Unauthenticated; never carries a nonce, key or signature
    Public,
    /// Authenticated; always carries a nonce, `API-Key` and `API-Sign`
    Private,
}

/// Static description of one REST endpoint
pub trait Endpoint: Send + Sync + 'static {
    /// Type the response `result` deserializes into
    type Output: DeserializeOwned + Send + 'static;

    /// Kraken method name, used in logs
    const NAME: &'static str;

    /// HTTP verb
    const METHOD: HttpMethod;

    /// URI path, e.g. `/0/private/Balance`
    const PATH: &'static str;

    /// Call-counter cost; 0 means the call is not metered
    const WEIGHT: u32;

    const VISIBILITY: Visibility;
}
