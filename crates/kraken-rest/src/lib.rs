//! REST API client for Kraken cryptocurrency exchange
//!
//! This crate builds, signs, throttles and dispatches Kraken REST calls and
//! decodes the responses into typed results.
//!
//! # Features
//!
//! - **Market Data**: Server time, assets, pairs, ticker, OHLC, depth, trades, spreads
//! - **Account**: Balances, orders, trades, positions, ledgers, fee volume
//! - **Trading**: Place and cancel orders
//! - **Funding**: Deposit methods, addresses and status; withdrawals
//!
//! Every call goes through one generic [`RequestBuilder`], parametrized by an
//! [`Endpoint`] marker type. `send().await` runs the call inline;
//! `enqueue()` runs it in the background and returns a [`RequestHandle`].
//!
//! # Authentication
//!
//! Private endpoints require API credentials. Each private call carries a
//! fresh nonce and an HMAC-SHA512 signature over the exact body sent; see
//! [`kraken_auth`].
//!
//! # Example
//!
//! ```no_run
//! use kraken_rest::{KrakenRestClient, Credentials};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Public endpoints (no auth required)
//!     let client = KrakenRestClient::new()?;
//!     let ticker = client.get_ticker().pairs(["XBTUSD"]).send().await?;
//!     println!("BTC/USD: {:?}", ticker);
//!
//!     // Private endpoints (auth required)
//!     let creds = Credentials::from_env()?;
//!     let auth_client = KrakenRestClient::with_credentials(creds)?;
//!     let pending = auth_client.get_balance().enqueue();
//!     println!("Balances: {:?}", pending.await?);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Rate Limiting
//!
//! Kraken meters calls per API key with a decaying counter whose ceiling and
//! decay rate depend on the account tier. The client mirrors that counter in
//! a [`CallCounter`] and delays calls that would push it over the ceiling,
//! first come first served. Use [`RequestBuilder::throttle_timeout`] to bound
//! the wait, or [`ClientConfig::without_throttle`] to turn throttling off.

pub mod call_counter;
pub mod client;
pub mod dispatch;
pub mod endpoint;
pub mod endpoints;
pub mod error;
pub mod handle;
pub mod request;
pub mod transport;
pub mod types;

// Re-export main types
pub use call_counter::{CallCounter, SharedCallCounter};
pub use client::{ClientConfig, KrakenRestClient, DEFAULT_BASE_URL};
pub use dispatch::Dispatcher;
pub use endpoint::{Endpoint, Visibility};
pub use error::{ApiError, RestError, RestResult};
pub use handle::RequestHandle;
pub use request::{RequestBuilder, RequestContext, RequestDescriptor};
pub use transport::{HttpMethod, HttpRequest, HttpResponse, ReqwestTransport, Transport, TransportError};

#[cfg(any(test, feature = "test-utils"))]
pub use transport::MockTransport;

pub use kraken_auth::{Credentials, IncreasingNonce, NonceProvider};
pub use kraken_types::{CallBudgetConfig, KrakenApiError, KrakenErrorCode, RecoveryStrategy, Tier};

// Shared request/response types
pub use types::{
    CloseTime, Dictionary, LedgerType, OrderFlag, OrderSide, OrderType, TimeInForce, TradeType,
};
