//! Common test utilities and fixtures for integration tests
//!
//! Response bodies follow the shapes documented for Kraken's REST API.

#![allow(dead_code)]

use kraken_rest::{ClientConfig, Credentials, KrakenRestClient, MockTransport, NonceProvider};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Secret from Kraken's signing documentation
pub const DOC_SECRET: &str =
    "kQH5HW/8p1uGOVjbgWA7FunAmGO8lsSUXNsu3eow76sz84Q18fWxnyRzBHCd3pd5nE9qa99HAZtuZuj6F1huXg==";

/// Nonce used with [`DOC_SECRET`] in the documented example
pub const DOC_NONCE: u64 = 1616492376594;

/// Signature of the documented `AddOrder` example
pub const DOC_SIGNATURE: &str =
    "4/dpxb3iT4tp/ZCVEwSnEsLxx0bqyhLpdfOpc6fn7OR8+UClSV5n9E6aSS8MPtnRfp32bAb0nmbRn6H8ndwLUQ==";

pub const DEPOSIT_METHODS: &str = r#"{
    "error": [],
    "result": [{
        "method": "Ether (Hex)",
        "limit": false,
        "fee": "0.0000000000",
        "gen-address": true
    }]
}"#;

pub const BALANCE: &str = r#"{
    "error": [],
    "result": {
        "ZUSD": "171288.6158",
        "ZEUR": "504861.8946",
        "XXBT": "1011.1908877900",
        "XETH": "818.5500000000"
    }
}"#;

pub const SERVER_TIME: &str = r#"{
    "error": [],
    "result": {"unixtime": 1688669448, "rfc1123": "Thu, 06 Jul 23 18:50:48 +0000"}
}"#;

pub const RATE_LIMITED: &str = r#"{"error": ["EAPI:Rate limit exceeded"]}"#;

/// Nonce source that always returns the same value
#[derive(Debug)]
pub struct FixedNonce(pub u64);

impl NonceProvider for FixedNonce {
    fn next_nonce(&self) -> u64 {
        self.0
    }
}

pub fn credentials() -> Credentials {
    Credentials::new("test-api-key", DOC_SECRET).expect("valid test credentials")
}

/// Route client logs to the test output; `RUST_LOG=kraken_rest=debug` to see them
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Client over a mock transport, with default throttling
pub fn client(config: ClientConfig) -> (KrakenRestClient, Arc<MockTransport>) {
    init_tracing();
    let transport = Arc::new(MockTransport::new());
    let client = KrakenRestClient::with_config(
        config
            .with_base_url("https://mock.test")
            .with_transport(transport.clone()),
    )
    .expect("client");
    (client, transport)
}

/// Authenticated client over a mock transport
pub fn private_client() -> (KrakenRestClient, Arc<MockTransport>) {
    client(ClientConfig::new().with_credentials(credentials()))
}

/// Decode a form body into its fields, in order
pub fn form(body: &str) -> Vec<(String, String)> {
    serde_urlencoded::from_str(body).expect("form body")
}
