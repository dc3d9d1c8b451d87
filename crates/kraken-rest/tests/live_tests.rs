//! Live tests against Kraken's public REST API
//!
//! These tests make real HTTP calls to api.kraken.com.
//! Run with: cargo test -p kraken-rest --test live_tests -- --ignored
//!
//! Only public endpoints are exercised; no credentials are needed.

use kraken_rest::KrakenRestClient;
use std::time::Duration;

/// Server time is close to local time
#[tokio::test]
#[ignore = "Makes real HTTP call"]
async fn test_live_server_time() {
    let client = KrakenRestClient::new().expect("client");

    let time = client.get_server_time().send().await.expect("server time");

    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64;
    assert!((time.unixtime - now).abs() < 300, "clock skew too large");
    assert!(time.datetime().is_some());
}

/// Ticker and depth decode for a liquid pair
#[tokio::test]
#[ignore = "Makes real HTTP call"]
async fn test_live_ticker_and_depth() {
    let client = KrakenRestClient::new().expect("client");

    let tickers = client
        .get_ticker()
        .pairs(["XBTUSD"])
        .send()
        .await
        .expect("ticker");
    let ticker = tickers.values().next().expect("one ticker");
    assert!(ticker.ask_price() >= ticker.bid_price());

    let books = client
        .get_orderbook()
        .pair("XBTUSD")
        .count(10)
        .enqueue()
        .timeout(Duration::from_secs(10))
        .await
        .expect("depth");
    let book = books.values().next().expect("one book");
    assert!(book.asks.len() <= 10);
    assert!(book.spread().expect("both sides") >= rust_decimal::Decimal::ZERO);
}

/// Unknown pairs come back as exchange errors
#[tokio::test]
#[ignore = "Makes real HTTP call"]
async fn test_live_unknown_pair() {
    let client = KrakenRestClient::new().expect("client");

    let err = client
        .get_ticker()
        .pairs(["NOTAPAIR"])
        .send()
        .await
        .unwrap_err();

    assert!(err.api_error().is_some(), "unexpected error: {}", err);
}
