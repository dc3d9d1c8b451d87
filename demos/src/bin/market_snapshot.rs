//! Demo 1: Market Snapshot
//!
//! Showcases: Public endpoints, typed results, background dispatch
//!
//! Run: cargo run --bin market_snapshot

use colored::*;
use kraken_rest::KrakenRestClient;
use tracing_subscriber::EnvFilter;

const PAIRS: [&str; 3] = ["XBTUSD", "ETHUSD", "SOLUSD"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("{}", "═".repeat(60).cyan());
    println!("{}", "  MARKET SNAPSHOT".cyan().bold());
    println!("{}", "  Kraken REST Client Demo - Public Endpoints".cyan());
    println!("{}", "═".repeat(60).cyan());
    println!();

    let client = KrakenRestClient::new()?;

    let time = client.get_server_time().send().await?;
    match time.datetime() {
        Some(at) => println!("{} Server time: {}\n", "✓".green(), at),
        None => println!("{} Server time: {}\n", "✓".green(), time.unixtime),
    }

    // Fire all depth requests at once; the call counter paces them
    let books: Vec<_> = PAIRS
        .iter()
        .map(|pair| (*pair, client.get_orderbook().pair(pair).count(5).enqueue()))
        .collect();

    let tickers = client.get_ticker().pairs(PAIRS).send().await?;

    println!(
        "  {:<10} {:>14} {:>14} {:>10}",
        "PAIR".white().bold(),
        "LAST".white().bold(),
        "MID".white().bold(),
        "SPREAD".white().bold()
    );
    println!("  {}", "─".repeat(52));

    let mut names: Vec<_> = tickers.keys().collect();
    names.sort();
    for name in names {
        let ticker = &tickers[name];
        let last = ticker.last_price().map(|p| p.to_string()).unwrap_or_else(|| "-".into());
        let mid = ticker.mid_price().map(|p| p.round_dp(2).to_string()).unwrap_or_else(|| "-".into());
        let spread = ticker
            .spread_bps()
            .map(|bps| format!("{:.2} bp", bps))
            .unwrap_or_else(|| "-".into());
        println!("  {:<10} {:>14} {:>14} {:>10}", name.cyan(), last, mid, spread.yellow());
    }
    println!();

    for (pair, handle) in books {
        match handle.await {
            Ok(books) => {
                for (name, book) in books {
                    println!(
                        "  {} {:<10} bid {} / ask {}",
                        "▸".green(),
                        name,
                        book.best_bid().map(|p| p.to_string()).unwrap_or_default().green(),
                        book.best_ask().map(|p| p.to_string()).unwrap_or_default().red()
                    );
                }
            }
            Err(e) => println!("  {} {}: {}", "✗".red(), pair, e),
        }
    }

    Ok(())
}
