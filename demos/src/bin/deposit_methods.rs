//! Demo 2: Deposit Methods
//!
//! Showcases: Private endpoints, environment configuration, error codes
//!
//! Run: KRAKEN_API_KEY=... KRAKEN_PRIVATE_KEY=... cargo run --bin deposit_methods -- ETH

use colored::*;
use kraken_rest::{ClientConfig, KrakenRestClient};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let asset = std::env::args().nth(1).unwrap_or_else(|| "XBT".to_string());

    println!("{}", "═".repeat(60).cyan());
    println!("{}", "  DEPOSIT METHODS".cyan().bold());
    println!("{}", "  Kraken REST Client Demo - Private Endpoints".cyan());
    println!("{}", "═".repeat(60).cyan());
    println!();

    let client = KrakenRestClient::with_config(ClientConfig::from_env()?)?;
    if !client.has_credentials() {
        println!("{} Set KRAKEN_API_KEY and KRAKEN_PRIVATE_KEY first", "✗".red());
        return Ok(());
    }

    match client.get_deposit_methods().asset(&asset).send().await {
        Ok(methods) => {
            println!("{} {} method(s) for {}\n", "✓".green(), methods.len(), asset.yellow());
            for method in methods {
                let fee = method.fee.map(|f| f.to_string()).unwrap_or_else(|| "-".into());
                println!(
                    "  {:<28} limit {:<12} fee {:<14} new addresses: {}",
                    method.method.cyan(),
                    method.limit.to_string(),
                    fee,
                    if method.gen_address { "yes".green() } else { "no".red() }
                );
            }
        }
        Err(e) => {
            println!("{} {}", "✗".red(), e);
            if let Some(api) = e.api_error() {
                for error in api.errors() {
                    println!("  {} {:?}", "•".red(), error.recovery_strategy());
                }
            }
        }
    }

    Ok(())
}
