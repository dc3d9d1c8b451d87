//! Demo 3: Burst Throttling
//!
//! Showcases: Client-side call counter, first come first served pacing
//!
//! Run: cargo run --bin burst_throttle

use colored::*;
use kraken_rest::{ClientConfig, KrakenRestClient, Tier};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

const CALLS: usize = 20;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("{}", "═".repeat(60).cyan());
    println!("{}", "  BURST THROTTLING".cyan().bold());
    println!("{}", "  Kraken REST Client Demo - Call Counter".cyan());
    println!("{}", "═".repeat(60).cyan());
    println!();

    let client = KrakenRestClient::with_config(ClientConfig::new().with_tier(Tier::Starter))?;
    let counter = client.call_counter().ok_or("throttling disabled")?;

    println!(
        "{} Sending {} calls against a ceiling of {}\n",
        "✓".green(),
        CALLS,
        counter.ceiling()
    );

    let start = Instant::now();
    let handles: Vec<_> = (0..CALLS)
        .map(|_| client.get_server_time().enqueue())
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let outcome = match handle.await {
            Ok(time) => format!("unixtime {}", time.unixtime).green(),
            Err(e) => e.to_string().red(),
        };
        println!(
            "  #{:<3} {:>6.2}s  level {:>5.2}  {}",
            i + 1,
            start.elapsed().as_secs_f64(),
            counter.level(),
            outcome
        );
    }

    Ok(())
}
