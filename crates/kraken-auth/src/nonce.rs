//! Nonce generation for private requests
//!
//! Kraken rejects a private call whose nonce is not greater than the last
//! nonce it accepted for the same API key. Nonces are microseconds since the
//! Unix epoch, bumped past the previous value when the clock has not moved
//! (or moved backwards) between two calls.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Source of nonces for one API key
pub trait NonceProvider: Send + Sync + fmt::Debug {
    /// Return a nonce strictly greater than every nonce previously returned
    fn next_nonce(&self) -> u64;
}

/// Clock-based nonce that never repeats or goes backwards
#[derive(Debug, Default)]
pub struct IncreasingNonce {
    last: AtomicU64,
}

impl IncreasingNonce {
    /// Create a new nonce source
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a nonce source whose first nonce is greater than `last`
    ///
    /// Useful when a key was previously used with a nonce scheme that ran
    /// ahead of the wall clock.
    pub fn after(last: u64) -> Self {
        Self {
            last: AtomicU64::new(last),
        }
    }

    fn now_micros() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(micros)
            .unwrap_or(0)
    }
}

impl NonceProvider for IncreasingNonce {
    fn next_nonce(&self) -> u64 {
        let now = Self::now_micros();
        let previous = match self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last.saturating_add(1)))
            }) {
            Ok(previous) | Err(previous) => previous,
        };
        now.max(previous.saturating_add(1))
    }
}

/// Whole microseconds in `elapsed`, saturating at `u64::MAX`
fn micros(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX)
}
