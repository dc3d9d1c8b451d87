//! Shared API call counter for one client
//!
//! Wraps [`CallBudget`] for concurrent use. All mutation of the budget goes
//! through one reservation step under a mutex, so two callers can never both
//! see room under the ceiling and jointly overshoot it.
//!
//! # Fairness
//!
//! Waiters are served first-come, first-served: [`CallCounter::acquire`]
//! queues on a fair async mutex before reserving, and the head of the queue
//! sleeps until its own weight fits. A cheap call enqueued later therefore
//! never overtakes an expensive call enqueued earlier.
//!
//! # Cancellation
//!
//! Weight is added only at the instant a reservation is granted. A call
//! cancelled while it waits has consumed nothing; a call cancelled after the
//! grant keeps its weight charged, since the request may already have reached
//! the exchange.

use kraken_types::{CallBudget, CallBudgetConfig, Reservation, Tier};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant as StdInstant};
use tokio::time::Instant;
use tracing::{debug, instrument};

use crate::error::{RestError, RestResult};

/// Thread-safe decaying call counter
#[derive(Debug)]
pub struct CallCounter {
    budget: Mutex<CallBudget>,
    queue: tokio::sync::Mutex<()>,
}

impl CallCounter {
    /// Create a counter with the given limits
    pub fn new(config: CallBudgetConfig) -> Self {
        Self {
            budget: Mutex::new(CallBudget::new(config, now())),
            queue: tokio::sync::Mutex::new(()),
        }
    }

    /// Create a counter with the limits of a Kraken tier
    pub fn for_tier(tier: Tier) -> Self {
        Self::new(tier.config())
    }

    /// Try to reserve `weight` without waiting
    ///
    /// This bypasses the waiter queue; use [`acquire`](Self::acquire) to wait
    /// in line.
    pub fn reserve(&self, weight: u32) -> Reservation {
        self.budget.lock().reserve_at(weight, now())
    }

    /// Wait until `weight` fits under the ceiling, then reserve it
    ///
    /// Returns how long the call waited.
    pub async fn acquire(&self, weight: u32) -> Duration {
        let started = Instant::now();
        let _turn = self.queue.lock().await;
        match self.wait_for_grant(weight, started, None).await {
            Ok(waited) | Err(waited) => waited,
        }
    }

    /// Like [`acquire`](Self::acquire), but give up once `bound` has elapsed
    ///
    /// Fails early, without waiting out the bound, when the counter cannot
    /// decay far enough before the deadline.
    #[instrument(skip(self), level = "debug")]
    pub async fn acquire_within(&self, weight: u32, bound: Option<Duration>) -> RestResult<Duration> {
        let Some(bound) = bound else {
            return Ok(self.acquire(weight).await);
        };

        let started = Instant::now();
        // A bound past the end of the clock is no bound at all
        let Some(deadline) = started.checked_add(bound) else {
            return Ok(self.acquire(weight).await);
        };
        let _turn = tokio::time::timeout_at(deadline, self.queue.lock())
            .await
            .map_err(|_| RestError::ThrottleTimeout {
                bound,
                waited: started.elapsed(),
            })?;

        self.wait_for_grant(weight, started, Some(deadline))
            .await
            .map_err(|waited| RestError::ThrottleTimeout { bound, waited })
    }

    async fn wait_for_grant(
        &self,
        weight: u32,
        started: Instant,
        deadline: Option<Instant>,
    ) -> Result<Duration, Duration> {
        loop {
            let current = Instant::now();
            let reservation = self.budget.lock().reserve_at(weight, current.into_std());

            match reservation {
                Reservation::Granted => return Ok(current.duration_since(started)),
                Reservation::WaitUntil(at) => {
                    let at = Instant::from_std(at);
                    if deadline.is_some_and(|deadline| at > deadline) {
                        return Err(current.duration_since(started));
                    }
                    let wait_ms = at.duration_since(current).as_millis() as u64;
                    debug!(weight, wait_ms, "Call budget exhausted, waiting");
                    tokio::time::sleep_until(at).await;
                }
            }
        }
    }

    /// Current counter level
    pub fn level(&self) -> f64 {
        self.budget.lock().level_at(now())
    }

    /// Counter ceiling
    pub fn ceiling(&self) -> u32 {
        self.budget.lock().ceiling()
    }

    /// Fraction of the ceiling in use (0.0 to 1.0)
    pub fn utilization(&self) -> f64 {
        self.budget.lock().utilization_at(now())
    }

    /// Drop the counter back to zero
    pub fn reset(&self) {
        self.budget.lock().reset(now());
    }
}

impl Default for CallCounter {
    fn default() -> Self {
        Self::for_tier(Tier::default())
    }
}

/// Call counter shared by every request of one client
pub type SharedCallCounter = Arc<CallCounter>;

// tokio's clock, so a paused test runtime drives the budget too
fn now() -> StdInstant {
    Instant::now().into_std()
}
