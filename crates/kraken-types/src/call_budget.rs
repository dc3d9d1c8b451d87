//! Kraken's API call counter, modelled client-side
//!
//! Every private REST call adds its weight to a per-account counter. The
//! counter decays linearly toward zero, and a call is refused by the exchange
//! when the counter would exceed the tier's ceiling. [`CallBudget`] mirrors
//! that counter locally so calls can be held back before the exchange rejects
//! them with `EAPI:Rate limit exceeded`.
//!
//! The budget takes the current time as an argument instead of reading a
//! clock, which keeps it deterministic under test and lets the async wrapper
//! in `kraken-rest` drive it with tokio's (pausable) clock.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

/// Slack applied when comparing the decayed level against the ceiling
const LEVEL_EPSILON: f64 = 1e-9;

/// Lowest decay rate accepted; a budget that never decays would deny forever
const MIN_DECAY_PER_SEC: f64 = 1e-3;

/// Kraken verification tier, which determines the call counter limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Max 15, decays by 0.33 per second
    #[default]
    Starter,
    /// Max 20, decays by 0.5 per second
    Intermediate,
    /// Max 20, decays by 1 per second
    Pro,
}

impl Tier {
    /// Budget configuration documented by Kraken for this tier
    pub fn config(self) -> CallBudgetConfig {
        match self {
            Self::Starter => CallBudgetConfig::new(15, 0.33),
            Self::Intermediate => CallBudgetConfig::new(20, 0.5),
            Self::Pro => CallBudgetConfig::new(20, 1.0),
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Starter => write!(f, "starter"),
            Self::Intermediate => write!(f, "intermediate"),
            Self::Pro => write!(f, "pro"),
        }
    }
}

/// Error returned when a tier name is not recognised
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown tier: {0} (expected starter, intermediate or pro)")]
pub struct ParseTierError(pub String);

impl FromStr for Tier {
    type Err = ParseTierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "starter" => Ok(Self::Starter),
            "intermediate" => Ok(Self::Intermediate),
            "pro" => Ok(Self::Pro),
            other => Err(ParseTierError(other.to_string())),
        }
    }
}

/// Limits for a single call budget
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CallBudgetConfig {
    /// Highest counter value a granted call may reach
    pub ceiling: u32,
    /// Counter units removed per second
    pub decay_per_sec: f64,
}

impl CallBudgetConfig {
    /// Create a new budget configuration
    pub const fn new(ceiling: u32, decay_per_sec: f64) -> Self {
        Self {
            ceiling,
            decay_per_sec,
        }
    }

    fn decay_rate(&self) -> f64 {
        self.decay_per_sec.max(MIN_DECAY_PER_SEC)
    }
}

impl Default for CallBudgetConfig {
    fn default() -> Self {
        Tier::default().config()
    }
}

/// Outcome of a reservation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reservation {
    /// The weight was added to the counter
    Granted,
    /// Nothing was added; the weight fits once the counter has decayed to this point
    WaitUntil(Instant),
}

impl Reservation {
    /// Check if the reservation was granted
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }

    /// Time to wait from `now`, if the reservation was not granted
    pub fn wait_from(&self, now: Instant) -> Option<Duration> {
        match self {
            Self::Granted => None,
            Self::WaitUntil(at) => Some(at.saturating_duration_since(now)),
        }
    }
}

/// Decaying call counter
///
/// Starts at zero. Each granted call adds its weight; the level then decays
/// linearly toward zero. A call is granted only if `level + weight <= ceiling`.
/// Weights above the ceiling are clamped to it so that every call is
/// eventually grantable.
#[derive(Debug, Clone)]
pub struct CallBudget {
    config: CallBudgetConfig,
    level: f64,
    last_decay: Instant,
}

impl CallBudget {
    /// Create an empty budget anchored at `now`
    pub fn new(config: CallBudgetConfig, now: Instant) -> Self {
        Self {
            config,
            level: 0.0,
            last_decay: now,
        }
    }

    /// Configuration of this budget
    pub fn config(&self) -> CallBudgetConfig {
        self.config
    }

    /// Ceiling of this budget
    pub fn ceiling(&self) -> u32 {
        self.config.ceiling
    }

    /// Weight actually charged for a call of `weight`
    pub fn effective_weight(&self, weight: u32) -> u32 {
        weight.min(self.config.ceiling)
    }

    /// Current counter level after decaying up to `now`
    pub fn level_at(&mut self, now: Instant) -> f64 {
        self.decay(now);
        self.level
    }

    /// Try to add `weight` to the counter at time `now`
    pub fn reserve_at(&mut self, weight: u32, now: Instant) -> Reservation {
        self.decay(now);

        let weight = self.effective_weight(weight) as f64;
        let ceiling = self.config.ceiling as f64;

        if self.level + weight <= ceiling + LEVEL_EPSILON {
            self.level += weight;
            Reservation::Granted
        } else {
            let excess = self.level + weight - ceiling;
            let wait = Duration::from_secs_f64(excess / self.config.decay_rate());
            Reservation::WaitUntil(now + wait)
        }
    }

    /// Fraction of the ceiling in use at `now` (0.0 to 1.0)
    pub fn utilization_at(&mut self, now: Instant) -> f64 {
        if self.config.ceiling == 0 {
            return 1.0;
        }
        self.level_at(now) / self.config.ceiling as f64
    }

    /// Drop the counter back to zero
    pub fn reset(&mut self, now: Instant) {
        self.level = 0.0;
        self.last_decay = now;
    }

    fn decay(&mut self, now: Instant) {
        // Out-of-order timestamps from racing callers must not push the anchor backwards
        if now <= self.last_decay {
            return;
        }
        let elapsed = now.duration_since(self.last_decay).as_secs_f64();
        self.level = (self.level - elapsed * self.config.decay_rate()).max(0.0);
        self.last_decay = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn budget(ceiling: u32, decay: f64) -> (CallBudget, Instant) {
        let start = Instant::now();
        (CallBudget::new(CallBudgetConfig::new(ceiling, decay), start), start)
    }

    #[test]
    fn test_tier_configs() {
        assert_eq!(Tier::Starter.config().ceiling, 15);
        assert_eq!(Tier::Intermediate.config().ceiling, 20);
        assert_eq!(Tier::Pro.config().decay_per_sec, 1.0);
        assert_eq!(CallBudgetConfig::default(), Tier::Starter.config());
    }

    #[test]
    fn test_tier_from_str() {
        assert_eq!("Pro".parse::<Tier>(), Ok(Tier::Pro));
        assert_eq!(" intermediate ".parse::<Tier>(), Ok(Tier::Intermediate));
        assert!("gold".parse::<Tier>().is_err());
        assert_eq!(Tier::Starter.to_string(), "starter");
    }

    #[test]
    fn test_tier_serde() {
        let tier: Tier = serde_json::from_str("\"pro\"").unwrap();
        assert_eq!(tier, Tier::Pro);
    }

    #[test]
    fn test_grants_until_ceiling() {
        let (mut budget, now) = budget(15, 0.33);

        for _ in 0..15 {
            assert!(budget.reserve_at(1, now).is_granted());
        }
        assert_eq!(budget.level_at(now), 15.0);

        let result = budget.reserve_at(1, now);
        assert!(!result.is_granted());
    }

    #[test]
    fn test_denied_reservation_adds_nothing() {
        let (mut budget, now) = budget(10, 1.0);

        assert!(budget.reserve_at(8, now).is_granted());
        assert!(!budget.reserve_at(5, now).is_granted());
        assert_eq!(budget.level_at(now), 8.0);
    }

    #[test]
    fn test_wait_time_matches_decay() {
        let (mut budget, now) = budget(10, 2.0);

        assert!(budget.reserve_at(10, now).is_granted());

        // Needs 3 units to decay at 2/s
        let result = budget.reserve_at(3, now);
        assert_eq!(result.wait_from(now), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_granted_after_decay() {
        let (mut budget, now) = budget(10, 2.0);

        assert!(budget.reserve_at(10, now).is_granted());
        let Reservation::WaitUntil(at) = budget.reserve_at(3, now) else {
            panic!("expected a wait");
        };

        assert!(budget.reserve_at(3, at).is_granted());
        assert!((budget.level_at(at) - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_level_never_below_zero() {
        let (mut budget, now) = budget(10, 1.0);

        budget.reserve_at(2, now);
        assert_eq!(budget.level_at(now + Duration::from_secs(60)), 0.0);
    }

    #[test]
    fn test_oversized_weight_is_clamped() {
        let (mut budget, now) = budget(5, 1.0);

        assert_eq!(budget.effective_weight(50), 5);
        assert!(budget.reserve_at(50, now).is_granted());
        assert_eq!(budget.level_at(now), 5.0);

        // Eventually grantable again
        assert!(budget.reserve_at(50, now + Duration::from_secs(5)).is_granted());
    }

    #[test]
    fn test_earlier_timestamp_does_not_rewind() {
        let (mut budget, now) = budget(10, 1.0);

        budget.reserve_at(10, now + Duration::from_secs(2));
        assert_eq!(budget.level_at(now), 10.0);
    }

    #[test]
    fn test_zero_decay_still_drains() {
        let (mut budget, now) = budget(1, 0.0);

        budget.reserve_at(1, now);
        let wait = budget.reserve_at(1, now).wait_from(now).unwrap();
        assert!(wait > Duration::ZERO);
        assert!(budget.reserve_at(1, now + wait).is_granted());
    }

    #[test]
    fn test_utilization_and_reset() {
        let (mut budget, now) = budget(20, 1.0);

        budget.reserve_at(10, now);
        assert!((budget.utilization_at(now) - 0.5).abs() < 1e-9);

        budget.reset(now);
        assert_eq!(budget.utilization_at(now), 0.0);
    }
}
