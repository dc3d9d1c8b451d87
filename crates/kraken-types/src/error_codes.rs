//! Kraken REST error strings mapped to codes and recovery strategies
//!
//! Kraken reports failures as an `error` array of strings shaped like
//! `"EService:Unavailable"` or `"EGeneral:Invalid arguments:volume"`. This
//! module parses each string into a [`KrakenApiError`] so callers can tell
//! transient failures (rate limits, busy service) from permanent ones
//! (invalid arguments, permission denied) without string matching.

use std::fmt;
use std::time::Duration;

/// What a caller can do about an error
///
/// The SDK never acts on this by itself; it is advice for caller-side retry
/// policies.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RecoveryStrategy {
    /// Exponential backoff before retry
    Backoff {
        initial_ms: u64,
        max_ms: u64,
        multiplier: u32,
    },
    /// Fixed delay retry
    Retry { delay_ms: u64, max_attempts: u32 },
    /// Resend with a fresh nonce (the rejected one can never succeed)
    RefreshNonce,
    /// Requires user intervention (e.g. add funds, fix key permissions)
    UserAction { message: &'static str },
    /// The request itself is wrong; resending it unchanged will fail again
    Fatal,
    /// Manual investigation needed
    #[default]
    Manual,
}

impl RecoveryStrategy {
    /// Default exponential backoff for rate limits
    pub fn rate_limit_backoff() -> Self {
        Self::Backoff {
            initial_ms: 1000,
            max_ms: 60000,
            multiplier: 2,
        }
    }

    /// Default retry for transient service errors
    pub fn service_retry() -> Self {
        Self::Retry {
            delay_ms: 5000,
            max_attempts: 3,
        }
    }

    /// Get the initial delay duration
    pub fn initial_delay(&self) -> Option<Duration> {
        match self {
            Self::Backoff { initial_ms, .. } => Some(Duration::from_millis(*initial_ms)),
            Self::Retry { delay_ms, .. } => Some(Duration::from_millis(*delay_ms)),
            _ => None,
        }
    }

    /// Check if this strategy allows retry
    pub fn allows_retry(&self) -> bool {
        matches!(
            self,
            Self::Backoff { .. } | Self::Retry { .. } | Self::RefreshNonce
        )
    }
}

/// Kraken error categories (the `E...` prefix)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// EAPI:* - authentication and request-level issues
    Api,
    /// EGeneral:* - argument and permission errors
    General,
    /// EService:* - exchange availability
    Service,
    /// EOrder:* - order placement
    Order,
    /// EFunding:* - deposits and withdrawals
    Funding,
    /// EQuery:* - lookups
    Query,
    /// ETrade:* - trade and position lookups
    Trade,
    /// Anything else
    Unknown,
}

impl ErrorCategory {
    fn from_prefix(prefix: &str) -> Self {
        match prefix {
            "EAPI" => Self::Api,
            "EGeneral" => Self::General,
            "EService" => Self::Service,
            "EOrder" => Self::Order,
            "EFunding" => Self::Funding,
            "EQuery" => Self::Query,
            "ETrade" => Self::Trade,
            _ => Self::Unknown,
        }
    }
}

/// One parsed Kraken error string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KrakenApiError {
    /// The original error string from Kraken
    pub raw: String,
    /// Parsed error code (if recognized)
    pub code: Option<KrakenErrorCode>,
    /// Error category
    pub category: ErrorCategory,
    /// Message part after the category prefix
    pub message: String,
}

impl KrakenApiError {
    /// Parse a Kraken error string into a structured error
    pub fn parse(error: &str) -> Self {
        let (category, message) = match error.split_once(':') {
            Some((prefix, rest)) => (ErrorCategory::from_prefix(prefix), rest.trim().to_string()),
            None => (ErrorCategory::Unknown, error.to_string()),
        };

        Self {
            raw: error.to_string(),
            code: KrakenErrorCode::from_error(error),
            category,
            message,
        }
    }

    /// Parse every entry of an `error` array, keeping server order
    pub fn parse_many<S: AsRef<str>>(errors: &[S]) -> Vec<Self> {
        errors.iter().map(|e| Self::parse(e.as_ref())).collect()
    }

    /// Get the recovery strategy for this error
    pub fn recovery_strategy(&self) -> RecoveryStrategy {
        self.code
            .map(|c| c.recovery_strategy())
            .unwrap_or(RecoveryStrategy::Manual)
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        self.recovery_strategy().allows_retry()
    }

    /// Check if this is a rate limit error
    pub fn is_rate_limit(&self) -> bool {
        self.code.is_some_and(|c| c.is_rate_limit())
    }

    /// Check if the exchange rejected the authentication of the call
    pub fn is_auth_error(&self) -> bool {
        self.code.is_some_and(|c| c.is_auth_error())
    }

    /// Check if this is a fatal error that cannot be recovered
    pub fn is_fatal(&self) -> bool {
        matches!(self.recovery_strategy(), RecoveryStrategy::Fatal)
    }
}

impl fmt::Display for KrakenApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Known Kraken REST error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KrakenErrorCode {
    // EAPI
    RateLimitExceeded,
    InvalidKey,
    InvalidSignature,
    InvalidNonce,
    BadRequest,
    FeatureDisabled,

    // EGeneral
    InvalidArguments,
    PermissionDenied,
    UnknownAssetPair,
    UnknownAsset,
    TooManyRequests,
    TemporaryLockout,
    UnknownMethod,
    InternalError,

    // EService
    ServiceUnavailable,
    ServiceBusy,
    MarketCancelOnly,
    MarketPostOnly,
    DeadlineElapsed,

    // EOrder
    InsufficientFunds,
    InsufficientMargin,
    OrderMinimumNotMet,
    OrdersLimitExceeded,
    OrderRateLimitExceeded,
    UnknownOrder,
    InvalidPrice,
    MarketClosed,

    // EFunding
    UnknownWithdrawKey,
    InvalidFundingAmount,
    UnknownFundingAsset,
    FundingTooSmall,
    FundingTooLarge,

    // EQuery / ETrade
    QueryUnknownAssetPair,
    TradeUnknownPosition,
}

impl KrakenErrorCode {
    /// Map a Kraken error string to a known code
    ///
    /// Kraken appends detail to some messages (`EGeneral:Invalid
    /// arguments:volume`), so matching is on the `prefix:message` head.
    pub fn from_error(error: &str) -> Option<Self> {
        let head = match error.match_indices(':').nth(1) {
            Some((idx, _)) => &error[..idx],
            None => error,
        };

        let code = match head {
            "EAPI:Rate limit exceeded" => Self::RateLimitExceeded,
            "EAPI:Invalid key" => Self::InvalidKey,
            "EAPI:Invalid signature" => Self::InvalidSignature,
            "EAPI:Invalid nonce" => Self::InvalidNonce,
            "EAPI:Bad request" => Self::BadRequest,
            "EAPI:Feature disabled" => Self::FeatureDisabled,

            "EGeneral:Invalid arguments" => Self::InvalidArguments,
            "EGeneral:Permission denied" => Self::PermissionDenied,
            "EGeneral:Unknown asset pair" => Self::UnknownAssetPair,
            "EGeneral:Unknown asset" => Self::UnknownAsset,
            "EGeneral:Too many requests" => Self::TooManyRequests,
            "EGeneral:Temporary lockout" => Self::TemporaryLockout,
            "EGeneral:Unknown method" => Self::UnknownMethod,
            "EGeneral:Internal error" => Self::InternalError,

            "EService:Unavailable" => Self::ServiceUnavailable,
            "EService:Busy" => Self::ServiceBusy,
            "EService:Market in cancel_only mode" => Self::MarketCancelOnly,
            "EService:Market in post_only mode" => Self::MarketPostOnly,
            "EService:Deadline elapsed" => Self::DeadlineElapsed,

            "EOrder:Insufficient funds" => Self::InsufficientFunds,
            "EOrder:Insufficient margin" => Self::InsufficientMargin,
            "EOrder:Order minimum not met" => Self::OrderMinimumNotMet,
            "EOrder:Orders limit exceeded" => Self::OrdersLimitExceeded,
            "EOrder:Rate limit exceeded" => Self::OrderRateLimitExceeded,
            "EOrder:Unknown order" => Self::UnknownOrder,
            "EOrder:Invalid price" => Self::InvalidPrice,
            "EOrder:Market is closed" => Self::MarketClosed,

            "EFunding:Unknown withdraw key" => Self::UnknownWithdrawKey,
            "EFunding:Invalid amount" => Self::InvalidFundingAmount,
            "EFunding:Unknown asset" => Self::UnknownFundingAsset,
            "EFunding:Too small" => Self::FundingTooSmall,
            "EFunding:Too large" => Self::FundingTooLarge,

            "EQuery:Unknown asset pair" => Self::QueryUnknownAssetPair,
            "ETrade:Unknown position" => Self::TradeUnknownPosition,

            _ => {
                let normalized = error.to_lowercase();
                if normalized.contains("rate limit") {
                    Self::RateLimitExceeded
                } else if normalized.contains("invalid nonce") {
                    Self::InvalidNonce
                } else if normalized.contains("invalid signature") {
                    Self::InvalidSignature
                } else if normalized.contains("invalid key") {
                    Self::InvalidKey
                } else if normalized.contains("unavailable") {
                    Self::ServiceUnavailable
                } else if normalized.contains("lockout") {
                    Self::TemporaryLockout
                } else {
                    return None;
                }
            }
        };

        Some(code)
    }

    /// Get the recovery strategy for this error code
    pub fn recovery_strategy(&self) -> RecoveryStrategy {
        match self {
            Self::RateLimitExceeded | Self::TooManyRequests | Self::OrderRateLimitExceeded => {
                RecoveryStrategy::rate_limit_backoff()
            }
            Self::TemporaryLockout => RecoveryStrategy::Backoff {
                initial_ms: 60000,
                max_ms: 900000,
                multiplier: 2,
            },

            // A stale nonce is fixed by signing again, not by waiting
            Self::InvalidNonce => RecoveryStrategy::RefreshNonce,

            Self::ServiceUnavailable | Self::ServiceBusy => RecoveryStrategy::service_retry(),
            Self::DeadlineElapsed => RecoveryStrategy::Retry {
                delay_ms: 1000,
                max_attempts: 5,
            },

            Self::InvalidKey | Self::InvalidSignature => RecoveryStrategy::UserAction {
                message: "API key or secret rejected - check credentials",
            },
            Self::PermissionDenied | Self::FeatureDisabled => RecoveryStrategy::UserAction {
                message: "API key lacks permission for this endpoint",
            },
            Self::InsufficientFunds | Self::InsufficientMargin => RecoveryStrategy::UserAction {
                message: "Insufficient funds or margin",
            },
            Self::OrdersLimitExceeded => RecoveryStrategy::UserAction {
                message: "Too many open orders - close some first",
            },
            Self::MarketClosed | Self::MarketCancelOnly | Self::MarketPostOnly => {
                RecoveryStrategy::UserAction {
                    message: "Market is not accepting this kind of order right now",
                }
            }
            Self::UnknownWithdrawKey | Self::UnknownFundingAsset => RecoveryStrategy::UserAction {
                message: "Unknown withdraw key or asset - verify withdrawal settings",
            },
            Self::InvalidFundingAmount | Self::FundingTooSmall | Self::FundingTooLarge => {
                RecoveryStrategy::UserAction {
                    message: "Invalid funding amount - adjust to within limits",
                }
            }

            Self::BadRequest
            | Self::InvalidArguments
            | Self::UnknownAssetPair
            | Self::UnknownAsset
            | Self::UnknownMethod
            | Self::OrderMinimumNotMet
            | Self::UnknownOrder
            | Self::InvalidPrice
            | Self::QueryUnknownAssetPair
            | Self::TradeUnknownPosition => RecoveryStrategy::Fatal,

            Self::InternalError => RecoveryStrategy::Manual,
        }
    }

    /// Check if this is an authentication-related error
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidKey | Self::InvalidSignature | Self::InvalidNonce | Self::PermissionDenied
        )
    }

    /// Check if this is a rate limit error
    pub fn is_rate_limit(&self) -> bool {
        matches!(
            self,
            Self::RateLimitExceeded | Self::TooManyRequests | Self::OrderRateLimitExceeded
        )
    }
}
