//! Error types for REST API operations

use kraken_auth::AuthError;
use kraken_types::error_codes::{KrakenApiError, RecoveryStrategy};
use std::fmt;
use std::time::Duration;

use crate::transport::TransportError;

/// Errors that can occur during REST API operations
#[derive(Debug, thiserror::Error)]
pub enum RestError {
    /// Credentials could not be loaded or the request could not be signed
    #[error("Signing error: {0}")]
    Signing(#[from] AuthError),

    /// Missing API credentials for private endpoint
    #[error("Authentication required for this endpoint")]
    AuthRequired,

    /// Call budget did not free up within the caller's bound
    #[error("Call budget not available within {bound:?} (waited {waited:?})")]
    ThrottleTimeout {
        /// Bound set on the request
        bound: Duration,
        /// Time spent waiting before giving up
        waited: Duration,
    },

    /// Network or HTTP failure
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The exchange answered with one or more errors
    #[error("API error: {0}")]
    Api(ApiError),

    /// Response result does not match the endpoint's declared type
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Caller-supplied bound on the request handle elapsed
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Request was cancelled before it completed
    #[error("Request cancelled")]
    Cancelled,

    /// Invalid request parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Invalid client configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl RestError {
    /// Create an API error from error strings returned by Kraken
    pub fn from_api_errors(errors: Vec<String>) -> Self {
        Self::Api(ApiError::new(errors))
    }

    /// Get the recovery strategy for this error
    pub fn recovery_strategy(&self) -> RecoveryStrategy {
        match self {
            Self::Api(error) => error.recovery_strategy(),
            Self::ThrottleTimeout { bound, .. } => {
                let bound_ms = u64::try_from(bound.as_millis()).unwrap_or(u64::MAX);
                RecoveryStrategy::Backoff {
                    initial_ms: bound_ms,
                    max_ms: bound_ms.saturating_mul(4),
                    multiplier: 2,
                }
            }
            Self::Transport(TransportError::Timeout | TransportError::Connection(_))
            | Self::Timeout(_) => RecoveryStrategy::Retry {
                max_attempts: 3,
                delay_ms: 1000,
            },
            Self::Transport(TransportError::Status { status, .. }) if *status >= 500 => {
                RecoveryStrategy::service_retry()
            }
            Self::Transport(_) | Self::Cancelled => RecoveryStrategy::Manual,
            Self::Signing(_)
            | Self::AuthRequired
            | Self::Deserialization(_)
            | Self::InvalidParameter(_)
            | Self::Config(_) => RecoveryStrategy::Fatal,
        }
    }

    /// Check if this error is retryable
    ///
    /// Nothing in this crate retries on its own; this is input for the
    /// caller's retry policy.
    pub fn is_retryable(&self) -> bool {
        self.recovery_strategy().allows_retry()
    }

    /// Check if this error indicates rate limiting, local or remote
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::ThrottleTimeout { .. })
            || matches!(self, Self::Api(error) if error.is_rate_limit())
    }

    /// The exchange errors, if this is an API error
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api(error) => Some(error),
            _ => None,
        }
    }
}

/// Every error string the exchange returned for one call
///
/// Kraken may report several errors at once; all of them are kept, in server
/// order, so callers can tell a transient failure from a permanent one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    errors: Vec<KrakenApiError>,
}

impl ApiError {
    /// Parse the raw `error` array
    pub fn new(errors: Vec<String>) -> Self {
        Self {
            errors: KrakenApiError::parse_many(&errors),
        }
    }

    /// Parsed errors in server order
    pub fn errors(&self) -> &[KrakenApiError] {
        &self.errors
    }

    /// Raw error strings in server order
    pub fn messages(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.raw.as_str()).collect()
    }

    /// First error reported
    pub fn first(&self) -> Option<&KrakenApiError> {
        self.errors.first()
    }

    /// Check if any of the errors is a rate limit
    pub fn is_rate_limit(&self) -> bool {
        self.errors.iter().any(KrakenApiError::is_rate_limit)
    }

    /// Check if any of the errors cannot be fixed by resending
    pub fn is_fatal(&self) -> bool {
        self.errors.iter().any(KrakenApiError::is_fatal)
    }

    /// Strategy for the whole response
    ///
    /// A rate limit anywhere in the list wins, since resending before the
    /// counter decays fails regardless of the other errors.
    pub fn recovery_strategy(&self) -> RecoveryStrategy {
        if let Some(limited) = self.errors.iter().find(|e| e.is_rate_limit()) {
            return limited.recovery_strategy();
        }
        self.first()
            .map(KrakenApiError::recovery_strategy)
            .unwrap_or_default()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.messages().join(", "))
    }
}

impl std::error::Error for ApiError {}

/// Result type for REST operations
pub type RestResult<T> = Result<T, RestError>;

#[cfg(test)]
mod tests {
    use super::*;
    use kraken_types::KrakenErrorCode;

    #[test]
    fn test_parse_api_error() {
        let err = RestError::from_api_errors(vec!["EAPI:Rate limit exceeded".to_string()]);
        assert!(err.is_rate_limited());
        assert!(err.is_retryable());
    }

    #[test]
    fn test_api_error_keeps_all_codes() {
        let err = RestError::from_api_errors(vec![
            "EGeneral:Invalid arguments".to_string(),
            "EAPI:Rate limit exceeded".to_string(),
        ]);
        let api = err.api_error().unwrap();

        assert_eq!(api.errors().len(), 2);
        assert_eq!(api.first().unwrap().code, Some(KrakenErrorCode::InvalidArguments));
        assert_eq!(
            api.messages(),
            ["EGeneral:Invalid arguments", "EAPI:Rate limit exceeded"]
        );
        assert_eq!(
            err.to_string(),
            "API error: EGeneral:Invalid arguments, EAPI:Rate limit exceeded"
        );

        // The rate limit later in the list still counts
        assert!(api.is_rate_limit());
        assert!(api.is_fatal());
        assert_eq!(api.recovery_strategy(), RecoveryStrategy::rate_limit_backoff());
    }

    #[test]
    fn test_recovery_strategies() {
        let throttled = RestError::ThrottleTimeout {
            bound: Duration::from_secs(1),
            waited: Duration::ZERO,
        };
        assert!(throttled.is_retryable());
        assert!(throttled.is_rate_limited());

        assert!(!RestError::AuthRequired.is_retryable());
        assert!(!RestError::Deserialization("bad".into()).is_retryable());
        assert!(RestError::Transport(TransportError::Timeout).is_retryable());
        assert!(RestError::Transport(TransportError::Status {
            status: 503,
            body: String::new()
        })
        .is_retryable());
        assert!(!RestError::Transport(TransportError::MalformedBody("x".into())).is_retryable());
    }

    #[test]
    fn test_throttle_backoff_saturates() {
        let huge = RestError::ThrottleTimeout {
            bound: Duration::from_millis(u64::MAX / 2),
            waited: Duration::ZERO,
        };
        assert_eq!(
            huge.recovery_strategy(),
            RecoveryStrategy::Backoff {
                initial_ms: u64::MAX / 2,
                max_ms: u64::MAX,
                multiplier: 2,
            }
        );

        let unbounded = RestError::ThrottleTimeout {
            bound: Duration::MAX,
            waited: Duration::ZERO,
        };
        assert!(unbounded.is_retryable());
        assert!(matches!(
            unbounded.recovery_strategy(),
            RecoveryStrategy::Backoff { initial_ms: u64::MAX, max_ms: u64::MAX, .. }
        ));
    }

    #[test]
    fn test_auth_error_converts() {
        let err: RestError = AuthError::InvalidCredentials("bad secret".into()).into();
        assert!(matches!(err, RestError::Signing(_)));
        assert!(!err.is_retryable());
    }
}
