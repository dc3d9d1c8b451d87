//! Error types for authentication operations

/// Errors that can occur while loading credentials or signing requests
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// API key or secret is malformed
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// Signature could not be computed
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Environment variable not set
    #[error("Environment variable not set: {0}")]
    EnvVarNotSet(String),
}

/// Result type for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AuthError::EnvVarNotSet("KRAKEN_API_KEY".to_string());
        assert!(err.to_string().contains("KRAKEN_API_KEY"));

        let err = AuthError::InvalidCredentials("empty secret".to_string());
        assert_eq!(err.to_string(), "Invalid credentials: empty secret");
    }
}
