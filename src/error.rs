//! Error types for shielding and rewriting operations.

use thiserror::Error;

/// Result type alias for textangel operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Result type alias for external rewrite service calls.
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// Errors surfaced to callers of the shield, tone and orchestration APIs.
#[derive(Error, Debug)]
pub enum Error {
    /// Shield or application configuration is missing, unparsable or unusable.
    #[error("configuration error: {0}")]
    Config(String),

    /// Caller input was rejected (empty message, unknown tone in strict mode).
    #[error("validation error: {0}")]
    Validation(String),

    /// An external rewrite service failed.
    #[error("rewrite service error: {0}")]
    Service(#[from] ServiceError),

    /// The message journal could not be written.
    #[error("journal error: {0}")]
    Journal(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns true if retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Service(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Returns the retry delay in seconds, if applicable.
    pub fn retry_delay_secs(&self) -> Option<u64> {
        match self {
            Error::Service(e) => e.retry_delay_secs(),
            _ => None,
        }
    }
}

/// Failures at the external rewrite service boundary.
///
/// These are recoverable: a caller can retry or fall back to the local
/// tone engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Credentials were missing or rejected.
    #[error("authentication failed for {backend}: {reason}")]
    Authentication {
        /// Backend name.
        backend: String,
        /// Failure reason.
        reason: String,
    },

    /// Connection could not be established or was dropped.
    #[error("network error: {0}")]
    Network(String),

    /// The call exceeded its time budget.
    #[error("timeout after {0}ms")]
    Timeout(u64),

    /// The service refused the call because of quota or rate limits.
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds to wait before retry.
        retry_after_secs: u64,
    },

    /// The service answered with a non-success status.
    #[error("service returned {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error body or message.
        message: String,
    },

    /// The response could not be understood.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The backend is not usable with the current configuration.
    #[error("service not configured: {0}")]
    NotConfigured(String),
}

impl ServiceError {
    /// Returns true if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            ServiceError::Network(_)
            | ServiceError::Timeout(_)
            | ServiceError::RateLimited { .. } => true,
            ServiceError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns the retry delay in seconds, if applicable.
    pub fn retry_delay_secs(&self) -> Option<u64> {
        match self {
            ServiceError::RateLimited { retry_after_secs } => Some(*retry_after_secs),
            ServiceError::Timeout(_) => Some(5),
            ServiceError::Network(_) => Some(10),
            ServiceError::Api { status, .. } if *status >= 500 => Some(10),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_errors_are_retryable() {
        let err: Error = ServiceError::RateLimited {
            retry_after_secs: 30,
        }
        .into();
        assert!(err.is_retryable());
        assert_eq!(err.retry_delay_secs(), Some(30));

        let err: Error = ServiceError::Authentication {
            backend: "openai".into(),
            reason: "invalid key".into(),
        }
        .into();
        assert!(!err.is_retryable());
        assert_eq!(err.retry_delay_secs(), None);
    }

    #[test]
    fn test_config_errors_are_not_retryable() {
        let err = Error::Config("missing".into());
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("configuration error"));
    }

    #[test]
    fn test_server_side_api_errors_retry() {
        let err = ServiceError::Api {
            status: 503,
            message: "overloaded".into(),
        };
        assert!(err.is_retryable());
        let err = ServiceError::Api {
            status: 400,
            message: "bad request".into(),
        };
        assert!(!err.is_retryable());
    }
}
