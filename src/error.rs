use std::time::Duration;
use thiserror::Error;

/// Comprehensive error categorization for the resilience framework.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Network timeout after {timeout:?}: {message}")]
    NetworkTimeout { timeout: Duration, message: String },

    #[error("Connection refused: {endpoint}")]
    ConnectionRefused { endpoint: String },

    #[error("DNS resolution failed: {hostname}")]
    DnsFailure { hostname: String },

    #[error("Rate limit exceeded: retry after {retry_after:?}")]
    RateLimitExceeded { retry_after: Duration },

    #[error("Invalid input: {field} - {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Authorization denied: {resource}")]
    AuthorizationDenied { resource: String },

    #[error("Service temporarily unavailable: {service} - {reason}")]
    ServiceUnavailable { service: String, reason: String },

    #[error("Internal server error: {0}")]
    InternalServerError(String),

    #[error("Service overloaded: {service}")]
    ServiceOverloaded { service: String },

    #[error("Circuit breaker open for service: {service}")]
    CircuitBreakerOpen { service: String },

    #[error("Circuit breaker half-open, limited requests allowed")]
    CircuitBreakerHalfOpen,

    #[error("Resource exhausted: {resource} - {current}/{limit}")]
    ResourceExhausted {
        resource: String,
        current: u64,
        limit: u64,
    },

    #[error("Timeout error: operation timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("Parse error in {context}: {message}")]
    Parse { context: String, message: String },

    #[error("Service error: {0}")]
    Service(String),

    #[error("Provider error: {0}")]
    Provider(String),

    /// Request failed boundary validation (maps to 4xx, no orchestration started).
    #[error("Validation error: {field} - {reason}")]
    Validation { field: String, reason: String },

    /// An LLM-backed agent failed and no deterministic fallback exists for this step.
    #[error("Agent '{agent}' failed: {reason}")]
    AgentFailure { agent: String, reason: String },

    /// The enclosing request was cancelled (caller disconnect); never surfaced
    /// as a response body, never retried.
    #[error("Request cancelled")]
    Cancelled,
}

/// Error categorization for retry strategies.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorCategory {
    /// Permanent errors - should not retry.
    Permanent,
    /// Transient errors - safe to retry.
    Transient,
    /// Rate limited - retry with backoff.
    RateLimited,
    /// Circuit breaker triggered - stop retrying temporarily.
    CircuitBreaker,
}

impl Error {
    /// Categorize error for retry logic.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_)
            | Error::InvalidInput { .. }
            | Error::AuthenticationFailed(_)
            | Error::AuthorizationDenied { .. }
            | Error::Parse { .. }
            | Error::Validation { .. }
            | Error::Cancelled
            | Error::Serde(_) => ErrorCategory::Permanent,

            Error::RateLimitExceeded { .. } => ErrorCategory::RateLimited,

            Error::CircuitBreakerOpen { .. } | Error::CircuitBreakerHalfOpen => {
                ErrorCategory::CircuitBreaker
            }

            Error::Http(_)
            | Error::NetworkTimeout { .. }
            | Error::ConnectionRefused { .. }
            | Error::DnsFailure { .. }
            | Error::ServiceUnavailable { .. }
            | Error::InternalServerError(_)
            | Error::ServiceOverloaded { .. }
            | Error::Timeout { .. }
            | Error::Io(_) => ErrorCategory::Transient,

            Error::Provider(_) | Error::AgentFailure { .. } => ErrorCategory::Transient,

            Error::ResourceExhausted { .. } | Error::Service(_) => ErrorCategory::Transient,
        }
    }

    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Transient | ErrorCategory::RateLimited
        )
    }

    /// Get suggested retry delay for rate limited errors.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Error::RateLimitExceeded { retry_after } => Some(*retry_after),
            _ => None,
        }
    }

    /// Check if error indicates a need for circuit breaker.
    pub fn should_trigger_circuit_breaker(&self) -> bool {
        matches!(
            self,
            Error::ServiceUnavailable { .. }
                | Error::InternalServerError(_)
                | Error::ServiceOverloaded { .. }
                | Error::NetworkTimeout { .. }
                | Error::ConnectionRefused { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<crate::providers::ProviderError> for Error {
    fn from(err: crate::providers::ProviderError) -> Self {
        match err {
            crate::providers::ProviderError::Network(msg) => {
                Error::Provider(format!("Network error: {msg}"))
            }
            crate::providers::ProviderError::Parse(msg) => Error::Parse {
                context: "provider".to_string(),
                message: msg,
            },
            crate::providers::ProviderError::RateLimit => Error::RateLimitExceeded {
                retry_after: Duration::from_secs(60),
            },
            crate::providers::ProviderError::Auth(msg) => Error::AuthenticationFailed(msg),
            crate::providers::ProviderError::InvalidQuery(msg) => Error::InvalidInput {
                field: "query".to_string(),
                reason: msg,
            },
            crate::providers::ProviderError::ServiceUnavailable(msg) => {
                Error::ServiceUnavailable {
                    service: "provider".to_string(),
                    reason: msg,
                }
            }
            crate::providers::ProviderError::Timeout => Error::Timeout {
                timeout: Duration::from_secs(30),
            },
            crate::providers::ProviderError::Other(msg) => Error::Provider(msg),
        }
    }
}
