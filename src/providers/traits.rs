use crate::state::SearchResponse;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub query: String,
    pub max_results: u32,
}

/// Context shared by every provider call for a single search (§4.1).
#[derive(Debug, Clone)]
pub struct SearchContext {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for SearchContext {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            user_agent: "iter-research/0.1 (research orchestrator)".to_string(),
        }
    }
}

/// Uniform provider error taxonomy (§4.1): network/timeout is retryable,
/// auth/invalid-query is not, rate-limit retries with backoff,
/// service-unavailable (5xx) is retryable, parse failures are not.
#[derive(Debug, Error, Clone)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Rate limit exceeded")]
    RateLimit,

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Timeout occurred")]
    Timeout,

    #[error("Provider error: {0}")]
    Other(String),
}

impl ProviderError {
    /// Network/timeout/rate-limit/5xx are retryable; auth, invalid query,
    /// and parse failures are terminal for this provider on this query.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::Network(_)
                | ProviderError::Timeout
                | ProviderError::RateLimit
                | ProviderError::ServiceUnavailable(_)
        )
    }
}

/// One external search backend adapted to a uniform query -> results
/// contract (§4.1, C1).
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Unique, stable identifier used as `source_tag` provenance.
    fn name(&self) -> &str;

    /// Pure, cheap, synchronous: true when the provider has the
    /// configuration it needs. Never performs network I/O.
    fn is_available(&self) -> bool;

    /// Must return within `context.timeout` and must never panic or
    /// propagate to the caller; all failures are returned as `Err`, which
    /// the registry folds into a `SearchResponse{status: Error, ..}`.
    async fn search(
        &self,
        query: &SearchQuery,
        context: &SearchContext,
    ) -> Result<SearchResponse, ProviderError>;
}
