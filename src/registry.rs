//! Provider Registry & Strategy (C2, §4.2), grounded on
//! `search/search_manager.py`'s `SearchManager` and on the teacher's
//! `client/meta_search.rs` bounded-concurrency dispatch pattern.

use crate::providers::{ProviderError, SearchContext, SearchProvider, SearchQuery};
use crate::state::{SearchResponse, SearchStatus};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Sequential,
    Parallel,
    BestEffort,
}

/// Immutable once built (§4.2's "registered thereafter for the life of the
/// process"). The last provider is always the knowledge fallback.
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn SearchProvider>>,
    strategy: Strategy,
}

fn error_response(query: &SearchQuery, provider_name: &str, err: &ProviderError) -> SearchResponse {
    SearchResponse {
        status: SearchStatus::Error,
        results: Vec::new(),
        query: query.query.clone(),
        provider_name: provider_name.to_string(),
        error: Some(err.to_string()),
        grounding_used: false,
        grounding_metadata: None,
        answer_text: String::new(),
    }
}

impl ProviderRegistry {
    /// Probes `is_available()` on each candidate at construction time;
    /// unavailable ones are logged and excluded. `fallback` is always
    /// appended last, unconditionally.
    pub fn new(candidates: Vec<Arc<dyn SearchProvider>>, fallback: Arc<dyn SearchProvider>, strategy: Strategy) -> Self {
        let mut providers: Vec<Arc<dyn SearchProvider>> = candidates
            .into_iter()
            .filter(|provider| {
                let available = provider.is_available();
                if !available {
                    warn!(provider = provider.name(), "provider unavailable at construction, excluding");
                }
                available
            })
            .collect();
        providers.push(fallback);
        Self { providers, strategy }
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub async fn search(&self, query: SearchQuery, context: SearchContext, cancel: CancellationToken) -> SearchResponse {
        match self.strategy {
            Strategy::Sequential => self.search_sequential(&query, &context).await,
            Strategy::Parallel => self.search_parallel(&query, &context, cancel).await,
            Strategy::BestEffort => self.search_best_effort(&query, &context).await,
        }
    }

    /// Try providers in registered order; the first `success` response with
    /// non-empty results wins. `success` with empty results, or `error`,
    /// both continue to the next provider.
    async fn search_sequential(&self, query: &SearchQuery, context: &SearchContext) -> SearchResponse {
        let mut last_response = None;
        for provider in &self.providers {
            let response = match provider.search(query, context).await {
                Ok(response) => response,
                Err(err) => {
                    debug!(provider = provider.name(), error = %err, "provider failed, trying next");
                    error_response(query, provider.name(), &err)
                }
            };
            if response.is_success_with_results() {
                return response;
            }
            last_response = Some(response);
        }
        last_response.expect("registry always contains at least the knowledge fallback provider")
    }

    /// Start every provider concurrently and return the first
    /// success-with-results response, cancelling the rest. Cancellation is
    /// approximated by aborting each provider's task (`SearchProvider::search`
    /// takes no cancellation token of its own, so the registry cancels at the
    /// task boundary rather than cooperatively inside the call).
    async fn search_parallel(&self, query: &SearchQuery, context: &SearchContext, cancel: CancellationToken) -> SearchResponse {
        let mut handles = Vec::with_capacity(self.providers.len());
        for provider in self.providers.iter().cloned() {
            let query = query.clone();
            let context = context.clone();
            let child = cancel.child_token();
            let handle = tokio::spawn(async move {
                tokio::select! {
                    result = provider.search(&query, &context) => (provider.name().to_string(), result),
                    () = child.cancelled() => (provider.name().to_string(), Err(ProviderError::Other("cancelled".to_string()))),
                }
            });
            handles.push(handle);
        }

        let mut fallback_response = None;
        let mut remaining = handles;
        while !remaining.is_empty() {
            let (join_result, _index, rest) = futures::future::select_all(remaining).await;
            remaining = rest;
            if let Ok((name, outcome)) = join_result {
                let response = match outcome {
                    Ok(response) => response,
                    Err(err) => error_response(query, &name, &err),
                };
                if response.is_success_with_results() {
                    for handle in &remaining {
                        handle.abort();
                    }
                    return response;
                }
                fallback_response = Some(response);
            }
        }

        fallback_response.unwrap_or_else(|| error_response(query, "registry", &ProviderError::Other("all providers exhausted".to_string())))
    }

    /// Start every provider, wait for all to finish, pick the response with
    /// the most results, breaking ties in favour of `grounding_used=true`.
    async fn search_best_effort(&self, query: &SearchQuery, context: &SearchContext) -> SearchResponse {
        let futures = self.providers.iter().cloned().map(|provider| {
            let query = query.clone();
            let context = context.clone();
            async move {
                let name = provider.name().to_string();
                match provider.search(&query, &context).await {
                    Ok(response) => response,
                    Err(err) => error_response(&query, &name, &err),
                }
            }
        });

        let responses = futures::future::join_all(futures).await;

        responses
            .into_iter()
            .max_by(|a, b| {
                a.results
                    .len()
                    .cmp(&b.results.len())
                    .then(a.grounding_used.cmp(&b.grounding_used))
            })
            .expect("registry always contains at least the knowledge fallback provider")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubProvider {
        name: &'static str,
        available: bool,
        response: Result<SearchResponse, ProviderError>,
        calls: Arc<AtomicUsize>,
    }

    fn stub_response(results: usize, grounding_used: bool) -> SearchResponse {
        SearchResponse {
            status: if results == 0 { SearchStatus::NoResults } else { SearchStatus::Success },
            results: (0..results)
                .map(|i| crate::state::SearchResult {
                    title: format!("r{i}"),
                    url: format!("https://example.com/{i}"),
                    snippet: String::new(),
                    source_tag: crate::state::SourceTag::CustomWeb,
                    metadata: None,
                })
                .collect(),
            query: "q".to_string(),
            provider_name: "stub".to_string(),
            error: None,
            grounding_used,
            grounding_metadata: None,
            answer_text: String::new(),
        }
    }

    #[async_trait]
    impl SearchProvider for StubProvider {
        fn name(&self) -> &str {
            self.name
        }

        fn is_available(&self) -> bool {
            self.available
        }

        async fn search(&self, _query: &SearchQuery, _context: &SearchContext) -> Result<SearchResponse, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.response.clone()
        }
    }

    impl Clone for StubProvider {
        fn clone(&self) -> Self {
            Self {
                name: self.name,
                available: self.available,
                response: self.response.clone(),
                calls: self.calls.clone(),
            }
        }
    }

    fn query() -> SearchQuery {
        SearchQuery {
            query: "rust".to_string(),
            max_results: 5,
        }
    }

    #[tokio::test]
    async fn sequential_stops_at_first_success_with_results() {
        let first_calls = Arc::new(AtomicUsize::new(0));
        let second_calls = Arc::new(AtomicUsize::new(0));
        let first = Arc::new(StubProvider {
            name: "empty",
            available: true,
            response: Ok(stub_response(0, false)),
            calls: first_calls.clone(),
        });
        let second = Arc::new(StubProvider {
            name: "hit",
            available: true,
            response: Ok(stub_response(2, false)),
            calls: second_calls.clone(),
        });
        let fallback = Arc::new(StubProvider {
            name: "fallback",
            available: true,
            response: Ok(stub_response(1, false)),
            calls: Arc::new(AtomicUsize::new(0)),
        });

        let registry = ProviderRegistry::new(vec![first, second], fallback, Strategy::Sequential);
        let response = registry.search(query(), SearchContext::default(), CancellationToken::new()).await;

        assert_eq!(response.provider_name, "hit");
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unavailable_providers_excluded_at_construction() {
        let unavailable = Arc::new(StubProvider {
            name: "down",
            available: false,
            response: Ok(stub_response(5, false)),
            calls: Arc::new(AtomicUsize::new(0)),
        });
        let fallback = Arc::new(StubProvider {
            name: "fallback",
            available: true,
            response: Ok(stub_response(1, false)),
            calls: Arc::new(AtomicUsize::new(0)),
        });

        let registry = ProviderRegistry::new(vec![unavailable], fallback, Strategy::Sequential);
        assert_eq!(registry.provider_names(), vec!["fallback"]);
    }

    #[tokio::test]
    async fn best_effort_picks_most_results_then_grounding_tiebreak() {
        let a = Arc::new(StubProvider {
            name: "a",
            available: true,
            response: Ok(stub_response(2, false)),
            calls: Arc::new(AtomicUsize::new(0)),
        });
        let b = Arc::new(StubProvider {
            name: "b",
            available: true,
            response: Ok(stub_response(2, true)),
            calls: Arc::new(AtomicUsize::new(0)),
        });
        let fallback = Arc::new(StubProvider {
            name: "fallback",
            available: true,
            response: Ok(stub_response(0, false)),
            calls: Arc::new(AtomicUsize::new(0)),
        });

        let registry = ProviderRegistry::new(vec![a, b], fallback, Strategy::BestEffort);
        let response = registry.search(query(), SearchContext::default(), CancellationToken::new()).await;

        assert!(response.grounding_used);
    }

    #[tokio::test]
    async fn parallel_returns_first_success_and_cancels_rest() {
        let winner = Arc::new(StubProvider {
            name: "winner",
            available: true,
            response: Ok(stub_response(3, false)),
            calls: Arc::new(AtomicUsize::new(0)),
        });
        let fallback = Arc::new(StubProvider {
            name: "fallback",
            available: true,
            response: Ok(stub_response(1, false)),
            calls: Arc::new(AtomicUsize::new(0)),
        });

        let registry = ProviderRegistry::new(vec![winner], fallback, Strategy::Parallel);
        let response = registry.search(query(), SearchContext::default(), CancellationToken::new()).await;

        assert!(response.is_success_with_results());
    }
}
