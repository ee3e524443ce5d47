//! Concrete `WebSearchAgent`: dispatches one query through the Provider
//! Registry and, when the winning response carries grounding metadata,
//! runs it through the Citation Pipeline before handing the orchestrator a
//! per-query summary. Grounded on `registry.rs`'s `ProviderRegistry::search`
//! and `citation/`'s public pipeline functions. When the winning provider
//! isn't the grounded one, `answer_text` is empty and a second model call
//! synthesizes prose from the raw result snippets instead, the same
//! two-call shape `web_search_agent.py`'s `_fallback_search` uses.

use super::llm::GeminiTextClient;
use super::web_search::{WebSearchAgent, WebSearchInput, WebSearchOutput};
use crate::citation;
use crate::error::Result;
use crate::providers::{SearchContext, SearchQuery};
use crate::registry::ProviderRegistry;
use crate::state::{SearchResult, Source};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct RegistrySearchAgent {
    registry: Arc<ProviderRegistry>,
    synthesis_client: Arc<GeminiTextClient>,
    max_results: u32,
}

impl RegistrySearchAgent {
    pub fn new(registry: Arc<ProviderRegistry>, synthesis_client: Arc<GeminiTextClient>, max_results: u32) -> Self {
        Self {
            registry,
            synthesis_client,
            max_results,
        }
    }

    /// Builds a per-query summary from raw snippets when the provider that
    /// won didn't already produce one (every provider but the grounded one).
    /// Falls back to a plain snippet join if the synthesis call itself fails.
    async fn synthesize_from_snippets(&self, query: &str, results: &[SearchResult]) -> String {
        if results.is_empty() {
            return String::new();
        }

        let context: String = results
            .iter()
            .map(|r| format!("- {} ({}): {}", r.title, r.url, r.snippet))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!(
            "Using only the following search results, write a concise summary answering: \"{}\".\n\n{}",
            query, context
        );

        match self.synthesis_client.generate(&prompt).await {
            Ok(text) if !text.trim().is_empty() => text,
            _ => results
                .iter()
                .map(|r| r.snippet.as_str())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

#[async_trait]
impl WebSearchAgent for RegistrySearchAgent {
    async fn search(&self, input: WebSearchInput) -> Result<WebSearchOutput> {
        let search_query = input.search_query.clone();
        let query = SearchQuery {
            query: input.search_query,
            max_results: self.max_results,
        };
        let response = self
            .registry
            .search(query, SearchContext::default(), CancellationToken::new())
            .await;

        let sources: Vec<Source> = response
            .results
            .iter()
            .map(|result| Source {
                title: result.title.clone(),
                url: result.url.clone(),
                short_url: None,
                label: None,
            })
            .collect();

        let (content, citations_applied) = match &response.grounding_metadata {
            Some(metadata) => {
                let citations = citation::create_citations_from_grounding(metadata);
                if citations.is_empty() {
                    (response.answer_text.clone(), false)
                } else {
                    (citation::insert_inline_citations(&response.answer_text, &citations), true)
                }
            }
            None if response.answer_text.is_empty() => {
                let content = self.synthesize_from_snippets(&search_query, &response.results).await;
                (content, false)
            }
            None => (response.answer_text.clone(), false),
        };

        Ok(WebSearchOutput {
            content,
            sources,
            citations_applied,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{ProviderError, SearchProvider};
    use crate::registry::Strategy;
    use crate::state::{SearchResponse, SearchStatus, SourceTag};
    use async_trait::async_trait;

    struct StubProvider;

    #[async_trait]
    impl SearchProvider for StubProvider {
        fn name(&self) -> &str {
            "stub"
        }

        fn is_available(&self) -> bool {
            true
        }

        async fn search(&self, query: &SearchQuery, _context: &SearchContext) -> std::result::Result<SearchResponse, ProviderError> {
            Ok(SearchResponse {
                status: SearchStatus::Success,
                results: vec![crate::state::SearchResult {
                    title: "Example".to_string(),
                    url: "https://example.com".to_string(),
                    snippet: String::new(),
                    source_tag: SourceTag::Keyless,
                    metadata: None,
                }],
                query: query.query.clone(),
                provider_name: "stub".to_string(),
                error: None,
                grounding_used: false,
                grounding_metadata: None,
                answer_text: "Example answer".to_string(),
            })
        }
    }

    struct EmptyAnswerProvider;

    #[async_trait]
    impl SearchProvider for EmptyAnswerProvider {
        fn name(&self) -> &str {
            "empty_answer"
        }

        fn is_available(&self) -> bool {
            true
        }

        async fn search(&self, query: &SearchQuery, _context: &SearchContext) -> std::result::Result<SearchResponse, ProviderError> {
            Ok(SearchResponse {
                status: SearchStatus::Success,
                results: vec![crate::state::SearchResult {
                    title: "Rust".to_string(),
                    url: "https://rust-lang.org".to_string(),
                    snippet: "A systems programming language.".to_string(),
                    source_tag: SourceTag::CustomWeb,
                    metadata: None,
                }],
                query: query.query.clone(),
                provider_name: "empty_answer".to_string(),
                error: None,
                grounding_used: false,
                grounding_metadata: None,
                answer_text: String::new(),
            })
        }
    }

    fn unused_synthesis_client() -> Arc<crate::agents::llm::GeminiTextClient> {
        Arc::new(crate::agents::llm::GeminiTextClient::new("key".to_string()))
    }

    #[tokio::test]
    async fn non_grounded_response_skips_citation_pipeline() {
        let registry = Arc::new(ProviderRegistry::new(vec![], Arc::new(StubProvider), Strategy::Sequential));
        let agent = RegistrySearchAgent::new(registry, unused_synthesis_client(), 5);
        let output = agent
            .search(WebSearchInput {
                search_query: "test".to_string(),
                query_id: 0,
                current_date: "2026-01-01".to_string(),
            })
            .await
            .unwrap();
        assert!(!output.citations_applied);
        assert_eq!(output.sources.len(), 1);
        assert_eq!(output.content, "Example answer");
    }

    #[tokio::test]
    async fn empty_answer_text_is_synthesized_from_snippets_via_llm() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{"content": {"parts": [{"text": "Rust is a systems language."}]}}]
            })))
            .mount(&server)
            .await;
        let client = Arc::new(crate::agents::llm::GeminiTextClient::new("key".to_string()).with_base_url(server.uri()));

        let registry = Arc::new(ProviderRegistry::new(vec![], Arc::new(EmptyAnswerProvider), Strategy::Sequential));
        let agent = RegistrySearchAgent::new(registry, client, 5);
        let output = agent
            .search(WebSearchInput {
                search_query: "what is rust".to_string(),
                query_id: 0,
                current_date: "2026-01-01".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(output.content, "Rust is a systems language.");
        assert!(!output.citations_applied);
    }

    #[tokio::test]
    async fn synthesis_falls_back_to_snippet_join_when_llm_call_fails() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(wiremock::ResponseTemplate::new(503))
            .mount(&server)
            .await;
        let client = Arc::new(crate::agents::llm::GeminiTextClient::new("key".to_string()).with_base_url(server.uri()));

        let registry = Arc::new(ProviderRegistry::new(vec![], Arc::new(EmptyAnswerProvider), Strategy::Sequential));
        let agent = RegistrySearchAgent::new(registry, client, 5);
        let output = agent
            .search(WebSearchInput {
                search_query: "what is rust".to_string(),
                query_id: 0,
                current_date: "2026-01-01".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(output.content, "A systems programming language.");
    }
}
