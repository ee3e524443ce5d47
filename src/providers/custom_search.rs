use super::traits::{ProviderError, SearchContext, SearchProvider, SearchQuery};
use crate::state::{SearchResponse, SearchStatus, SourceTag};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error, info};

/// A classic keyed web-search API returning a JSON array of result items
/// (§4.1's "Custom-key web search provider"). Respects the vendor's
/// per-query cap of 10; HTTP 4xx is terminal for this provider, 5xx is
/// transient, grounded on the arXiv provider's status-code mapping.
pub struct CustomSearchProvider {
    client: Client,
    api_key: Option<String>,
    engine_id: Option<String>,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    items: Vec<ApiItem>,
}

#[derive(Debug, Deserialize)]
struct ApiItem {
    title: String,
    link: String,
    #[serde(default)]
    snippet: String,
}

impl CustomSearchProvider {
    pub fn new(api_key: Option<String>, engine_id: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            engine_id,
            base_url: "https://www.googleapis.com/customsearch/v1".to_string(),
        }
    }
}

#[async_trait]
impl SearchProvider for CustomSearchProvider {
    fn name(&self) -> &str {
        "custom_web"
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some() && self.engine_id.is_some()
    }

    async fn search(
        &self,
        query: &SearchQuery,
        context: &SearchContext,
    ) -> Result<SearchResponse, ProviderError> {
        let (api_key, engine_id) = match (&self.api_key, &self.engine_id) {
            (Some(k), Some(e)) => (k, e),
            _ => return Err(ProviderError::Auth("missing API key or engine id".into())),
        };

        let capped_results = query.max_results.min(10);
        info!("custom_web search for '{}'", query.query);

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("key", api_key.as_str()),
                ("cx", engine_id.as_str()),
                ("q", query.query.as_str()),
                ("num", &capped_results.to_string()),
            ])
            .timeout(context.timeout)
            .send()
            .await
            .map_err(|e| {
                error!("custom_web request failed: {}", e);
                if e.is_timeout() {
                    ProviderError::Timeout
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(match status.as_u16() {
                429 => ProviderError::RateLimit,
                401 | 403 => ProviderError::Auth(format!("HTTP {status}")),
                400..=499 => ProviderError::InvalidQuery(format!("HTTP {status}")),
                _ => ProviderError::ServiceUnavailable(format!("HTTP {status}")),
            });
        }

        let body: ApiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        debug!("custom_web returned {} items", body.items.len());

        let results: Vec<_> = body
            .items
            .into_iter()
            .map(|item| crate::state::SearchResult {
                title: item.title,
                url: item.link,
                snippet: item.snippet,
                source_tag: SourceTag::CustomWeb,
                metadata: None,
            })
            .collect();

        let status = if results.is_empty() {
            SearchStatus::NoResults
        } else {
            SearchStatus::Success
        };

        Ok(SearchResponse {
            status,
            results,
            query: query.query.clone(),
            provider_name: self.name().to_string(),
            error: None,
            grounding_used: false,
            grounding_metadata: None,
            answer_text: String::new(),
        })
    }
}

#[cfg(test)]
impl CustomSearchProvider {
    fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn unavailable_without_credentials() {
        let provider = CustomSearchProvider::new(None, None);
        assert!(!provider.is_available());
    }

    #[test]
    fn available_with_credentials() {
        let provider = CustomSearchProvider::new(Some("key".into()), Some("cx".into()));
        assert!(provider.is_available());
    }

    #[tokio::test]
    async fn parses_items_into_custom_web_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [{"title": "Rust", "link": "https://rust-lang.org", "snippet": "A systems language"}]
            })))
            .mount(&server)
            .await;

        let provider = CustomSearchProvider::new(Some("key".into()), Some("cx".into())).with_base_url(server.uri());
        let response = provider
            .search(
                &SearchQuery {
                    query: "rust".to_string(),
                    max_results: 5,
                },
                &SearchContext::default(),
            )
            .await
            .unwrap();

        assert_eq!(response.status, SearchStatus::Success);
        assert_eq!(response.results.len(), 1);
        assert_eq!(response.results[0].source_tag, SourceTag::CustomWeb);
    }

    #[tokio::test]
    async fn maps_rate_limit_status_to_rate_limit_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET")).respond_with(ResponseTemplate::new(429)).mount(&server).await;

        let provider = CustomSearchProvider::new(Some("key".into()), Some("cx".into())).with_base_url(server.uri());
        let err = provider
            .search(
                &SearchQuery {
                    query: "rust".to_string(),
                    max_results: 5,
                },
                &SearchContext::default(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::RateLimit));
    }
}
