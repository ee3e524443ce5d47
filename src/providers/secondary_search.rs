use super::traits::{ProviderError, SearchContext, SearchProvider, SearchQuery};
use crate::state::{SearchResponse, SearchStatus, SourceTag};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error};

/// Same shape as [`super::custom_search::CustomSearchProvider`], a different
/// vendor, with a per-engine override (§4.1's "Secondary keyed provider").
pub struct SecondarySearchProvider {
    client: Client,
    api_key: Option<String>,
    engine: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    results: Vec<ApiItem>,
}

#[derive(Debug, Deserialize)]
struct ApiItem {
    title: String,
    url: String,
    #[serde(default)]
    description: String,
}

impl SecondarySearchProvider {
    pub fn new(api_key: Option<String>, engine: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            engine: engine.unwrap_or_else(|| "google".to_string()),
            base_url: "https://www.searchapi.io/api/v1/search".to_string(),
        }
    }
}

#[async_trait]
impl SearchProvider for SecondarySearchProvider {
    fn name(&self) -> &str {
        "keyed_secondary"
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn search(
        &self,
        query: &SearchQuery,
        context: &SearchContext,
    ) -> Result<SearchResponse, ProviderError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| ProviderError::Auth("missing API key".into()))?;

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("api_key", api_key.as_str()),
                ("engine", self.engine.as_str()),
                ("q", query.query.as_str()),
            ])
            .timeout(context.timeout)
            .send()
            .await
            .map_err(|e| {
                error!("keyed_secondary request failed: {}", e);
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

        debug!("keyed_secondary returned {} results", body.results.len());

        let results: Vec<_> = body
            .results
            .into_iter()
            .take(query.max_results as usize)
            .map(|item| crate::state::SearchResult {
                title: item.title,
                url: item.url,
                snippet: item.description,
                source_tag: SourceTag::Keyed,
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
mod tests {
    use super::*;

    #[test]
    fn engine_defaults_to_google() {
        let provider = SecondarySearchProvider::new(Some("key".into()), None);
        assert_eq!(provider.engine, "google");
    }

    #[test]
    fn engine_override_respected() {
        let provider = SecondarySearchProvider::new(Some("key".into()), Some("bing".into()));
        assert_eq!(provider.engine, "bing");
    }
}
