use super::traits::{ProviderError, SearchContext, SearchProvider, SearchQuery};
use crate::state::{SearchResponse, SearchStatus, SourceTag};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error};
use url::Url;

/// No API key required; a last-resort live source (§4.1's "Keyless public
/// provider"). Parses both an abstract result and related-topic entries;
/// titles fall back to the URL's final path fragment when absent.
pub struct KeylessProvider {
    client: Client,
    base_url: String,
}

impl Default for KeylessProvider {
    fn default() -> Self {
        Self {
            client: Client::new(),
            base_url: "https://api.duckduckgo.com/".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default, rename = "AbstractText")]
    abstract_text: String,
    #[serde(default, rename = "AbstractURL")]
    abstract_url: String,
    #[serde(default, rename = "Heading")]
    heading: String,
    #[serde(default, rename = "RelatedTopics")]
    related_topics: Vec<RelatedTopic>,
}

#[derive(Debug, Deserialize)]
struct RelatedTopic {
    #[serde(default, rename = "Text")]
    text: String,
    #[serde(default, rename = "FirstURL")]
    first_url: String,
}

fn title_from_url(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|segs| segs.filter(|s| !s.is_empty()).next_back().map(str::to_string))
        })
        .unwrap_or_else(|| url.to_string())
}

#[async_trait]
impl SearchProvider for KeylessProvider {
    fn name(&self) -> &str {
        "keyless"
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn search(
        &self,
        query: &SearchQuery,
        context: &SearchContext,
    ) -> Result<SearchResponse, ProviderError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("q", query.query.as_str()), ("format", "json"), ("no_html", "1")])
            .timeout(context.timeout)
            .send()
            .await
            .map_err(|e| {
                error!("keyless request failed: {}", e);
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
                400..=499 => ProviderError::InvalidQuery(format!("HTTP {status}")),
                _ => ProviderError::ServiceUnavailable(format!("HTTP {status}")),
            });
        }

        let body: ApiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        debug!(
            "keyless found abstract={} related_topics={}",
            !body.abstract_text.is_empty(),
            body.related_topics.len()
        );

        let mut results = Vec::new();
        if !body.abstract_text.is_empty() && !body.abstract_url.is_empty() {
            let title = if body.heading.is_empty() {
                title_from_url(&body.abstract_url)
            } else {
                body.heading.clone()
            };
            results.push(crate::state::SearchResult {
                title,
                url: body.abstract_url,
                snippet: body.abstract_text,
                source_tag: SourceTag::Keyless,
                metadata: None,
            });
        }

        for topic in body.related_topics {
            if topic.first_url.is_empty() {
                continue;
            }
            let title = if topic.text.is_empty() {
                title_from_url(&topic.first_url)
            } else {
                topic.text.clone()
            };
            results.push(crate::state::SearchResult {
                title,
                url: topic.first_url,
                snippet: topic.text,
                source_tag: SourceTag::Keyless,
                metadata: None,
            });
        }

        results.truncate(query.max_results as usize);

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
    fn always_available() {
        assert!(KeylessProvider::default().is_available());
    }

    #[test]
    fn title_from_url_uses_last_path_segment() {
        assert_eq!(title_from_url("https://python.org/about/"), "about");
        assert_eq!(title_from_url("not a url"), "not a url");
    }
}
