//! Concrete grounded search-tool client, adapted from
//! `agent/search/gemini_search.py`'s use of the Gemini API's search
//! grounding tool. Everything past the raw HTTP call and response parsing
//! (prompt content, model selection policy) is out of scope (§1); this
//! module only owns the request/response boundary and the mapping into
//! [`GroundingMetadata`].

use super::grounded::{GroundedLlmClient, GroundedLlmResponse};
use super::traits::ProviderError;
use crate::state::{GroundingChunk, GroundingMetadata, GroundingSupport, Segment};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// `GroundedLlmClient` backed by the Gemini `generateContent` REST endpoint
/// with the `google_search` tool enabled, mirroring
/// `GeminiSearchProvider.search_with_grounding` from the original search
/// module.
pub struct GeminiGroundedClient {
    client: Client,
    api_key: String,
    model: String,
}

impl GeminiGroundedClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

#[async_trait]
impl GroundedLlmClient for GeminiGroundedClient {
    async fn generate_grounded(&self, query: &str) -> Result<GroundedLlmResponse, ProviderError> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            self.model
        );
        let body = json!({
            "contents": [{ "parts": [{ "text": query }] }],
            "tools": [{ "google_search": {} }]
        });

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    ProviderError::Timeout
                } else {
                    ProviderError::Network(err.to_string())
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

        let parsed: ApiResponse = response
            .json()
            .await
            .map_err(|err| ProviderError::Parse(err.to_string()))?;

        let candidate = parsed
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Parse("no candidates returned".to_string()))?;

        let text = candidate
            .content
            .parts
            .into_iter()
            .map(|part| part.text)
            .collect::<Vec<_>>()
            .join("");

        let grounding_metadata = candidate.grounding_metadata.map(|metadata| GroundingMetadata {
            chunks: metadata
                .grounding_chunks
                .into_iter()
                .map(|chunk| {
                    let web = chunk.web.unwrap_or(ApiWeb { uri: None, title: None });
                    GroundingChunk {
                        uri: web.uri.unwrap_or_default(),
                        title: web.title,
                    }
                })
                .collect(),
            supports: metadata
                .grounding_supports
                .into_iter()
                .map(|support| GroundingSupport {
                    segment: Segment {
                        start_index: support.segment.start_index,
                        end_index: support.segment.end_index,
                    },
                    chunk_indices: support.grounding_chunk_indices,
                })
                .collect(),
        });

        Ok(GroundedLlmResponse {
            text,
            grounding_metadata,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    candidates: Vec<ApiCandidate>,
}

#[derive(Debug, Deserialize)]
struct ApiCandidate {
    content: ApiContent,
    #[serde(default, rename = "groundingMetadata")]
    grounding_metadata: Option<ApiGroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct ApiContent {
    #[serde(default)]
    parts: Vec<ApiPart>,
}

#[derive(Debug, Deserialize)]
struct ApiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct ApiGroundingMetadata {
    #[serde(default, rename = "groundingChunks")]
    grounding_chunks: Vec<ApiChunk>,
    #[serde(default, rename = "groundingSupports")]
    grounding_supports: Vec<ApiSupport>,
}

#[derive(Debug, Deserialize)]
struct ApiChunk {
    web: Option<ApiWeb>,
}

#[derive(Debug, Deserialize)]
struct ApiWeb {
    uri: Option<String>,
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiSupport {
    segment: ApiSegment,
    #[serde(default, rename = "groundingChunkIndices")]
    grounding_chunk_indices: Vec<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct ApiSegment {
    #[serde(default, rename = "startIndex")]
    start_index: i64,
    #[serde(default, rename = "endIndex")]
    end_index: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_grounding_chunks_and_supports() {
        let raw = r#"{
            "candidates": [{
                "content": {"parts": [{"text": "Paris is the capital of France."}]},
                "groundingMetadata": {
                    "groundingChunks": [{"web": {"uri": "https://example.com/a", "title": "A"}}],
                    "groundingSupports": [{"segment": {"startIndex": 0, "endIndex": 5}, "groundingChunkIndices": [0]}]
                }
            }]
        }"#;
        let parsed: ApiResponse = serde_json::from_str(raw).unwrap();
        let candidate = parsed.candidates.into_iter().next().unwrap();
        let metadata = candidate.grounding_metadata.unwrap();
        assert_eq!(metadata.grounding_chunks.len(), 1);
        assert_eq!(metadata.grounding_supports[0].grounding_chunk_indices, vec![0]);
    }

    #[test]
    fn missing_grounding_metadata_is_none() {
        let raw = r#"{"candidates": [{"content": {"parts": [{"text": "plain answer"}]}}]}"#;
        let parsed: ApiResponse = serde_json::from_str(raw).unwrap();
        assert!(parsed.candidates[0].grounding_metadata.is_none());
    }

    #[test]
    fn empty_uri_chunk_still_parses() {
        let raw = r#"{
            "candidates": [{
                "content": {"parts": [{"text": "answer"}]},
                "groundingMetadata": {"groundingChunks": [{"web": {}}], "groundingSupports": []}
            }]
        }"#;
        let parsed: ApiResponse = serde_json::from_str(raw).unwrap();
        let metadata = parsed.candidates[0].grounding_metadata.as_ref().unwrap();
        assert_eq!(metadata.grounding_chunks[0].web.as_ref().unwrap().uri, None);
    }
}
