//! Thin, non-grounded text-generation client shared by the three
//! text-only agents (query generation, reflection, finalization). The
//! grounded search call lives separately in
//! [`crate::providers::gemini_client`] since it is part of the provider
//! cascade, not this boundary. Prompt content itself is intentionally
//! minimal: prompt engineering is explicitly out of scope (§1).

use crate::error::{Error, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

pub struct GeminiTextClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiTextClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model: "gemini-2.0-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta/models".to_string(),
        }
    }

    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/{}:generateContent", self.base_url, self.model);
        let body = json!({ "contents": [{ "parts": [{ "text": prompt }] }] });

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(Error::Http)?;

        if !response.status().is_success() {
            return Err(Error::ServiceUnavailable {
                service: "gemini".to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        let parsed: ApiResponse = response.json().await.map_err(|e| Error::Parse {
            context: "gemini text response".to_string(),
            message: e.to_string(),
        })?;

        parsed
            .candidates
            .into_iter()
            .next()
            .map(|c| c.content.parts.into_iter().map(|p| p.text).collect::<Vec<_>>().join(""))
            .ok_or_else(|| Error::Parse {
                context: "gemini text response".to_string(),
                message: "no candidates returned".to_string(),
            })
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[cfg(test)]
impl GeminiTextClient {
    pub(crate) fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}
