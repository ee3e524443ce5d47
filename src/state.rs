//! Core data model shared by every component (§3).

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

/// A document/URL a piece of the final answer is attributed to.
///
/// Invariant: `url` is non-empty for any Source that reaches finalization.
/// `short_url` is a stable opaque handle used in the citation marker stream,
/// independent of `url`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Source {
    pub title: String,
    pub url: String,
    pub short_url: Option<String>,
    pub label: Option<String>,
}

impl Source {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            short_url: None,
            label: None,
        }
    }
}

/// A span of the final answer attributed to one or more sources.
///
/// Invariant: `0 <= start_index <= end_index <= len(answer_text)`; citations
/// may overlap; indices are codepoint offsets into the final answer text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    pub start_index: i64,
    pub end_index: i64,
    pub segments: Vec<Source>,
}

/// Provenance tag recorded by whichever provider produced a `SearchResult`,
/// consumed by the Quality Validator's source classification (§4.4).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SourceTag {
    Grounding,
    CustomWeb,
    Keyed,
    Keyless,
    KnowledgeBaseFallback,
    Unknown,
}

impl SourceTag {
    pub fn is_real_search(self) -> bool {
        matches!(
            self,
            SourceTag::Grounding | SourceTag::CustomWeb | SourceTag::Keyed | SourceTag::Keyless
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub source_tag: SourceTag,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SearchStatus {
    Success,
    Error,
    NoResults,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub status: SearchStatus,
    pub results: Vec<SearchResult>,
    pub query: String,
    pub provider_name: String,
    pub error: Option<String>,
    pub grounding_used: bool,
    /// Present only when `grounding_used`; the parsed intermediate shape the
    /// Citation Pipeline consumes (§9's well-typed-intermediate-shape note).
    pub grounding_metadata: Option<GroundingMetadata>,
    /// The raw synthesized answer text for this single query, used by
    /// finalization and by the quality validator's relevance scoring.
    pub answer_text: String,
}

impl SearchResponse {
    pub fn is_success_with_results(&self) -> bool {
        self.status == SearchStatus::Success && !self.results.is_empty()
    }
}

/// One document/URL/title triple returned by a grounded LLM call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundingChunk {
    pub uri: String,
    pub title: Option<String>,
}

/// A (text-span, chunk-reference-list) pair asserting that the named span of
/// the answer is supported by the named chunks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundingSupport {
    pub segment: Segment,
    pub chunk_indices: Vec<usize>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Segment {
    pub start_index: i64,
    pub end_index: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroundingMetadata {
    pub chunks: Vec<GroundingChunk>,
    pub supports: Vec<GroundingSupport>,
}

/// Per-request mutable orchestration state (§3). Owned exclusively by the
/// Orchestrator; agents receive value copies of the subset they need.
#[derive(Debug, Clone)]
pub struct ResearchState {
    pub messages: Vec<Message>,
    pub search_queries: Vec<String>,
    pub research_results: Vec<String>,
    pub sources_gathered: Vec<Source>,
    pub initial_query_count: u32,
    pub max_research_loops: u32,
    pub research_loop_count: u32,
    pub reasoning_model: Option<String>,
    seen_source_urls: HashSet<String>,
}

impl ResearchState {
    pub fn new(
        messages: Vec<Message>,
        initial_query_count: u32,
        max_research_loops: u32,
        reasoning_model: Option<String>,
    ) -> Self {
        Self {
            messages,
            search_queries: Vec::new(),
            research_results: Vec::new(),
            sources_gathered: Vec::new(),
            initial_query_count,
            max_research_loops,
            research_loop_count: 0,
            reasoning_model,
            seen_source_urls: HashSet::new(),
        }
    }

    pub fn add_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn add_search_queries(&mut self, queries: impl IntoIterator<Item = String>) {
        self.search_queries.extend(queries);
    }

    pub fn add_research_result(&mut self, result: String) {
        self.research_results.push(result);
    }

    /// Deduplicates by URL with first-wins semantics (§9).
    pub fn add_sources(&mut self, sources: impl IntoIterator<Item = Source>) {
        for source in sources {
            if self.seen_source_urls.insert(source.url.clone()) {
                self.sources_gathered.push(source);
            }
        }
    }

    /// Derives the research topic from the message list. Cached per-request
    /// by the caller (§4.5); this function itself is pure.
    pub fn research_topic(&self) -> String {
        self.messages
            .iter()
            .filter(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_sources_dedupes_by_url_first_wins() {
        let mut state = ResearchState::new(vec![], 3, 2, None);
        state.add_sources(vec![Source::new("A", "https://a.example")]);
        state.add_sources(vec![Source::new("A-dup", "https://a.example")]);
        assert_eq!(state.sources_gathered.len(), 1);
        assert_eq!(state.sources_gathered[0].title, "A");
    }

    #[test]
    fn research_topic_joins_user_messages_only() {
        let state = ResearchState::new(
            vec![
                Message {
                    role: Role::User,
                    content: "What is Rust?".to_string(),
                },
                Message {
                    role: Role::Assistant,
                    content: "A systems language.".to_string(),
                },
            ],
            3,
            2,
            None,
        );
        assert_eq!(state.research_topic(), "What is Rust?");
    }
}
