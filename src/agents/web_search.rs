use crate::error::Result;
use crate::state::Source;
use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct WebSearchInput {
    pub search_query: String,
    pub query_id: usize,
    pub current_date: String,
}

#[derive(Debug, Clone)]
pub struct WebSearchOutput {
    pub content: String,
    pub sources: Vec<Source>,
    pub citations_applied: bool,
}

/// Synthesizes a per-query summary from provider search results. This is the
/// per-query "Search Agent" of §2's data-flow diagram; it sits above the
/// Provider Registry, consuming its `SearchResponse` and (when grounded)
/// running it through the Citation Pipeline.
#[async_trait]
pub trait WebSearchAgent: Send + Sync {
    async fn search(&self, input: WebSearchInput) -> Result<WebSearchOutput>;
}
