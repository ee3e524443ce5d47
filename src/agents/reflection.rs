use crate::error::Result;
use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct ReflectionInput {
    pub research_topic: String,
    pub summaries: Vec<String>,
    pub current_loop: u32,
}

#[derive(Debug, Clone)]
pub struct ReflectionOutput {
    pub is_sufficient: bool,
    pub knowledge_gap: String,
    pub follow_up_queries: Vec<String>,
}

/// Decides whether the accumulated research is sufficient or whether another
/// SEARCH_BATCH is needed (§4.5's REFLECT state). On agent failure the
/// orchestrator assumes "insufficient research" and proceeds with no
/// follow-up queries, which naturally terminates the loop once
/// `max_research_loops` is reached (§7).
#[async_trait]
pub trait ReflectionAgent: Send + Sync {
    async fn reflect(&self, input: ReflectionInput) -> Result<ReflectionOutput>;
}
