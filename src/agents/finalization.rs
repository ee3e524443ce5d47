use crate::error::Result;
use crate::state::Source;
use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct FinalizationInput {
    pub research_topic: String,
    pub summaries: Vec<String>,
    pub sources: Vec<Source>,
    pub current_date: String,
    pub reasoning_model: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FinalizationOutput {
    pub final_answer: String,
    pub used_sources: Vec<Source>,
}

/// Assembles the final cited answer from accumulated research results
/// (§4.5's FINALIZE state). A failure here has no further degraded path
/// within the orchestrator itself; the caller surfaces it as a 5xx (§7).
#[async_trait]
pub trait FinalizationAgent: Send + Sync {
    async fn finalize(&self, input: FinalizationInput) -> Result<FinalizationOutput>;
}
