use crate::error::Result;
use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct QueryGenerationInput {
    pub research_topic: String,
    pub number_of_queries: u32,
    pub current_date: String,
}

#[derive(Debug, Clone)]
pub struct QueryGenerationOutput {
    pub queries: Vec<String>,
    pub rationale: String,
}

/// Produces the initial (or follow-up) batch of search queries from the
/// research topic. On failure the orchestrator substitutes
/// [`fallback_queries`] rather than propagating (§7, §9's open question).
#[async_trait]
pub trait QueryGenerationAgent: Send + Sync {
    async fn generate(&self, input: QueryGenerationInput) -> Result<QueryGenerationOutput>;
}

/// Deterministic fallback query list derived from the research topic.
///
/// This resolves the open question in §9 about the dead fallback branches in
/// the original query-generation agent: rather than guessing at the original
/// intent, this produces a small, reproducible set of queries built directly
/// from the topic string so a failed agent call still yields usable search
/// input.
pub fn fallback_queries(research_topic: &str, count: u32) -> Vec<String> {
    let topic = research_topic.trim();
    if topic.is_empty() {
        return (0..count.max(1))
            .map(|i| format!("general research query {}", i + 1))
            .collect();
    }

    let mut queries = vec![topic.to_string()];
    let templates = [
        "overview of {topic}",
        "{topic} latest developments",
        "{topic} key facts",
        "{topic} background and context",
        "{topic} analysis",
    ];
    for template in templates {
        if queries.len() as u32 >= count.max(1) {
            break;
        }
        queries.push(template.replace("{topic}", topic));
    }
    queries.truncate(count.max(1) as usize);
    queries
}
