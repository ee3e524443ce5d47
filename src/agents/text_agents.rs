//! Concrete query-generation, reflection, and finalization agents backed by
//! [`super::llm::GeminiTextClient`]. Prompt wording is intentionally
//! minimal, since prompt engineering itself is out of scope (§1); these
//! exist to give the orchestrator a real, callable implementation of each
//! trait rather than a stub.

use super::finalization::{FinalizationAgent, FinalizationInput, FinalizationOutput};
use super::llm::GeminiTextClient;
use super::query_generation::{QueryGenerationAgent, QueryGenerationInput, QueryGenerationOutput};
use super::reflection::{ReflectionAgent, ReflectionInput, ReflectionOutput};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

pub struct GeminiQueryGenerationAgent {
    client: Arc<GeminiTextClient>,
}

impl GeminiQueryGenerationAgent {
    pub fn new(client: Arc<GeminiTextClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl QueryGenerationAgent for GeminiQueryGenerationAgent {
    async fn generate(&self, input: QueryGenerationInput) -> Result<QueryGenerationOutput> {
        let prompt = format!(
            "Today is {}. Produce {} distinct, concrete web search queries for researching: \"{}\". \
             Reply with one query per line and nothing else.",
            input.current_date, input.number_of_queries, input.research_topic
        );
        let text = self.client.generate(&prompt).await?;
        let queries: Vec<String> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| line.trim_start_matches(|c: char| c == '-' || c == '*' || c.is_ascii_digit() || c == '.' || c == ' ').to_string())
            .filter(|line| !line.is_empty())
            .take(input.number_of_queries.max(1) as usize)
            .collect();

        Ok(QueryGenerationOutput {
            queries,
            rationale: text,
        })
    }
}

pub struct GeminiReflectionAgent {
    client: Arc<GeminiTextClient>,
}

impl GeminiReflectionAgent {
    pub fn new(client: Arc<GeminiTextClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ReflectionAgent for GeminiReflectionAgent {
    async fn reflect(&self, input: ReflectionInput) -> Result<ReflectionOutput> {
        let prompt = format!(
            "Research topic: \"{}\". This is loop {}. Summaries gathered so far:\n{}\n\n\
             Decide if this is sufficient to answer the topic. Reply with either:\n\
             SUFFICIENT\nor\nINSUFFICIENT: <knowledge gap>\nfollow-up queries (one per line)",
            input.research_topic,
            input.current_loop,
            input.summaries.join("\n---\n")
        );
        let text = self.client.generate(&prompt).await?;
        Ok(parse_reflection(&text))
    }
}

fn parse_reflection(text: &str) -> ReflectionOutput {
    let mut lines = text.lines().map(str::trim).filter(|line| !line.is_empty());
    let first = lines.next().unwrap_or_default();

    if first.eq_ignore_ascii_case("SUFFICIENT") {
        return ReflectionOutput {
            is_sufficient: true,
            knowledge_gap: String::new(),
            follow_up_queries: vec![],
        };
    }

    let knowledge_gap = first
        .strip_prefix("INSUFFICIENT:")
        .or_else(|| first.strip_prefix("INSUFFICIENT"))
        .unwrap_or(first)
        .trim()
        .trim_start_matches(':')
        .trim()
        .to_string();

    let follow_up_queries: Vec<String> = lines
        .filter(|line| !line.eq_ignore_ascii_case("follow-up queries (one per line)"))
        .map(|line| line.trim_start_matches(|c: char| c == '-' || c == '*' || c.is_ascii_digit() || c == '.' || c == ' ').to_string())
        .filter(|line| !line.is_empty())
        .collect();

    ReflectionOutput {
        is_sufficient: false,
        knowledge_gap,
        follow_up_queries,
    }
}

pub struct GeminiFinalizationAgent {
    client: Arc<GeminiTextClient>,
}

impl GeminiFinalizationAgent {
    pub fn new(client: Arc<GeminiTextClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FinalizationAgent for GeminiFinalizationAgent {
    async fn finalize(&self, input: FinalizationInput) -> Result<FinalizationOutput> {
        let prompt = format!(
            "Today is {}. Using the following research summaries, write a final answer to: \"{}\".\n\n{}",
            input.current_date,
            input.research_topic,
            input.summaries.join("\n---\n")
        );
        let final_answer = self.client.generate(&prompt).await?;
        Ok(FinalizationOutput {
            final_answer,
            used_sources: input.sources,
        })
    }
}
