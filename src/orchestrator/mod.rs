//! Research Orchestrator (C5, §4.5): the
//! GENERATE_QUERIES → SEARCH_BATCH → REFLECT → FINALIZE state machine.
//! Grounded on the teacher's bounded-concurrency dispatch pattern in
//! `client/meta_search.rs` and on `base/base_research_agent.py`'s
//! agent-failure-becomes-deterministic-fallback policy.

use crate::agents::{
    fallback_queries, FinalizationAgent, FinalizationInput, QueryGenerationAgent, QueryGenerationInput,
    ReflectionAgent, ReflectionInput, WebSearchAgent, WebSearchInput,
};
use crate::config::ResearchConfig;
use crate::error::{Error, Result};
use crate::quality::{self, ClassificationSummary, QualityScores};
use crate::state::{Message, ResearchState, Role, Source, SourceTag};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct ResearchRequest {
    pub question: String,
    pub initial_search_query_count: Option<u32>,
    pub max_research_loops: Option<u32>,
    pub reasoning_model: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QualityReport {
    pub scores: QualityScores,
    pub classification: ClassificationSummary,
    pub total_sources: usize,
    pub included_sources: usize,
    pub filtered_sources: usize,
    pub average_source_score: f64,
    pub quality_threshold: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct PerformanceProfile {
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResearchResponse {
    pub final_answer: String,
    pub sources: Vec<Source>,
    pub research_loops_executed: u32,
    pub total_queries: u32,
    pub quality_summary: Option<QualityReport>,
    pub performance_profile: Option<PerformanceProfile>,
}

pub struct Orchestrator {
    query_agent: Arc<dyn QueryGenerationAgent>,
    search_agent: Arc<dyn WebSearchAgent>,
    reflection_agent: Arc<dyn ReflectionAgent>,
    finalization_agent: Arc<dyn FinalizationAgent>,
    config: ResearchConfig,
}

impl Orchestrator {
    pub fn new(
        query_agent: Arc<dyn QueryGenerationAgent>,
        search_agent: Arc<dyn WebSearchAgent>,
        reflection_agent: Arc<dyn ReflectionAgent>,
        finalization_agent: Arc<dyn FinalizationAgent>,
        config: ResearchConfig,
    ) -> Self {
        Self {
            query_agent,
            search_agent,
            reflection_agent,
            finalization_agent,
            config,
        }
    }

    pub async fn run(&self, request: ResearchRequest, cancel: CancellationToken) -> Result<ResearchResponse> {
        let started_at = Instant::now();
        let current_date = chrono::Utc::now().format("%Y-%m-%d").to_string();

        let initial_query_count = request.initial_search_query_count.unwrap_or(self.config.initial_search_query_count);
        let max_research_loops = request.max_research_loops.unwrap_or(self.config.max_research_loops);

        let mut state = ResearchState::new(
            vec![Message {
                role: Role::User,
                content: request.question.clone(),
            }],
            initial_query_count,
            max_research_loops,
            request.reasoning_model.clone(),
        );
        let research_topic = state.research_topic();

        let mut total_queries: u32 = 0;
        let mut queries = self.generate_initial_queries(&research_topic, initial_query_count, &current_date).await;

        loop {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            total_queries += queries.len() as u32;
            let outputs = self.run_search_batch(queries, &current_date, cancel.clone()).await;

            for output in outputs.into_iter().flatten() {
                state.add_research_result(output.content);
                state.add_sources(output.sources);
            }

            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let reflection = self.reflect(&research_topic, &state).await;

            if reflection.is_sufficient {
                return self
                    .finalize(&research_topic, &state, &current_date, request.reasoning_model.as_deref(), started_at, total_queries)
                    .await;
            }

            // The loop-count check gates the *next* batch, not the one that just
            // completed: a follow-up batch computed from this reflection always
            // runs before research_loop_count is compared against the cap again.
            if state.research_loop_count >= state.max_research_loops {
                return self
                    .finalize(&research_topic, &state, &current_date, request.reasoning_model.as_deref(), started_at, total_queries)
                    .await;
            }
            state.research_loop_count += 1;

            queries = if reflection.follow_up_queries.is_empty() {
                fallback_queries(&reflection.knowledge_gap, 1)
            } else {
                reflection.follow_up_queries
            };
        }
    }

    async fn generate_initial_queries(&self, research_topic: &str, count: u32, current_date: &str) -> Vec<String> {
        let input = QueryGenerationInput {
            research_topic: research_topic.to_string(),
            number_of_queries: count,
            current_date: current_date.to_string(),
        };
        match self.query_agent.generate(input).await {
            Ok(output) if !output.queries.is_empty() => output.queries,
            Ok(_) => {
                warn!("query generation agent returned no queries, using fallback");
                fallback_queries(research_topic, count)
            }
            Err(err) => {
                warn!(error = %err, "query generation agent failed, using fallback");
                fallback_queries(research_topic, count)
            }
        }
    }

    /// Dispatches all queries concurrently, bounded by `max_parallel_searches`,
    /// under a nested per-query / batch-wide deadline (§4.5, §5). Per-query
    /// failures are dropped; siblings are never cancelled by one failure.
    async fn run_search_batch(
        &self,
        queries: Vec<String>,
        current_date: &str,
        cancel: CancellationToken,
    ) -> Vec<Option<crate::agents::WebSearchOutput>> {
        let batch_cancel = cancel.child_token();
        let batch_timeout = Duration::from_secs(self.config.batch_timeout_secs);
        let timer_token = batch_cancel.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(batch_timeout).await;
            timer_token.cancel();
        });

        let semaphore = Arc::new(Semaphore::new(self.config.max_parallel_searches.max(1)));
        let per_query_timeout = Duration::from_secs(self.config.per_provider_timeout_secs);
        let count = queries.len();

        let mut handles = Vec::with_capacity(count);
        for (index, query) in queries.into_iter().enumerate() {
            let semaphore = semaphore.clone();
            let agent = self.search_agent.clone();
            let current_date = current_date.to_string();
            let child = batch_cancel.child_token();

            handles.push(tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return (index, None),
                };
                let input = WebSearchInput {
                    search_query: query,
                    query_id: index,
                    current_date,
                };
                let outcome: Option<Result<crate::agents::WebSearchOutput>> = tokio::select! {
                    result = tokio::time::timeout(per_query_timeout, agent.search(input)) => result.ok(),
                    () = child.cancelled() => None,
                };
                match outcome {
                    Some(Ok(output)) => (index, Some(output)),
                    Some(Err(err)) => {
                        warn!(query_id = index, error = %err, "search agent failed for query");
                        (index, None)
                    }
                    None => {
                        debug!(query_id = index, "search agent timed out or was cancelled");
                        (index, None)
                    }
                }
            }));
        }

        let mut results: Vec<Option<crate::agents::WebSearchOutput>> = (0..count).map(|_| None).collect();
        for handle in handles {
            if let Ok((index, output)) = handle.await {
                results[index] = output;
            }
        }
        timer.abort();
        results
    }

    async fn reflect(&self, research_topic: &str, state: &ResearchState) -> crate::agents::ReflectionOutput {
        let input = ReflectionInput {
            research_topic: research_topic.to_string(),
            summaries: state.research_results.clone(),
            current_loop: state.research_loop_count,
        };
        match self.reflection_agent.reflect(input).await {
            Ok(output) => output,
            Err(err) => {
                warn!(error = %err, "reflection agent failed, assuming research is insufficient");
                crate::agents::ReflectionOutput {
                    is_sufficient: false,
                    knowledge_gap: research_topic.to_string(),
                    follow_up_queries: Vec::new(),
                }
            }
        }
    }

    async fn finalize(
        &self,
        research_topic: &str,
        state: &ResearchState,
        current_date: &str,
        reasoning_model: Option<&str>,
        started_at: Instant,
        total_queries: u32,
    ) -> Result<ResearchResponse> {
        let gathered_tags: Vec<Option<SourceTag>> = state.sources_gathered.iter().map(|_| None).collect();
        let filter_summary = quality::summarize_and_filter(&state.sources_gathered, &gathered_tags, self.config.quality_threshold);

        let input = FinalizationInput {
            research_topic: research_topic.to_string(),
            summaries: state.research_results.clone(),
            sources: filter_summary.retained_sources.clone(),
            current_date: current_date.to_string(),
            reasoning_model: reasoning_model.map(str::to_string),
        };
        let output = self.finalization_agent.finalize(input).await.map_err(|err| {
            info!(error = %err, "finalization agent failed, no further degraded path");
            err
        })?;

        let used_tags: Vec<Option<SourceTag>> = output.used_sources.iter().map(|_| None).collect();
        let elapsed = started_at.elapsed();
        let scores = quality::score(&quality::QualityInput {
            question: research_topic,
            final_answer: &output.final_answer,
            sources: &output.used_sources,
            source_tags: &used_tags,
            loops_executed: state.research_loop_count,
            total_queries,
            response_time: elapsed,
            has_citations: !output.used_sources.is_empty(),
        });

        Ok(ResearchResponse {
            final_answer: output.final_answer,
            sources: output.used_sources,
            research_loops_executed: state.research_loop_count,
            total_queries,
            quality_summary: Some(QualityReport {
                scores,
                classification: filter_summary.classification,
                total_sources: filter_summary.total,
                included_sources: filter_summary.included,
                filtered_sources: filter_summary.filtered,
                average_source_score: filter_summary.average_score,
                quality_threshold: filter_summary.threshold,
            }),
            performance_profile: Some(PerformanceProfile {
                elapsed_ms: elapsed.as_millis() as u64,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{FinalizationOutput, QueryGenerationOutput, ReflectionOutput, WebSearchOutput};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FixedQueryAgent;
    #[async_trait]
    impl QueryGenerationAgent for FixedQueryAgent {
        async fn generate(&self, input: QueryGenerationInput) -> Result<QueryGenerationOutput> {
            Ok(QueryGenerationOutput {
                queries: vec![format!("{} overview", input.research_topic)],
                rationale: "single seed query".to_string(),
            })
        }
    }

    struct FailingQueryAgent;
    #[async_trait]
    impl QueryGenerationAgent for FailingQueryAgent {
        async fn generate(&self, _input: QueryGenerationInput) -> Result<QueryGenerationOutput> {
            Err(Error::AgentFailure {
                agent: "query_generation".to_string(),
                reason: "boom".to_string(),
            })
        }
    }

    struct StubSearchAgent;
    #[async_trait]
    impl WebSearchAgent for StubSearchAgent {
        async fn search(&self, input: WebSearchInput) -> Result<WebSearchOutput> {
            Ok(WebSearchOutput {
                content: format!("findings for {}", input.search_query),
                sources: vec![Source::new("Example", format!("https://example.com/{}", input.query_id))],
                citations_applied: false,
            })
        }
    }

    struct AlwaysSufficientReflectionAgent;
    #[async_trait]
    impl ReflectionAgent for AlwaysSufficientReflectionAgent {
        async fn reflect(&self, _input: ReflectionInput) -> Result<ReflectionOutput> {
            Ok(ReflectionOutput {
                is_sufficient: true,
                knowledge_gap: String::new(),
                follow_up_queries: Vec::new(),
            })
        }
    }

    struct NeverSufficientReflectionAgent {
        calls: Arc<AtomicU32>,
    }
    #[async_trait]
    impl ReflectionAgent for NeverSufficientReflectionAgent {
        async fn reflect(&self, input: ReflectionInput) -> Result<ReflectionOutput> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ReflectionOutput {
                is_sufficient: false,
                knowledge_gap: "still missing detail".to_string(),
                follow_up_queries: vec![format!("follow up {}", input.current_loop)],
            })
        }
    }

    struct EchoFinalizationAgent;
    #[async_trait]
    impl FinalizationAgent for EchoFinalizationAgent {
        async fn finalize(&self, input: FinalizationInput) -> Result<FinalizationOutput> {
            Ok(FinalizationOutput {
                final_answer: input.summaries.join(" "),
                used_sources: input.sources,
            })
        }
    }

    fn config() -> ResearchConfig {
        ResearchConfig {
            initial_search_query_count: 1,
            max_research_loops: 2,
            max_parallel_searches: 4,
            per_provider_timeout_secs: 5,
            batch_timeout_secs: 10,
            request_timeout_secs: 30,
            quality_threshold: 0.0,
        }
    }

    #[tokio::test]
    async fn finalizes_immediately_when_reflection_is_sufficient() {
        let orchestrator = Orchestrator::new(
            Arc::new(FixedQueryAgent),
            Arc::new(StubSearchAgent),
            Arc::new(AlwaysSufficientReflectionAgent),
            Arc::new(EchoFinalizationAgent),
            config(),
        );
        let response = orchestrator
            .run(
                ResearchRequest {
                    question: "what is rust".to_string(),
                    initial_search_query_count: None,
                    max_research_loops: None,
                    reasoning_model: None,
                },
                CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(response.research_loops_executed, 0);
        assert_eq!(response.total_queries, 1);
        assert!(!response.sources.is_empty());
    }

    #[tokio::test]
    async fn finalization_input_only_carries_the_retained_source_set() {
        let orchestrator = Orchestrator::new(
            Arc::new(FixedQueryAgent),
            Arc::new(StubSearchAgent),
            Arc::new(AlwaysSufficientReflectionAgent),
            Arc::new(EchoFinalizationAgent),
            config(),
        );
        let response = orchestrator
            .run(
                ResearchRequest {
                    question: "what is rust".to_string(),
                    initial_search_query_count: None,
                    max_research_loops: None,
                    reasoning_model: None,
                },
                CancellationToken::new(),
            )
            .await
            .unwrap();

        let summary = response.quality_summary.expect("finalize always reports quality");
        assert_eq!(summary.total_sources, response.sources.len());
        assert_eq!(summary.included_sources, response.sources.len());
        assert_eq!(summary.filtered_sources, 0);
        assert_eq!(summary.quality_threshold, 0.0);
    }

    #[tokio::test]
    async fn loop_terminates_at_max_research_loops() {
        let calls = Arc::new(AtomicU32::new(0));
        let orchestrator = Orchestrator::new(
            Arc::new(FixedQueryAgent),
            Arc::new(StubSearchAgent),
            Arc::new(NeverSufficientReflectionAgent { calls: calls.clone() }),
            Arc::new(EchoFinalizationAgent),
            config(),
        );
        let response = orchestrator
            .run(
                ResearchRequest {
                    question: "what is rust".to_string(),
                    initial_search_query_count: Some(1),
                    max_research_loops: Some(2),
                    reasoning_model: None,
                },
                CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(response.research_loops_executed, 2);
        assert_eq!(response.total_queries, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn matches_worked_example_arithmetic_for_initial_two_max_three() {
        let calls = Arc::new(AtomicU32::new(0));
        let orchestrator = Orchestrator::new(
            Arc::new(FixedQueryAgent),
            Arc::new(StubSearchAgent),
            Arc::new(NeverSufficientReflectionAgent { calls: calls.clone() }),
            Arc::new(EchoFinalizationAgent),
            config(),
        );
        let response = orchestrator
            .run(
                ResearchRequest {
                    question: "what is rust".to_string(),
                    initial_search_query_count: Some(2),
                    max_research_loops: Some(3),
                    reasoning_model: None,
                },
                CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(response.research_loops_executed, 3);
        assert_eq!(response.total_queries, 5);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn zero_max_research_loops_runs_exactly_one_batch() {
        let orchestrator = Orchestrator::new(
            Arc::new(FixedQueryAgent),
            Arc::new(StubSearchAgent),
            Arc::new(NeverSufficientReflectionAgent { calls: Arc::new(AtomicU32::new(0)) }),
            Arc::new(EchoFinalizationAgent),
            config(),
        );
        let response = orchestrator
            .run(
                ResearchRequest {
                    question: "what is rust".to_string(),
                    initial_search_query_count: Some(1),
                    max_research_loops: Some(0),
                    reasoning_model: None,
                },
                CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(response.research_loops_executed, 0);
        assert_eq!(response.total_queries, 1);
    }

    #[tokio::test]
    async fn falls_back_to_deterministic_queries_on_agent_failure() {
        let orchestrator = Orchestrator::new(
            Arc::new(FailingQueryAgent),
            Arc::new(StubSearchAgent),
            Arc::new(AlwaysSufficientReflectionAgent),
            Arc::new(EchoFinalizationAgent),
            config(),
        );
        let response = orchestrator
            .run(
                ResearchRequest {
                    question: "rust ownership".to_string(),
                    initial_search_query_count: Some(3),
                    max_research_loops: None,
                    reasoning_model: None,
                },
                CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(response.total_queries, 3);
    }

    #[tokio::test]
    async fn already_cancelled_token_short_circuits() {
        let orchestrator = Orchestrator::new(
            Arc::new(FixedQueryAgent),
            Arc::new(StubSearchAgent),
            Arc::new(AlwaysSufficientReflectionAgent),
            Arc::new(EchoFinalizationAgent),
            config(),
        );
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = orchestrator
            .run(
                ResearchRequest {
                    question: "rust".to_string(),
                    initial_search_query_count: None,
                    max_research_loops: None,
                    reasoning_model: None,
                },
                cancel,
            )
            .await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }
}
