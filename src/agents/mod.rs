//! The four LLM-backed agents, treated as pure request/response callables
//! (§1's out-of-scope note: their prompts live outside the core). Each trait
//! is `async_trait` object-safe so the orchestrator can hold `Arc<dyn ...>`
//! and substitute a deterministic fallback on failure, per §7 and §9's open
//! question on query-generation fallback.

mod finalization;
mod llm;
mod query_generation;
mod reflection;
mod search_agent;
mod text_agents;
mod web_search;

pub use finalization::{FinalizationAgent, FinalizationInput, FinalizationOutput};
pub use llm::GeminiTextClient;
pub use query_generation::{
    fallback_queries, QueryGenerationAgent, QueryGenerationInput, QueryGenerationOutput,
};
pub use reflection::{ReflectionAgent, ReflectionInput, ReflectionOutput};
pub use search_agent::RegistrySearchAgent;
pub use text_agents::{GeminiFinalizationAgent, GeminiQueryGenerationAgent, GeminiReflectionAgent};
pub use web_search::{WebSearchAgent, WebSearchInput, WebSearchOutput};
