//! Search Providers (C1, §4.1): each adapts one external search backend to
//! the uniform [`traits::SearchProvider`] contract.

mod custom_search;
mod gemini_client;
mod grounded;
mod keyless;
mod knowledge_fallback;
mod secondary_search;
mod traits;

pub use custom_search::CustomSearchProvider;
pub use gemini_client::GeminiGroundedClient;
pub use grounded::{GroundedLlmClient, GroundedLlmResponse, GroundedProvider};
pub use keyless::KeylessProvider;
pub use knowledge_fallback::KnowledgeFallbackProvider;
pub use secondary_search::SecondarySearchProvider;
pub use traits::{ProviderError, SearchContext, SearchProvider, SearchQuery};
