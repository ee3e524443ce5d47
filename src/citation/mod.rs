//! Citation Pipeline (C3, §4.3): turns raw grounding metadata into
//! [`crate::state::Source`]/[`crate::state::Citation`] values and splices
//! inline markers into synthesized answer text.

mod formatter;
mod grounding;
mod validation;

pub use formatter::{format_citations_as_references, insert_inline_citations};
pub use grounding::{create_citations_from_grounding, extract_sources_from_grounding};
pub use validation::{validate_citations, CitationIssue};
