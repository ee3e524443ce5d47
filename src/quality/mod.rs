//! Quality Validator (C4, §4.4): scores a completed research response and
//! classifies its gathered sources.

pub mod classification;
mod validator;

pub use classification::{classify, summarize, ClassificationSummary, SourceClass};
pub use validator::{score, summarize_and_filter, QualityInput, QualityScores, QualitySummary};
