//! Source classification (§4.4), grounded on `quality_validator.py`'s source
//! classification helper. Resolves §9's Open Question in favor of
//! `source_tag` as the primary signal, with URL-host heuristics as a
//! fallback when it is absent.

use crate::state::{Source, SourceTag};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceClass {
    Grounding,
    CustomWeb,
    Keyed,
    Keyless,
    KnowledgeBaseFallback,
    Unknown,
}

impl SourceClass {
    pub fn is_real_search(self) -> bool {
        matches!(
            self,
            SourceClass::Grounding | SourceClass::CustomWeb | SourceClass::Keyed | SourceClass::Keyless
        )
    }

    /// Per-class quality score used by graduated filtering's threshold
    /// comparison (§4.4). Grounded search tools are the most trustworthy
    /// provenance, the knowledge-base fallback the least.
    pub fn quality_score(self) -> f64 {
        match self {
            SourceClass::Grounding => 1.0,
            SourceClass::CustomWeb => 0.85,
            SourceClass::Keyed => 0.75,
            SourceClass::Keyless => 0.6,
            SourceClass::Unknown => 0.4,
            SourceClass::KnowledgeBaseFallback => 0.3,
        }
    }

    fn from_tag(tag: SourceTag) -> Self {
        match tag {
            SourceTag::Grounding => SourceClass::Grounding,
            SourceTag::CustomWeb => SourceClass::CustomWeb,
            SourceTag::Keyed => SourceClass::Keyed,
            SourceTag::Keyless => SourceClass::Keyless,
            SourceTag::KnowledgeBaseFallback => SourceClass::KnowledgeBaseFallback,
            SourceTag::Unknown => SourceClass::Unknown,
        }
    }

    /// Best-effort host sniffing for sources with no provider-supplied tag
    /// (e.g. hand-constructed test fixtures).
    fn from_url_heuristic(url: &str) -> Self {
        let host = url::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default();

        if host.contains("wikipedia.org") || host.is_empty() {
            SourceClass::KnowledgeBaseFallback
        } else {
            SourceClass::Unknown
        }
    }
}

/// Explicit `source_tag` (attached by the provider at search time) takes
/// precedence; classification by URL host is a fallback for sources that
/// arrive without one.
pub fn classify(source: &Source, tag: Option<SourceTag>) -> SourceClass {
    match tag {
        Some(tag) => SourceClass::from_tag(tag),
        None => SourceClass::from_url_heuristic(&source.url),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ClassificationSummary {
    pub has_real_search: bool,
    pub has_fallback: bool,
}

pub fn summarize(classes: &[SourceClass]) -> ClassificationSummary {
    ClassificationSummary {
        has_real_search: classes.iter().any(|c| c.is_real_search()),
        has_fallback: classes.iter().any(|c| matches!(c, SourceClass::KnowledgeBaseFallback)),
    }
}
