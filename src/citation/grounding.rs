//! Source extraction and citation construction from a parsed grounding
//! response (§4.3), grounded on `grounding_processor.py`'s
//! `extract_sources_from_grounding` / `create_citations_from_grounding`.

use crate::state::{Citation, GroundingMetadata, Source};

/// For each grounding chunk with a non-empty URI, emit a Source whose
/// `short_url` encodes the chunk's ordinal position and whose `label` is a
/// human-readable ordinal. Empty URIs are skipped; a missing title falls
/// back to `Source {n+1}`.
pub fn extract_sources_from_grounding(metadata: &GroundingMetadata) -> Vec<Source> {
    metadata
        .chunks
        .iter()
        .enumerate()
        .filter(|(_, chunk)| !chunk.uri.is_empty())
        .map(|(i, chunk)| Source {
            title: chunk
                .title
                .clone()
                .unwrap_or_else(|| format!("Source {}", i + 1)),
            url: chunk.uri.clone(),
            short_url: Some(format!("grounding-source-{}", i + 1)),
            label: Some(format!("Source {}", i + 1)),
        })
        .collect()
}

/// Clamp a raw (start, end) pair to the invariant `0 <= start <= end`.
fn normalize_indices(start: i64, end: i64) -> (i64, i64) {
    let start = start.max(0);
    let end = end.max(0);
    let end = end.max(start);
    (start, end)
}

/// For each grounding support, validate and repair its span indices, then
/// resolve its chunk indices to sources. A support whose chunk indices
/// resolve to zero sources (missing, malformed, or empty-URI chunk) is
/// skipped entirely rather than emitting an empty citation.
pub fn create_citations_from_grounding(metadata: &GroundingMetadata) -> Vec<Citation> {
    let sources = extract_sources_from_grounding(metadata);

    metadata
        .supports
        .iter()
        .filter_map(|support| {
            let (start, end) = normalize_indices(support.segment.start_index, support.segment.end_index);

            let segments: Vec<Source> = support
                .chunk_indices
                .iter()
                .filter_map(|&idx| {
                    let chunk = metadata.chunks.get(idx)?;
                    if chunk.uri.is_empty() {
                        return None;
                    }
                    // chunk ordinal position may differ from its index among
                    // non-empty-URI chunks, so resolve by URI match against
                    // the already-filtered source list.
                    sources.iter().find(|s| s.url == chunk.uri).cloned()
                })
                .collect();

            if segments.is_empty() {
                return None;
            }

            Some(Citation {
                start_index: start,
                end_index: end,
                segments,
            })
        })
        .collect()
}
