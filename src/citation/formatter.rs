//! Inline marker insertion and references-section rendering (§4.3),
//! grounded on `citation/citation_formatter.py`.

use crate::state::Citation;

/// Splice `" [n](url), [n](url), ..."` markers into `text` at each
/// citation's `end_index`. Citations are applied in descending `end_index`
/// order so earlier splices never shift the offsets later splices read.
/// Citations whose `end_index` exceeds `text`'s length, or whose segments
/// list is empty, are skipped.
pub fn insert_inline_citations(text: &str, citations: &[Citation]) -> String {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len() as i64;

    let mut ordered: Vec<&Citation> = citations
        .iter()
        .filter(|c| !c.segments.is_empty() && c.end_index >= 0 && c.end_index <= len)
        .collect();
    ordered.sort_by(|a, b| b.end_index.cmp(&a.end_index));

    let mut out = chars;
    for citation in ordered {
        let marker = build_marker(citation);
        let at = citation.end_index as usize;
        out.splice(at..at, marker.chars());
    }
    out.into_iter().collect()
}

fn build_marker(citation: &Citation) -> String {
    let parts: Vec<String> = citation
        .segments
        .iter()
        .enumerate()
        .map(|(i, source)| format!("[{n}]({url})", n = i + 1, url = source.url))
        .collect();
    format!(" {}", parts.join(", "))
}

/// Renders a Markdown "Sources" section listing every distinct source
/// referenced by `citations`, in first-appearance order.
pub fn format_citations_as_references(citations: &[Citation]) -> String {
    let mut seen = std::collections::HashSet::new();
    let mut lines = Vec::new();

    for citation in citations {
        for source in &citation.segments {
            if seen.insert(source.url.clone()) {
                lines.push(format!("- [{}]({})", source.title, source.url));
            }
        }
    }

    if lines.is_empty() {
        return String::new();
    }

    format!("## Sources\n{}", lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Source;

    fn citation(start: i64, end: i64, sources: Vec<Source>) -> Citation {
        Citation {
            start_index: start,
            end_index: end,
            segments: sources,
        }
    }

    #[test]
    fn splices_marker_at_end_index() {
        let text = "Paris is the capital of France.";
        let citations = vec![citation(
            0,
            9,
            vec![Source::new("Paris", "https://en.wikipedia.org/wiki/Paris")],
        )];
        let result = insert_inline_citations(text, &citations);
        assert!(result.starts_with("Paris is [1](https://en.wikipedia.org/wiki/Paris) the capital"));
    }

    #[test]
    fn applies_in_descending_order_without_shifting_earlier_offsets() {
        let text = "AB";
        let citations = vec![
            citation(0, 1, vec![Source::new("one", "https://one.example")]),
            citation(0, 2, vec![Source::new("two", "https://two.example")]),
        ];
        let result = insert_inline_citations(text, &citations);
        assert!(result.starts_with("A [1](https://one.example)B [1](https://two.example)"));
    }

    #[test]
    fn skips_out_of_range_citation() {
        let text = "short";
        let citations = vec![citation(0, 999, vec![Source::new("x", "https://x.example")])];
        assert_eq!(insert_inline_citations(text, &citations), text);
    }

    #[test]
    fn skips_citation_with_no_segments() {
        let text = "short";
        let citations = vec![citation(0, 3, vec![])];
        assert_eq!(insert_inline_citations(text, &citations), text);
    }

    #[test]
    fn references_section_dedupes_by_url_in_first_appearance_order() {
        let citations = vec![
            citation(0, 1, vec![Source::new("A", "https://a.example")]),
            citation(1, 2, vec![Source::new("A-dup", "https://a.example")]),
            citation(2, 3, vec![Source::new("B", "https://b.example")]),
        ];
        let rendered = format_citations_as_references(&citations);
        assert_eq!(
            rendered,
            "## Sources\n- [A](https://a.example)\n- [B](https://b.example)"
        );
    }

    #[test]
    fn references_section_empty_when_no_citations() {
        assert_eq!(format_citations_as_references(&[]), "");
    }
}
