//! Weighted quality scoring (§4.4), grounded on `quality_validator.py`'s
//! `_score_completeness`, `_score_source_attribution`,
//! `_score_content_relevance`, `_score_format_consistency`,
//! `_calculate_error_rate`.

use crate::quality::classification::{classify, summarize, ClassificationSummary, SourceClass};
use crate::state::{Source, SourceTag};
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::time::Duration;

const CONNECTIVES: [&str; 6] = ["however", "therefore", "moreover", "additionally", "furthermore", "consequently"];
const ERROR_TOKENS: [&str; 5] = ["error", "failed", "failure", "exception", "undefined"];
const PLACEHOLDER_HOSTS: [&str; 2] = ["example.com", "placeholder"];

pub struct QualityInput<'a> {
    pub question: &'a str,
    pub final_answer: &'a str,
    pub sources: &'a [Source],
    pub source_tags: &'a [Option<SourceTag>],
    pub loops_executed: u32,
    pub total_queries: u32,
    pub response_time: Duration,
    pub has_citations: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QualityScores {
    pub completeness: f64,
    pub source_attribution: f64,
    pub content_relevance: f64,
    pub format_consistency: f64,
    pub error_rate: f64,
    pub response_time_secs: f64,
    pub overall: f64,
}

fn score_completeness(answer: &str) -> f64 {
    let char_len = answer.chars().count() as f64;
    let length_score = (char_len / 500.0).min(1.0);

    let sentence_count = answer.chars().filter(|c| matches!(c, '.' | '!' | '?')).count() as f64;
    let sentence_score = (sentence_count / 3.0).min(1.0);

    let lower = answer.to_lowercase();
    let connective_count = CONNECTIVES.iter().filter(|c| lower.contains(*c)).count() as f64;
    let connective_score = (connective_count / 3.0).min(1.0);

    0.5 * length_score + 0.3 * sentence_score + 0.2 * connective_score
}

fn score_source_attribution(answer: &str, sources: &[Source]) -> f64 {
    if sources.is_empty() {
        return 0.0;
    }

    let marker_pattern = Regex::new(r"\[[^\]]+\]\([^)]+\)").expect("static pattern");
    let marker_count = marker_pattern.find_iter(answer).count() as f64;
    let marker_ratio = (marker_count / sources.len() as f64).min(1.0);

    let url_hits = sources.iter().filter(|s| answer.contains(s.url.as_str())).count() as f64;
    let url_ratio = url_hits / sources.len() as f64;

    (marker_ratio + url_ratio) / 2.0
}

fn score_content_relevance(question: &str, answer: &str) -> f64 {
    let tokenize = |s: &str| -> HashSet<String> {
        s.to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.len() >= 3)
            .map(str::to_string)
            .collect()
    };

    let question_tokens = tokenize(question);
    let answer_tokens = tokenize(answer);

    let jaccard = if question_tokens.is_empty() && answer_tokens.is_empty() {
        0.0
    } else {
        let intersection = question_tokens.intersection(&answer_tokens).count() as f64;
        let union = question_tokens.union(&answer_tokens).count() as f64;
        if union == 0.0 {
            0.0
        } else {
            intersection / union
        }
    };

    let lower_question = question.to_lowercase();
    let interrogatives = [
        ("when", Regex::new(r"\b(19|20)\d{2}\b").expect("static pattern")),
        ("where", Regex::new(r"\b[A-Z][a-z]+\b").expect("static pattern")),
        ("who", Regex::new(r"\b[A-Z][a-z]+\b").expect("static pattern")),
        ("how many", Regex::new(r"\b\d+\b").expect("static pattern")),
    ];
    let bonus = interrogatives
        .iter()
        .find(|(word, _)| lower_question.contains(word))
        .map(|(_, pattern)| if pattern.is_match(answer) { 0.1 } else { 0.0 })
        .unwrap_or(0.0);

    (jaccard + bonus).min(1.0)
}

fn score_format_consistency(input: &QualityInput<'_>) -> f64 {
    let checks = [
        !input.final_answer.is_empty(),
        !input.sources.is_empty(),
        input.total_queries > 0,
        input.loops_executed <= 64,
    ];
    checks.iter().filter(|c| **c).count() as f64 / checks.len() as f64
}

fn calculate_error_rate(answer: &str, sources: &[Source]) -> f64 {
    let lower = answer.to_lowercase();
    let error_tokens = ERROR_TOKENS.iter().filter(|t| lower.contains(*t)).count() as f64;

    let placeholder_sources = sources
        .iter()
        .filter(|s| PLACEHOLDER_HOSTS.iter().any(|host| s.url.contains(host)))
        .count() as f64;

    let normalizer = sources.len() as f64 + 1.0;
    ((error_tokens + placeholder_sources) / normalizer).min(1.0)
}

pub fn score(input: &QualityInput<'_>) -> QualityScores {
    let completeness = score_completeness(input.final_answer);
    let source_attribution = score_source_attribution(input.final_answer, input.sources);
    let content_relevance = score_content_relevance(input.question, input.final_answer);
    let format_consistency = score_format_consistency(input);
    let error_rate = calculate_error_rate(input.final_answer, input.sources);
    let response_time_secs = input.response_time.as_secs_f64();

    let overall = 0.30 * completeness
        + 0.25 * source_attribution
        + 0.25 * content_relevance
        + 0.10 * format_consistency
        + 0.10 * (1.0 - error_rate);

    QualityScores {
        completeness,
        source_attribution,
        content_relevance,
        format_consistency,
        error_rate,
        response_time_secs,
        overall,
    }
}

/// Classification and graduated-filtering view over a gathered source list
/// (§4.4's "Source classification" plus the quality-threshold pre-finalization
/// filter). Field names follow §4.4's documented summary shape
/// `{total, included, filtered, average_score, threshold}`.
pub struct QualitySummary {
    pub total: usize,
    pub included: usize,
    pub filtered: usize,
    pub average_score: f64,
    pub threshold: f64,
    pub classification: ClassificationSummary,
    pub retained_sources: Vec<Source>,
    pub filtered_sources: Vec<Source>,
}

/// Drops a source when its classification's quality score falls below
/// `threshold`, or when it is knowledge-base-fallback and a real-search
/// source is present elsewhere in the set. Never empties the retained set:
/// if every source would otherwise be filtered, all are kept instead.
pub fn summarize_and_filter(sources: &[Source], tags: &[Option<SourceTag>], threshold: f64) -> QualitySummary {
    let classes: Vec<SourceClass> = sources
        .iter()
        .zip(tags.iter().copied().chain(std::iter::repeat(None)))
        .map(|(source, tag)| classify(source, tag))
        .collect();

    let classification = summarize(&classes);
    let scores: Vec<f64> = classes.iter().map(|class| class.quality_score()).collect();
    let average_score = if scores.is_empty() {
        0.0
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    };

    let mut retained_sources = Vec::new();
    let mut filtered_sources = Vec::new();
    for ((source, class), score) in sources.iter().zip(classes.iter()).zip(scores.iter()) {
        let below_threshold = *score < threshold;
        let superseded_fallback = classification.has_real_search && matches!(class, SourceClass::KnowledgeBaseFallback);
        if below_threshold || superseded_fallback {
            filtered_sources.push(source.clone());
        } else {
            retained_sources.push(source.clone());
        }
    }

    if retained_sources.is_empty() && !sources.is_empty() {
        retained_sources = sources.to_vec();
        filtered_sources.clear();
    }

    QualitySummary {
        total: sources.len(),
        included: retained_sources.len(),
        filtered: filtered_sources.len(),
        average_score,
        threshold,
        classification,
        retained_sources,
        filtered_sources,
    }
}
