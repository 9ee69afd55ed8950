//! Claim verification against encyclopedic sources.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::LazyLock;

use super::SearchResult;

static NON_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s]").expect("non-word regex is valid"));

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "from", "is", "was", "are", "were", "be", "been", "being", "have", "has", "had", "do",
    "does", "did", "will", "would", "should", "could", "may", "might", "must", "can", "what",
    "which", "who", "whom", "whose", "where", "when", "why", "how", "this", "that", "these",
    "those", "it", "its",
];

const MAX_KEYWORDS: usize = 5;

/// Outcome of checking one claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactCheck {
    pub claim: String,
    pub title: String,
    pub snippet: String,
    pub url: String,
    pub source_tag: String,
    /// Keyword overlap between claim and source, present only for
    /// encyclopedic matches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl FactCheck {
    pub fn from_encyclopedia(claim: &str, result: SearchResult) -> Self {
        let confidence = keyword_overlap(claim, &result.snippet);
        Self {
            confidence: Some(confidence),
            ..Self::from_result(claim, result)
        }
    }

    pub fn from_result(claim: &str, result: SearchResult) -> Self {
        Self {
            claim: claim.to_string(),
            title: result.title,
            snippet: result.snippet,
            url: result.url,
            source_tag: result.source_tag,
            confidence: None,
        }
    }

    pub fn unavailable(claim: &str) -> Self {
        Self {
            claim: claim.to_string(),
            title: "Fact check unavailable".to_string(),
            snippet: "Could not find reliable sources to verify this claim".to_string(),
            url: String::new(),
            source_tag: "none".to_string(),
            confidence: None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.source_tag != "none"
    }
}

/// Up to five distinct lowercase keywords, stop words and words of two or
/// fewer characters removed, in order of first appearance.
pub fn extract_keywords(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    text.to_lowercase()
        .split_whitespace()
        .map(|word| NON_WORD_RE.replace_all(word, "").into_owned())
        .filter(|word| word.chars().count() > 2 && !STOP_WORDS.contains(&word.as_str()))
        .filter(|word| seen.insert(word.clone()))
        .take(MAX_KEYWORDS)
        .collect()
}

/// Fraction of the claim's keywords that also occur among the content's keywords.
pub fn keyword_overlap(claim: &str, content: &str) -> f64 {
    let claim_words: HashSet<String> = extract_keywords(claim).into_iter().collect();
    if claim_words.is_empty() {
        return 0.0;
    }
    let content_words: HashSet<String> = extract_keywords(content).into_iter().collect();
    let overlap = claim_words.intersection(&content_words).count();
    (overlap as f64 / claim_words.len() as f64).min(1.0)
}
