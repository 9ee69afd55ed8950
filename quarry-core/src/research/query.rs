//! Query transformation: decide whether a raw query is research-ready and,
//! if not, have the lightweight model rewrite it.

use super::prompts;
use crate::brain::LlmProvider;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

const RESEARCH_INDICATORS: &[&str] = &[
    "analyze",
    "evaluate",
    "compare",
    "examine",
    "investigate",
    "research",
    "study",
    "assess",
    "implications",
    "impact",
    "effects",
    "benefits",
    "risks",
    "challenges",
    "advantages",
    "disadvantages",
];

/// Keyword to focus label, first match wins.
const FOCUS_TABLE: &[(&str, &str)] = &[
    ("risk", "risk analysis"),
    ("benefit", "benefits assessment"),
    ("impact", "impact analysis"),
    ("compare", "comparative analysis"),
    ("future", "future implications"),
    ("ethical", "ethical considerations"),
    ("technical", "technical analysis"),
    ("economic", "economic impact"),
];

const DEFAULT_WELL_FORMED_FOCUS: &str = "comprehensive analysis";
const DEFAULT_FOCUS: &str = "general analysis";

/// How the research query was arrived at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryOrigin {
    /// The raw query passed the well-formedness check unchanged.
    AlreadyWellFormed,
    /// The lightweight model rewrote it.
    ModelRewrite,
    /// The model call failed; whitespace cleanup and framing were applied.
    CleanupFallback,
}

/// A user query and its research-ready form. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub original: String,
    pub transformed: String,
    pub focus: String,
    /// True only on the model-rewrite path; `origin` tells the two false
    /// cases apart.
    pub was_transformed: bool,
    pub origin: QueryOrigin,
}

impl Query {
    /// The text downstream stages work with.
    pub fn research_query(&self) -> &str {
        &self.transformed
    }
}

/// Rewrites raw queries with the lightweight model.
pub struct QueryTransformer<'a> {
    llm: &'a dyn LlmProvider,
}

impl<'a> QueryTransformer<'a> {
    pub fn new(llm: &'a dyn LlmProvider) -> Self {
        Self { llm }
    }

    pub async fn transform(&self, raw_query: &str) -> Query {
        if is_well_formed(raw_query) {
            debug!("Query already well-formed, skipping rewrite");
            return Query {
                original: raw_query.to_string(),
                transformed: raw_query.to_string(),
                focus: focus_for(raw_query).to_string(),
                was_transformed: false,
                origin: QueryOrigin::AlreadyWellFormed,
            };
        }

        match self.llm.invoke(&prompts::query_transform(raw_query)).await {
            Ok(response) => {
                let (transformed, focus) = parse_transform_response(&response, raw_query);
                info!(focus = %focus, "Query rewritten by model");
                Query {
                    original: raw_query.to_string(),
                    transformed,
                    focus,
                    was_transformed: true,
                    origin: QueryOrigin::ModelRewrite,
                }
            }
            Err(e) => {
                warn!(error = %e, "Query transformation failed, using cleanup fallback");
                Query {
                    original: raw_query.to_string(),
                    transformed: basic_cleanup(raw_query),
                    focus: DEFAULT_FOCUS.to_string(),
                    was_transformed: false,
                    origin: QueryOrigin::CleanupFallback,
                }
            }
        }
    }
}

/// A query is research-ready when it carries a research-intent word, is
/// strictly between 100 and 500 characters, and has at least 5 words.
pub fn is_well_formed(query: &str) -> bool {
    let lower = query.to_lowercase();
    let has_research_words = RESEARCH_INDICATORS.iter().any(|w| lower.contains(w));
    let len = query.chars().count();
    let has_good_length = len > 100 && len < 500;
    let has_specificity = query.split_whitespace().count() >= 5;
    has_research_words && has_good_length && has_specificity
}

pub fn focus_for(query: &str) -> &'static str {
    let lower = query.to_lowercase();
    FOCUS_TABLE
        .iter()
        .find(|(keyword, _)| lower.contains(keyword))
        .map(|(_, focus)| *focus)
        .unwrap_or(DEFAULT_WELL_FORMED_FOCUS)
}

/// Pull `(transformed, focus)` out of a rewrite response.
///
/// Recognises `Transformed:`/`Query:` and `Focus:`/`Research focus:` lines in
/// any case. A single-line response longer than 20 characters is taken as the
/// transformed query itself.
pub fn parse_transform_response(response: &str, original: &str) -> (String, String) {
    let lines: Vec<&str> = response.trim().lines().collect();
    let single_line = lines.len() == 1;

    let mut transformed = original.to_string();
    let mut focus = DEFAULT_FOCUS.to_string();

    for line in lines {
        let line = line.trim();
        let lower = line.to_lowercase();
        if lower.starts_with("transformed:") || lower.starts_with("query:") {
            transformed = after_colon(line).trim_matches(['"', '\'']).to_string();
        } else if lower.starts_with("focus:") || lower.starts_with("research focus:") {
            focus = after_colon(line).to_string();
        } else if single_line && line.chars().count() > 20 {
            transformed = line.trim_matches(['"', '\'']).to_string();
        }
    }

    if transformed.is_empty() {
        transformed = original.to_string();
    }
    (transformed, focus)
}

fn after_colon(line: &str) -> &str {
    line.split_once(':').map(|(_, rest)| rest.trim()).unwrap_or("")
}

/// Deterministic cleanup used when the model is unavailable.
pub fn basic_cleanup(query: &str) -> String {
    let mut cleaned = query.split_whitespace().collect::<Vec<_>>().join(" ");
    if !cleaned.ends_with(['?', '.', '!']) {
        cleaned.push('?');
    }
    if cleaned.split_whitespace().count() < 5 {
        cleaned = format!("What are the key aspects and implications of {cleaned}");
    }
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::MockLlmProvider;
    use pretty_assertions::assert_eq;

    const LONG_QUERY: &str = "Analyze the economic impact of large language models on software \
        engineering productivity across small and large organizations";

    #[test]
    fn test_is_well_formed() {
        assert!(LONG_QUERY.len() > 100);
        assert!(is_well_formed(LONG_QUERY));
        assert!(!is_well_formed("Analyze AI"));
        // Long enough but no research vocabulary
        assert!(!is_well_formed(&"tell me about the history of bread ".repeat(4)));
        // Exactly 100 characters is not strictly greater
        let hundred = format!("analyze {}", "x ".repeat(46));
        assert_eq!(hundred.chars().count(), 100);
        assert!(!is_well_formed(&hundred));
    }

    #[test]
    fn test_focus_table_first_match_wins() {
        assert_eq!(focus_for("risks and benefits of X"), "risk analysis");
        assert_eq!(focus_for("the benefit of the economic view"), "benefits assessment");
        assert_eq!(focus_for("ethical questions"), "ethical considerations");
        assert_eq!(focus_for("nothing in particular"), "comprehensive analysis");
    }

    #[test]
    fn test_parse_labelled_response() {
        let response = "Transformed: \"What are the effects of remote work on team productivity?\"\nFocus: productivity analysis";
        let (t, f) = parse_transform_response(response, "remote work");
        assert_eq!(t, "What are the effects of remote work on team productivity?");
        assert_eq!(f, "productivity analysis");
    }

    #[test]
    fn test_parse_aliases_case_insensitive() {
        let response = "QUERY: How do heat pumps perform in cold climates?\nresearch focus: performance";
        let (t, f) = parse_transform_response(response, "heat pumps");
        assert_eq!(t, "How do heat pumps perform in cold climates?");
        assert_eq!(f, "performance");
    }

    #[test]
    fn test_parse_single_line_response() {
        let (t, f) = parse_transform_response(
            "  'How does caffeine affect long-term memory formation?'  ",
            "coffee memory",
        );
        assert_eq!(t, "How does caffeine affect long-term memory formation?");
        assert_eq!(f, "general analysis");

        // Too short to count as a rewrite
        let (t, _) = parse_transform_response("short answer", "orig");
        assert_eq!(t, "orig");
    }

    #[test]
    fn test_parse_empty_transformed_keeps_original() {
        let (t, _) = parse_transform_response("Transformed:\nFocus: x", "original query");
        assert_eq!(t, "original query");
    }

    #[test]
    fn test_basic_cleanup() {
        assert_eq!(
            basic_cleanup("  rust   borrow checker "),
            "What are the key aspects and implications of rust borrow checker?"
        );
        assert_eq!(
            basic_cleanup("how does the rust borrow checker work"),
            "how does the rust borrow checker work?"
        );
        assert_eq!(basic_cleanup("is this a complete sentence."), "is this a complete sentence.");
    }

    #[tokio::test]
    async fn test_transform_well_formed_skips_model() {
        let llm = MockLlmProvider::with_response("should not be used");
        let query = QueryTransformer::new(&llm).transform(LONG_QUERY).await;
        assert_eq!(query.transformed, LONG_QUERY);
        assert!(!query.was_transformed);
        assert_eq!(query.origin, QueryOrigin::AlreadyWellFormed);
        assert_eq!(query.focus, "impact analysis");
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_transform_model_rewrite() {
        let llm = MockLlmProvider::with_response(
            "Transformed: What are the benefits and risks of nuclear fusion?\nFocus: energy",
        );
        let query = QueryTransformer::new(&llm).transform("fusion good?").await;
        assert!(query.was_transformed);
        assert_eq!(query.origin, QueryOrigin::ModelRewrite);
        assert_eq!(query.transformed, "What are the benefits and risks of nuclear fusion?");
        assert_eq!(query.focus, "energy");
    }

    #[tokio::test]
    async fn test_transform_model_failure_uses_cleanup() {
        let llm = MockLlmProvider::failing("quota exceeded");
        let query = QueryTransformer::new(&llm).transform("fusion   power").await;
        assert!(!query.was_transformed);
        assert_eq!(query.origin, QueryOrigin::CleanupFallback);
        assert_eq!(
            query.transformed,
            "What are the key aspects and implications of fusion power?"
        );
        assert_eq!(query.focus, "general analysis");
        assert_eq!(query.original, "fusion   power");
    }
}
