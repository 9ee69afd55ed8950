//! Relevancy gate: the lightweight model scores how well a plan serves the
//! user's query, and the score is thresholded into a binary decision.

use super::plan::Plan;
use super::prompts;
use super::query::Query;
use crate::brain::LlmProvider;
use crate::search::html::truncate_chars;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Scores below this always reject the plan.
pub const RELEVANCY_THRESHOLD: f64 = 0.6;

const DEFAULT_SCORE: f64 = 0.5;
const MAX_REASONING_CHARS: usize = 500;
const NEGATIVE_KEYWORDS: &[&str] = &["not relevant", "irrelevant", "unrelated", "off-topic"];
const POSITIVE_KEYWORDS: &[&str] = &["relevant", "aligned", "appropriate", "matches"];

/// The gate's decision for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelevancyVerdict {
    pub is_relevant: bool,
    /// Always within `[0.0, 1.0]`.
    pub score: f64,
    pub reasoning: String,
}

impl RelevancyVerdict {
    /// Used when the checker itself is broken: proceed rather than block.
    pub fn permissive() -> Self {
        Self {
            is_relevant: true,
            score: 0.7,
            reasoning: "Relevancy check failed, proceeding with caution".to_string(),
        }
    }
}

pub struct RelevancyChecker<'a> {
    llm: &'a dyn LlmProvider,
}

impl<'a> RelevancyChecker<'a> {
    pub fn new(llm: &'a dyn LlmProvider) -> Self {
        Self { llm }
    }

    pub async fn check_relevancy(&self, query: &Query, plan: &Plan) -> RelevancyVerdict {
        let prompt = prompts::relevancy_check(
            &query.original,
            &query.transformed,
            &plan.research_angles.join(", "),
            &plan.search_queries.join("\n"),
            &plan.focus_areas.join(", "),
        );

        match self.llm.invoke(&prompt).await {
            Ok(response) => {
                let verdict = parse_relevancy_response(&response);
                info!(
                    score = verdict.score,
                    is_relevant = verdict.is_relevant,
                    "Relevancy check complete"
                );
                verdict
            }
            Err(e) => {
                warn!(error = %e, "Relevancy check failed, proceeding");
                RelevancyVerdict::permissive()
            }
        }
    }
}

/// Turn a free-form relevancy response into a verdict.
///
/// The positive keyword pass runs after the negative one, so a response
/// containing both (e.g. "not relevant" contains "relevant") ends up
/// relevant unless the score override applies.
pub fn parse_relevancy_response(response: &str) -> RelevancyVerdict {
    let score = extract_score(response);
    let lower = response.to_lowercase();

    let mut is_relevant = true;
    if NEGATIVE_KEYWORDS.iter().any(|k| lower.contains(k)) {
        is_relevant = false;
    }
    if POSITIVE_KEYWORDS.iter().any(|k| lower.contains(k)) {
        is_relevant = true;
    }
    if score < RELEVANCY_THRESHOLD {
        is_relevant = false;
    }

    RelevancyVerdict {
        is_relevant,
        score,
        reasoning: extract_reasoning(response),
    }
}

fn extract_score(response: &str) -> f64 {
    let parsed = response
        .lines()
        .find(|line| line.to_lowercase().contains("score:"))
        .and_then(|line| line.split(':').nth(1))
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|token| token.parse::<f64>().ok());

    match parsed {
        Some(score) if !score.is_nan() => score.clamp(0.0, 1.0),
        _ => DEFAULT_SCORE,
    }
}

fn extract_reasoning(response: &str) -> String {
    let lower = response.to_lowercase();
    // Lowercasing can change byte lengths, so only slice when offsets agree
    let after_marker = ["reasoning:", "reason:"].iter().find_map(|marker| {
        let pos = lower.find(marker)?;
        let start = pos + marker.len();
        (lower.len() == response.len() && response.is_char_boundary(start))
            .then(|| &response[start..])
    });

    let text = after_marker.unwrap_or(response).trim();
    truncate_chars(text, MAX_REASONING_CHARS).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::MockLlmProvider;
    use crate::research::query::QueryOrigin;
    use pretty_assertions::assert_eq;

    fn query() -> Query {
        Query {
            original: "solar power".into(),
            transformed: "What are the benefits of solar power?".into(),
            focus: "benefits assessment".into(),
            was_transformed: true,
            origin: QueryOrigin::ModelRewrite,
        }
    }

    #[test]
    fn test_parse_relevant_response() {
        let verdict = parse_relevancy_response(
            "Relevancy Score: 0.85\nIs Relevant: Yes\nReasoning: The plan is well aligned with the query.",
        );
        assert!(verdict.is_relevant);
        assert_eq!(verdict.score, 0.85);
        assert_eq!(verdict.reasoning, "The plan is well aligned with the query.");
    }

    #[test]
    fn test_low_score_overrides_keywords() {
        let verdict = parse_relevancy_response(
            "Relevancy Score: 0.4\nIs Relevant: Yes\nReasoning: Mostly relevant and aligned.",
        );
        assert!(!verdict.is_relevant);
        assert_eq!(verdict.score, 0.4);
    }

    #[test]
    fn test_negative_then_positive_keyword_ends_relevant() {
        // "not relevant" also contains "relevant"
        let verdict = parse_relevancy_response(
            "Relevancy Score: 0.7\nIs Relevant: No\nReasoning: The angles are not relevant.",
        );
        assert!(verdict.is_relevant);
    }

    #[test]
    fn test_negative_keyword_alone_rejects() {
        let verdict =
            parse_relevancy_response("Score: 0.9\nVerdict: off-topic\nReason: wrong subject");
        assert!(!verdict.is_relevant);
        assert_eq!(verdict.reasoning, "wrong subject");
    }

    #[test]
    fn test_missing_score_defaults_and_rejects() {
        let verdict = parse_relevancy_response("Looks fine to me, the plan matches.");
        assert_eq!(verdict.score, 0.5);
        assert!(!verdict.is_relevant);
        assert_eq!(verdict.reasoning, "Looks fine to me, the plan matches.");
    }

    #[test]
    fn test_score_is_clamped() {
        assert_eq!(parse_relevancy_response("Score: 7").score, 1.0);
        assert_eq!(parse_relevancy_response("Score: -2").score, 0.0);
        assert_eq!(parse_relevancy_response("Score: NaN").score, 0.5);
        assert_eq!(parse_relevancy_response("Score: high").score, 0.5);
    }

    #[test]
    fn test_reasoning_truncated_to_500_chars() {
        let response = format!("Score: 0.9\nReasoning: {}", "é".repeat(800));
        let verdict = parse_relevancy_response(&response);
        assert_eq!(verdict.reasoning.chars().count(), 500);
    }

    #[tokio::test]
    async fn test_check_relevancy_model_failure_is_permissive() {
        let llm = MockLlmProvider::failing("503");
        let verdict = RelevancyChecker::new(&llm)
            .check_relevancy(&query(), &Plan::default_for("solar power"))
            .await;
        assert!(verdict.is_relevant);
        assert_eq!(verdict.score, 0.7);
    }

    #[tokio::test]
    async fn test_check_relevancy_flattens_plan_into_prompt() {
        let llm = MockLlmProvider::with_response("Relevancy Score: 0.9\nReasoning: aligned");
        let plan = Plan {
            research_angles: vec!["Economic".into(), "Technical".into()],
            search_queries: vec!["solar cost".into(), "solar efficiency".into()],
            focus_areas: vec!["cost".into()],
        };
        let verdict = RelevancyChecker::new(&llm).check_relevancy(&query(), &plan).await;
        assert!(verdict.is_relevant);

        let prompt = &llm.prompts()[0];
        assert!(prompt.contains("- Research Angles: Economic, Technical"));
        assert!(prompt.contains("- Search Queries: solar cost\nsolar efficiency"));
        assert!(prompt.contains("Original User Query: solar power"));
    }
}
