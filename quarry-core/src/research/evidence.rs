//! Evidence extraction from individual search results.

use super::prompts;
use crate::brain::LlmProvider;
use crate::search::SearchResult;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const NEUTRAL_RELEVANCE: f64 = 0.5;
const FOCUS_BONUS: f64 = 0.3;

/// A scored summary of what one source says.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub source_url: String,
    pub title: String,
    pub evidence_text: String,
    /// Always within `[0.0, 1.0]`.
    pub relevance: f64,
    pub raw_content: String,
}

pub struct EvidenceExtractor<'a> {
    llm: &'a dyn LlmProvider,
}

impl<'a> EvidenceExtractor<'a> {
    pub fn new(llm: &'a dyn LlmProvider) -> Self {
        Self { llm }
    }

    /// Extract evidence from one result. `None` when the result has no
    /// snippet; a model failure falls back to the snippet itself.
    pub async fn extract(
        &self,
        result: &SearchResult,
        context: &str,
        focus_areas: &[String],
    ) -> Option<Evidence> {
        if !result.has_snippet() {
            debug!(url = %result.url, "Skipping result without snippet");
            return None;
        }

        let prompt = prompts::extraction(
            &result.title,
            &result.snippet,
            context,
            &focus_areas.join(", "),
        );
        let (evidence_text, relevance) = match self.llm.invoke(&prompt).await {
            Ok(text) => {
                let relevance = relevance_score(&text, focus_areas);
                (text, relevance)
            }
            Err(e) => {
                warn!(url = %result.url, error = %e, "Evidence extraction failed, using snippet");
                (result.snippet.clone(), NEUTRAL_RELEVANCE)
            }
        };

        Some(Evidence {
            source_url: non_empty_or(&result.url, "Unknown"),
            title: non_empty_or(&result.title, "Untitled"),
            evidence_text,
            relevance,
            raw_content: result.snippet.clone(),
        })
    }
}

/// Share of focus areas mentioned in the text plus a flat bonus, capped at
/// 1.0. Without focus areas the score is neutral.
pub fn relevance_score(evidence_text: &str, focus_areas: &[String]) -> f64 {
    if focus_areas.is_empty() {
        return NEUTRAL_RELEVANCE;
    }
    let lower = evidence_text.to_lowercase();
    let matches = focus_areas
        .iter()
        .filter(|area| lower.contains(&area.to_lowercase()))
        .count();
    (matches as f64 / focus_areas.len() as f64 + FOCUS_BONUS).min(1.0)
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::MockLlmProvider;
    use pretty_assertions::assert_eq;

    fn areas(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_relevance_score() {
        assert_eq!(relevance_score("anything", &[]), 0.5);
        assert_eq!(relevance_score("nothing here", &areas(&["cost", "safety"])), 0.3);
        assert_eq!(relevance_score("The COST is high", &areas(&["cost", "safety"])), 0.8);
        assert_eq!(relevance_score("cost and safety", &areas(&["cost", "safety"])), 1.0);
    }

    #[tokio::test]
    async fn test_extract_skips_empty_snippet() {
        let llm = MockLlmProvider::with_response("unused");
        let result = SearchResult::new("t", "   ", "https://a.example", "test");
        let evidence = EvidenceExtractor::new(&llm).extract(&result, "ctx", &[]).await;
        assert!(evidence.is_none());
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_extract_scores_model_output() {
        let llm = MockLlmProvider::with_response("Battery cost fell 80% in a decade.");
        let result = SearchResult::new("Batteries", "snippet", "https://a.example", "test");
        let evidence = EvidenceExtractor::new(&llm)
            .extract(&result, "battery economics", &areas(&["cost", "recycling"]))
            .await
            .unwrap();

        assert_eq!(evidence.evidence_text, "Battery cost fell 80% in a decade.");
        assert_eq!(evidence.relevance, 0.8);
        assert_eq!(evidence.raw_content, "snippet");
        assert!(llm.prompts()[0].contains("Focus Areas: cost, recycling"));
    }

    #[tokio::test]
    async fn test_extract_model_failure_uses_snippet() {
        let llm = MockLlmProvider::failing("timeout");
        let result = SearchResult::new("", "raw snippet text", "", "test");
        let evidence = EvidenceExtractor::new(&llm)
            .extract(&result, "ctx", &areas(&["raw"]))
            .await
            .unwrap();

        assert_eq!(evidence.evidence_text, "raw snippet text");
        assert_eq!(evidence.relevance, 0.5);
        assert_eq!(evidence.source_url, "Unknown");
        assert_eq!(evidence.title, "Untitled");
    }
}
