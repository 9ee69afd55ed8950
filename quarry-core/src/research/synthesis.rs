//! Report synthesis: rank evidence, have the primary model write the report,
//! then splice in visuals, a metadata header and the source list.

use super::evidence::Evidence;
use super::plan::Plan;
use super::prompts;
use super::report::{Report, ReportKind};
use super::visuals::VisualSummary;
use crate::brain::LlmProvider;
use crate::search::html::truncate_chars;
use chrono::Local;
use tracing::{info, warn};

const PROMPT_EVIDENCE_LIMIT: usize = 10;
const PROMPT_EVIDENCE_CHARS: usize = 500;
const SOURCE_LIST_LIMIT: usize = 10;
const BASIC_REPORT_FINDINGS: usize = 5;
const BASIC_FINDING_CHARS: usize = 300;
const EXECUTIVE_SUMMARY: &str = "## Executive Summary";

pub struct Synthesizer<'a> {
    llm: &'a dyn LlmProvider,
    visuals: &'a dyn VisualSummary,
}

impl<'a> Synthesizer<'a> {
    pub fn new(llm: &'a dyn LlmProvider, visuals: &'a dyn VisualSummary) -> Self {
        Self { llm, visuals }
    }

    /// Compose the final report. Never fails; without a model response the
    /// report is assembled from the top evidence directly.
    pub async fn create_report(&self, query: &str, plan: &Plan, evidence: &[Evidence]) -> Report {
        let ranked = rank_evidence(evidence);

        let prompt = prompts::synthesis(
            query,
            &format!("{:?}", plan.research_angles),
            &format!("{:?}", plan.focus_areas),
            &format_evidence(&ranked),
        );

        let content = match self.llm.invoke(&prompt).await {
            Ok(body) => {
                let visuals = self.visuals.generate_visual_summary(plan, &ranked);
                let body = insert_visuals(&body, &visuals);
                let body = add_metadata(&body, query, ranked.len());
                info!(sources = ranked.len(), "Report synthesized");
                add_sources(&body, &ranked)
            }
            Err(e) => {
                warn!(error = %e, "Synthesis failed, building basic report");
                basic_report(query, plan, &ranked)
            }
        };
        Report::new(content, ReportKind::Research)
    }
}

/// Evidence sorted by descending relevance; equal scores keep their order.
pub fn rank_evidence(evidence: &[Evidence]) -> Vec<Evidence> {
    let mut ranked = evidence.to_vec();
    ranked.sort_by(|a, b| b.relevance.total_cmp(&a.relevance));
    ranked
}

fn format_evidence(ranked: &[Evidence]) -> String {
    ranked
        .iter()
        .take(PROMPT_EVIDENCE_LIMIT)
        .enumerate()
        .map(|(i, e)| {
            format!(
                "\nEvidence {}:\n- Source: {}\n- Key Points: {}\n- Relevance Score: {:.2}\n",
                i + 1,
                e.title,
                truncate_chars(&e.evidence_text, PROMPT_EVIDENCE_CHARS),
                e.relevance
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Place the visuals block inside the report body.
///
/// Preferred spot is the end of the executive summary section. Without that
/// heading the block goes before the second level-2 heading, and as a last
/// resort in front of the whole document.
pub fn insert_visuals(report: &str, visuals: &str) -> String {
    if visuals.is_empty() {
        return report.to_string();
    }

    if let Some((before, after)) = report.split_once(EXECUTIVE_SUMMARY) {
        return match after.find("\n##") {
            Some(pos) if pos > 0 => format!(
                "{before}{EXECUTIVE_SUMMARY}{}\n\n{visuals}\n{}",
                &after[..pos],
                &after[pos..]
            ),
            _ => format!("{before}{EXECUTIVE_SUMMARY}{after}\n\n{visuals}"),
        };
    }

    if let Some(first) = report.find("\n## ")
        && let Some(offset) = report[first + 1..].find("\n## ")
    {
        let second = first + 1 + offset;
        return format!("{}\n\n{visuals}{}", &report[..second], &report[second..]);
    }

    format!("{visuals}\n\n{report}")
}

fn add_metadata(report: &str, query: &str, source_count: usize) -> String {
    format!(
        "**Research Date:** {}\n\n**Topic:** {query}\n\n**Sources Analyzed:** {source_count}\n\n---\n\n{report}",
        Local::now().format("%Y-%m-%d %H:%M")
    )
}

fn add_sources(report: &str, ranked: &[Evidence]) -> String {
    let mut out = format!("{report}\n\n## Evidence Sources\n\n");
    for (i, e) in ranked.iter().take(SOURCE_LIST_LIMIT).enumerate() {
        out.push_str(&format!("{}. [{}]({})\n", i + 1, e.title, e.source_url));
    }
    out
}

/// Deterministic report built from the top evidence alone.
pub fn basic_report(query: &str, plan: &Plan, ranked: &[Evidence]) -> String {
    let angles = if plan.research_angles.is_empty() {
        "multiple perspectives".to_string()
    } else {
        plan.research_angles.join(", ")
    };

    let mut out = format!(
        "# Research Report: {query}\n\n## Executive Summary\n\n\
         This research examined {query}. Analysis was conducted across {} sources \n\
         covering {angles}.\n\n## Key Findings\n\n",
        ranked.len()
    );
    for (i, e) in ranked.iter().take(BASIC_REPORT_FINDINGS).enumerate() {
        out.push_str(&format!(
            "\n### Finding {}: {}\n\n{}...\n\n*Source: {}*\n",
            i + 1,
            e.title,
            truncate_chars(&e.evidence_text, BASIC_FINDING_CHARS),
            e.source_url
        ));
    }
    out.push_str(
        "\n\n## Conclusion\n\nFurther research is recommended to fully understand all implications.\n",
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::MockLlmProvider;
    use crate::research::visuals::NoVisuals;
    use pretty_assertions::assert_eq;

    struct FixedVisuals(&'static str);

    impl VisualSummary for FixedVisuals {
        fn generate_visual_summary(&self, _plan: &Plan, _evidence: &[Evidence]) -> String {
            self.0.to_string()
        }
    }

    fn evidence(title: &str, relevance: f64) -> Evidence {
        Evidence {
            source_url: format!("https://{title}.example"),
            title: title.to_string(),
            evidence_text: format!("{title} findings"),
            relevance,
            raw_content: String::new(),
        }
    }

    #[test]
    fn test_rank_evidence_descending_and_stable() {
        let ranked = rank_evidence(&[
            evidence("a", 0.5),
            evidence("b", 0.9),
            evidence("c", 0.5),
        ]);
        let titles: Vec<_> = ranked.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_format_evidence_block() {
        let block = format_evidence(&[evidence("a", 0.876), evidence("b", 0.5)]);
        assert_eq!(
            block,
            "\nEvidence 1:\n- Source: a\n- Key Points: a findings\n- Relevance Score: 0.88\n\n\
             \nEvidence 2:\n- Source: b\n- Key Points: b findings\n- Relevance Score: 0.50\n"
        );
    }

    #[test]
    fn test_insert_visuals_after_executive_summary() {
        let report = "# Title\n\n## Executive Summary\n\nSummary text.\n\n## Findings\n\nMore.";
        assert_eq!(
            insert_visuals(report, "VIS"),
            "# Title\n\n## Executive Summary\n\nSummary text.\n\n\nVIS\n\n## Findings\n\nMore."
        );
    }

    #[test]
    fn test_insert_visuals_executive_summary_is_last_section() {
        let report = "# Title\n## Executive Summary\nOnly section.";
        assert_eq!(
            insert_visuals(report, "VIS"),
            "# Title\n## Executive Summary\nOnly section.\n\nVIS"
        );
    }

    #[test]
    fn test_insert_visuals_before_second_heading() {
        let report = "# Title\n## Intro\ntext\n## Body\nmore";
        assert_eq!(
            insert_visuals(report, "VIS"),
            "# Title\n## Intro\ntext\n\nVIS\n## Body\nmore"
        );
    }

    #[test]
    fn test_insert_visuals_prepends_with_single_heading() {
        let report = "# Title\n## Intro\ntext";
        assert_eq!(insert_visuals(report, "VIS"), "VIS\n\n# Title\n## Intro\ntext");

        // A leading heading has no newline before it, so only one boundary is found
        let report = "## Overview\ntext\n## Details\nmore";
        let out = insert_visuals(report, "VIS");
        assert_eq!(out, "VIS\n\n## Overview\ntext\n## Details\nmore");
        assert_eq!(out.matches("VIS").count(), 1);
    }

    #[test]
    fn test_insert_visuals_prepends_without_headings() {
        assert_eq!(insert_visuals("plain text", "VIS"), "VIS\n\nplain text");
        assert_eq!(insert_visuals("plain text", ""), "plain text");
    }

    #[test]
    fn test_basic_report_structure() {
        let plan = Plan {
            research_angles: vec![],
            search_queries: vec!["q".into()],
            focus_areas: vec!["f".into()],
        };
        let report = basic_report("wind power", &plan, &[evidence("a", 0.9)]);
        assert!(report.starts_with("# Research Report: wind power\n\n## Executive Summary"));
        assert!(report.contains("across 1 sources \ncovering multiple perspectives."));
        assert!(
            report.contains("### Finding 1: a\n\na findings...\n\n*Source: https://a.example*")
        );
        assert!(report.ends_with(
            "## Conclusion\n\nFurther research is recommended to fully understand all implications.\n"
        ));
    }

    #[tokio::test]
    async fn test_create_report_decorates_model_output() {
        let llm = MockLlmProvider::with_response(
            "# Report\n\n## Executive Summary\n\nShort.\n\n## Details\n\nLong.",
        );
        let visuals = FixedVisuals("## Visual Summary\n\n![Evidence Relevance](c.png)\n");
        let items = vec![evidence("low", 0.3), evidence("high", 0.95)];
        let report = Synthesizer::new(&llm, &visuals)
            .create_report("tidal energy", &Plan::default_for("tidal energy"), &items)
            .await;

        assert_eq!(report.kind, ReportKind::Research);
        assert!(report.content.starts_with("**Research Date:** "));
        assert!(
            report
                .content
                .contains("**Topic:** tidal energy\n\n**Sources Analyzed:** 2\n\n---\n\n# Report")
        );
        assert!(report.content.contains("Short.\n\n\n## Visual Summary"));
        assert!(report.content.ends_with(
            "## Evidence Sources\n\n1. [high](https://high.example)\n2. [low](https://low.example)\n"
        ));
        assert_eq!(report.image_references().len(), 1);

        let prompt = &llm.prompts()[0];
        assert!(prompt.contains("Evidence 1:\n- Source: high"));
        assert!(prompt.contains("Research Angles: [\"Academic perspective\""));
    }

    #[tokio::test]
    async fn test_create_report_model_failure_builds_basic_report() {
        let llm = MockLlmProvider::failing("500");
        let report = Synthesizer::new(&llm, &NoVisuals)
            .create_report("tidal energy", &Plan::default_for("tidal energy"), &[])
            .await;
        assert!(report.content.contains("Analysis was conducted across 0 sources"));
        assert!(!report.content.contains("## Evidence Sources"));
    }
}
