//! The terminal artifact of a request: markdown with embedded image links.

use chrono::{DateTime, Local};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::LazyLock;

static IMAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[([^\]]*)\]\(([^)]+)\)").expect("valid image regex"));
static BLANK_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid blank-run regex"));

/// Which branch of the pipeline produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    /// Full search, extraction and synthesis pipeline.
    Research,
    /// Model-only answer after the relevancy gate rejected the plan.
    DirectAnswer,
    /// Static error report, e.g. for an empty query.
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub content: String,
    pub kind: ReportKind,
    pub generated_at: DateTime<Local>,
}

/// An `![alt](path)` reference found in a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub alt: String,
    pub path: PathBuf,
}

impl Report {
    pub fn new(content: impl Into<String>, kind: ReportKind) -> Self {
        Self {
            content: content.into(),
            kind,
            generated_at: Local::now(),
        }
    }

    /// True when the content is not grounded in external sources.
    pub fn is_llm_generated(&self) -> bool {
        self.kind == ReportKind::DirectAnswer
    }

    /// Every embedded image, in document order.
    pub fn image_references(&self) -> Vec<ImageReference> {
        IMAGE_RE
            .captures_iter(&self.content)
            .map(|caps| ImageReference {
                alt: caps[1].to_string(),
                path: PathBuf::from(&caps[2]),
            })
            .collect()
    }

    /// The prose with image references removed, for terminal display.
    pub fn without_images(&self) -> String {
        let stripped = IMAGE_RE.replace_all(&self.content, "");
        BLANK_RUN_RE.replace_all(&stripped, "\n\n").trim().to_string()
    }
}

impl std::fmt::Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const CONTENT: &str = "# Report\n\n## Visual Summary\n\n![Evidence Relevance](outputs/evidence_relevance_20240101_120000.png)\n\n### Evidence Distribution\n\n![Evidence Distribution](outputs/d.png)\n\nBody text.";

    #[test]
    fn test_image_references_in_order() {
        let report = Report::new(CONTENT, ReportKind::Research);
        let images = report.image_references();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].alt, "Evidence Relevance");
        assert_eq!(
            images[0].path,
            PathBuf::from("outputs/evidence_relevance_20240101_120000.png")
        );
        assert_eq!(images[1].path, PathBuf::from("outputs/d.png"));
    }

    #[test]
    fn test_without_images_collapses_blank_lines() {
        let report = Report::new(CONTENT, ReportKind::Research);
        assert_eq!(
            report.without_images(),
            "# Report\n\n## Visual Summary\n\n### Evidence Distribution\n\nBody text."
        );
    }

    #[test]
    fn test_plain_links_are_not_images() {
        let report = Report::new("See [source](https://example.com).", ReportKind::Research);
        assert!(report.image_references().is_empty());
    }

    #[test]
    fn test_llm_generated_flag_follows_kind() {
        assert!(Report::new("x", ReportKind::DirectAnswer).is_llm_generated());
        assert!(!Report::new("x", ReportKind::Research).is_llm_generated());
        assert!(!Report::new("x", ReportKind::Error).is_llm_generated());
    }
}
