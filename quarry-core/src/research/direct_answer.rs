//! Model-only answers, used when the relevancy gate rejects the plan, and
//! the static report for an empty query.

use super::prompts;
use super::report::{Report, ReportKind};
use crate::brain::LlmProvider;
use chrono::Local;
use tracing::{info, warn};

pub struct DirectAnswerGenerator<'a> {
    llm: &'a dyn LlmProvider,
}

impl<'a> DirectAnswerGenerator<'a> {
    pub fn new(llm: &'a dyn LlmProvider) -> Self {
        Self { llm }
    }

    /// Answer from the model's own knowledge, wrapped in a disclaimer.
    /// Never fails; a model error yields a static apology.
    pub async fn generate_answer(
        &self,
        original: &str,
        transformed: &str,
        relevancy_reasoning: &str,
    ) -> Report {
        let prompt = prompts::direct_answer(original, transformed, relevancy_reasoning);
        match self.llm.invoke(&prompt).await {
            Ok(answer) => {
                info!(chars = answer.len(), "Direct answer generated");
                Report::new(wrap_answer(original, &answer), ReportKind::DirectAnswer)
            }
            Err(e) => {
                warn!(error = %e, "Direct answer generation failed");
                Report::new(fallback_answer(original), ReportKind::DirectAnswer)
            }
        }
    }
}

fn wrap_answer(query: &str, answer: &str) -> String {
    let now = Local::now();
    format!(
        r#"---
Research Date: {date}
Topic: {query}
Sources Analyzed: 0
IMPORTANT: This report is LLM-generated (not based on external research)
---

# Research Report: {query}

## Disclaimer

**This report is generated directly by an AI language model and is not based on external research sources.**

The research plan generated for this query was determined to be insufficiently relevant to the original question. As a result, this response is based solely on the AI model's training data and may not reflect the most current information or external sources.

---

## Answer

{answer}

---

## Note

This response was generated because the automated research planning process could not identify sufficiently relevant search strategies for your query. For more accurate and up-to-date information, please consider:
- Refining your query to be more specific
- Conducting manual research using academic databases
- Consulting domain experts

---

*Report generated on {stamp}*
"#,
        date = now.format("%Y-%m-%d %H:%M"),
        stamp = now.format("%Y-%m-%d %H:%M:%S"),
    )
}

fn fallback_answer(query: &str) -> String {
    format!(
        r#"# Research Report: {query}

## Disclaimer

**This report is LLM-generated (not based on external research)**

## Answer

I apologize, but I was unable to generate a comprehensive answer for your query. The research planning process encountered issues, and direct answer generation also failed.

Please try:
- Rephrasing your query
- Being more specific about what you're looking for
- Breaking down complex questions into smaller parts

*Report generated on {stamp}*
"#,
        stamp = Local::now().format("%Y-%m-%d %H:%M:%S"),
    )
}

/// Static report for an empty or whitespace-only query.
pub fn empty_query_report() -> Report {
    let now = Local::now();
    let content = format!(
        r#"---
Research Date: {date}
Topic: (Empty Query)
Sources Analyzed: 0
---

# Error: No Query Provided

Please provide a research query to proceed.

**Examples of good queries:**
- "What are the benefits and risks of synthetic data in AI?"
- "How has machine learning evolved in healthcare?"
- "Compare renewable energy sources for industrial use"

*Generated on {stamp}*
"#,
        date = now.format("%Y-%m-%d %H:%M"),
        stamp = now.format("%Y-%m-%d %H:%M:%S"),
    );
    Report::new(content, ReportKind::Error)
}
