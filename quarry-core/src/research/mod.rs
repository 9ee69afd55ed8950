//! Research pipeline.
//!
//! A request moves through these stages in order:
//! 1. **Transform** - rewrite the raw query into a research question
//! 2. **Plan** - angles, search queries and focus areas
//! 3. **Gate** - score the plan against the query
//! 4. Rejected plans get a disclaimer-wrapped **direct answer**; accepted
//!    plans go through **search**, **evidence extraction** and **synthesis**
//!
//! Each stage owns its fallback, so the engine always returns a report.

pub mod direct_answer;
pub mod engine;
pub mod evidence;
pub mod plan;
pub mod prompts;
pub mod query;
pub mod relevancy;
pub mod report;
pub mod session;
pub mod synthesis;
pub mod visuals;

pub use engine::ResearchEngine;
pub use evidence::Evidence;
pub use plan::Plan;
pub use query::Query;
pub use relevancy::RelevancyVerdict;
pub use report::{Report, ReportKind};
pub use session::{NoOpResearchCallback, RequestState, ResearchCallback, ResearchPhase};
pub use visuals::{NoVisuals, PngChartGenerator, VisualSummary};
