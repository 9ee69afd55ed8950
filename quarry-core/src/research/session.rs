//! Request-scoped pipeline state.
//!
//! One `RequestState` is created per research request, threaded through the
//! stages by the engine, and handed back to the caller. Nothing is shared
//! between requests or persisted.

use super::evidence::Evidence;
use super::plan::Plan;
use super::query::Query;
use super::relevancy::RelevancyVerdict;
use super::report::Report;
use crate::search::SearchResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current phase of a research request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResearchPhase {
    /// Rewriting the raw query.
    Transforming,
    /// Building the research plan.
    Planning,
    /// Scoring the plan against the query.
    CheckingRelevancy,
    /// Running the planned queries.
    Searching,
    /// Pulling evidence out of search results.
    Extracting,
    /// Writing the final report.
    Synthesizing,
    /// Answering from the model alone after a rejected plan.
    DirectAnswer,
    /// A report is available.
    Complete,
}

impl ResearchPhase {
    /// Rough share of the pipeline completed when this phase starts.
    pub fn progress(self) -> f64 {
        match self {
            ResearchPhase::Transforming => 0.05,
            ResearchPhase::Planning => 0.15,
            ResearchPhase::CheckingRelevancy => 0.25,
            ResearchPhase::Searching => 0.35,
            ResearchPhase::Extracting => 0.55,
            ResearchPhase::Synthesizing => 0.8,
            ResearchPhase::DirectAnswer => 0.5,
            ResearchPhase::Complete => 1.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResearchPhase::Transforming => "transforming",
            ResearchPhase::Planning => "planning",
            ResearchPhase::CheckingRelevancy => "checking_relevancy",
            ResearchPhase::Searching => "searching",
            ResearchPhase::Extracting => "extracting",
            ResearchPhase::Synthesizing => "synthesizing",
            ResearchPhase::DirectAnswer => "direct_answer",
            ResearchPhase::Complete => "complete",
        }
    }
}

impl std::fmt::Display for ResearchPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything one request produced, stage by stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestState {
    pub id: Uuid,
    pub raw_query: String,
    pub phase: ResearchPhase,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub query: Option<Query>,
    pub plan: Option<Plan>,
    pub verdict: Option<RelevancyVerdict>,
    pub search_results: Vec<SearchResult>,
    pub evidence: Vec<Evidence>,
    pub report: Option<Report>,
    /// True only on the direct-answer branch.
    pub is_llm_generated: bool,
}

impl RequestState {
    pub fn new(raw_query: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            raw_query: raw_query.into(),
            phase: ResearchPhase::Transforming,
            started_at: now,
            updated_at: now,
            query: None,
            plan: None,
            verdict: None,
            search_results: Vec::new(),
            evidence: Vec::new(),
            report: None,
            is_llm_generated: false,
        }
    }

    /// Transition to a new phase.
    pub fn transition(&mut self, phase: ResearchPhase) {
        self.phase = phase;
        self.updated_at = Utc::now();
    }

    /// Store the report and mark the request complete.
    pub fn complete(&mut self, report: Report) {
        self.is_llm_generated = report.is_llm_generated();
        self.report = Some(report);
        self.transition(ResearchPhase::Complete);
    }
}

/// Callback for research progress updates.
pub trait ResearchCallback: Send + Sync {
    /// Called when the pipeline enters a new phase.
    fn on_phase_change(&self, phase: ResearchPhase, progress: f64);
}

/// A no-op callback.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpResearchCallback;

impl ResearchCallback for NoOpResearchCallback {
    fn on_phase_change(&self, _phase: ResearchPhase, _progress: f64) {}
}
