//! Research engine: sequences transformation, planning, the relevancy gate,
//! and either the direct-answer branch or search, extraction and synthesis.

use super::direct_answer::{DirectAnswerGenerator, empty_query_report};
use super::evidence::{Evidence, EvidenceExtractor};
use super::plan::{Plan, Planner};
use super::query::{Query, QueryTransformer};
use super::relevancy::RelevancyChecker;
use super::report::Report;
use super::session::{NoOpResearchCallback, RequestState, ResearchCallback, ResearchPhase};
use super::synthesis::Synthesizer;
use super::visuals::{NoVisuals, PngChartGenerator, VisualSummary};
use crate::brain::ModelGateway;
use crate::config::{QuarryConfig, SearchConfig};
use crate::error::Result;
use crate::providers::create_gateway;
use crate::search::{SearchExecutor, SearchResult, dedup_by_url};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The main research engine.
///
/// Every stage absorbs its own failures, so a run always ends with a report.
pub struct ResearchEngine {
    gateway: ModelGateway,
    executor: SearchExecutor,
    visuals: Arc<dyn VisualSummary>,
    callback: Arc<dyn ResearchCallback>,
    results_per_query: usize,
    fetch_missing_snippets: bool,
}

impl ResearchEngine {
    /// Create an engine without charts or progress reporting.
    pub fn new(gateway: ModelGateway, executor: SearchExecutor) -> Self {
        let defaults = SearchConfig::default();
        Self {
            gateway,
            executor,
            visuals: Arc::new(NoVisuals),
            callback: Arc::new(NoOpResearchCallback),
            results_per_query: defaults.results_per_query,
            fetch_missing_snippets: defaults.fetch_missing_snippets,
        }
    }

    /// Wire real providers, backends and charts from configuration.
    pub fn from_config(config: &QuarryConfig) -> Result<Self> {
        config.validate()?;
        let gateway = create_gateway(&config.llm)?;
        let executor = SearchExecutor::from_config(&config.search)?;
        let visuals: Arc<dyn VisualSummary> = if config.output.charts {
            Arc::new(PngChartGenerator::new(&config.output.dir))
        } else {
            Arc::new(NoVisuals)
        };

        Ok(Self::new(gateway, executor)
            .with_visuals(visuals)
            .with_results_per_query(config.search.results_per_query)
            .with_fetch_missing_snippets(config.search.fetch_missing_snippets))
    }

    pub fn with_visuals(mut self, visuals: Arc<dyn VisualSummary>) -> Self {
        self.visuals = visuals;
        self
    }

    pub fn with_callback(mut self, callback: Arc<dyn ResearchCallback>) -> Self {
        self.callback = callback;
        self
    }

    pub fn with_results_per_query(mut self, n: usize) -> Self {
        self.results_per_query = n;
        self
    }

    pub fn with_fetch_missing_snippets(mut self, enabled: bool) -> Self {
        self.fetch_missing_snippets = enabled;
        self
    }

    /// The search executor, for callers that search without researching.
    pub fn executor(&self) -> &SearchExecutor {
        &self.executor
    }

    /// Run one request and return only its report.
    pub async fn conduct_research(&self, raw_query: &str) -> Report {
        let state = self.run(raw_query).await;
        match state.report {
            Some(report) => report,
            // run() completes every state it returns
            None => empty_query_report(),
        }
    }

    /// Run one request end to end and return everything it produced.
    pub async fn run(&self, raw_query: &str) -> RequestState {
        let mut state = RequestState::new(raw_query);

        if raw_query.trim().is_empty() {
            warn!(request_id = %state.id, "Empty query, returning error report");
            state.complete(empty_query_report());
            self.notify(&state);
            return state;
        }

        info!(request_id = %state.id, query = %raw_query, "Research request started");
        let primary = self.gateway.primary.as_ref();
        let lightweight = self.gateway.lightweight.as_ref();

        self.enter(&mut state, ResearchPhase::Transforming);
        let query = QueryTransformer::new(lightweight).transform(raw_query).await;

        self.enter(&mut state, ResearchPhase::Planning);
        let plan = Planner::new(primary)
            .create_plan(query.research_query())
            .await;

        self.enter(&mut state, ResearchPhase::CheckingRelevancy);
        let verdict = RelevancyChecker::new(lightweight)
            .check_relevancy(&query, &plan)
            .await;

        if !verdict.is_relevant {
            info!(
                request_id = %state.id,
                score = verdict.score,
                "Plan rejected by relevancy gate, answering directly"
            );
            self.enter(&mut state, ResearchPhase::DirectAnswer);
            let report = DirectAnswerGenerator::new(primary)
                .generate_answer(&query.original, &query.transformed, &verdict.reasoning)
                .await;

            state.query = Some(query);
            state.plan = Some(plan);
            state.verdict = Some(verdict);
            state.complete(report);
            self.notify(&state);
            return state;
        }

        self.enter(&mut state, ResearchPhase::Searching);
        let results = self.gather_results(&plan).await;

        self.enter(&mut state, ResearchPhase::Extracting);
        let evidence = self.extract_evidence(&query, &plan, &results).await;

        self.enter(&mut state, ResearchPhase::Synthesizing);
        let report = Synthesizer::new(primary, self.visuals.as_ref())
            .create_report(query.research_query(), &plan, &evidence)
            .await;

        info!(
            request_id = %state.id,
            results = results.len(),
            evidence = evidence.len(),
            "Research request complete"
        );
        state.query = Some(query);
        state.plan = Some(plan);
        state.verdict = Some(verdict);
        state.search_results = results;
        state.evidence = evidence;
        state.complete(report);
        self.notify(&state);
        state
    }

    /// Run every planned query, falling back to the encyclopedic backend when
    /// the general chain finds nothing, then deduplicate by URL.
    async fn gather_results(&self, plan: &Plan) -> Vec<SearchResult> {
        let mut aggregated = Vec::new();
        for planned in &plan.search_queries {
            let mut hits = self.executor.search(planned, self.results_per_query).await;
            if hits.is_empty() {
                debug!(query = %planned, "General search empty, trying fallback");
                hits = self.executor.fallback_search(planned).await;
            }
            debug!(query = %planned, count = hits.len(), "Planned query done");
            aggregated.extend(hits);
        }

        let mut results = dedup_by_url(aggregated);
        if self.fetch_missing_snippets {
            for result in results.iter_mut().filter(|r| !r.has_snippet()) {
                if let Some(text) = self.executor.fetch_content(&result.url).await {
                    result.snippet = text;
                }
            }
        }
        info!(count = results.len(), "Search phase complete");
        results
    }

    async fn extract_evidence(
        &self,
        query: &Query,
        plan: &Plan,
        results: &[SearchResult],
    ) -> Vec<Evidence> {
        let extractor = EvidenceExtractor::new(self.gateway.primary.as_ref());
        let mut evidence = Vec::new();
        for result in results {
            if let Some(item) = extractor
                .extract(result, query.research_query(), &plan.focus_areas)
                .await
            {
                evidence.push(item);
            }
        }
        info!(count = evidence.len(), "Evidence extraction complete");
        evidence
    }

    fn enter(&self, state: &mut RequestState, phase: ResearchPhase) {
        state.transition(phase);
        debug!(request_id = %state.id, phase = %phase, "Research phase change");
        self.notify(state);
    }

    fn notify(&self, state: &RequestState) {
        self.callback
            .on_phase_change(state.phase, state.phase.progress());
    }
}
