//! The search executor: rate-limited access to the general, academic and
//! encyclopedic chains plus page fetching and fact checking.

use super::academic::{ArxivBackend, ScholarBackend};
use super::fact_check::{FactCheck, extract_keywords};
use super::fetch::{HttpPageFetcher, PageFetcher, clean_page_text};
use super::web::{BingBackend, DuckDuckGoBackend, GoogleCustomBackend, SerperBackend};
use super::wikipedia::WikipediaBackend;
use super::{BackendChain, SearchResult, dedup_by_url};
use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::providers::RequestWindowLimiter;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Query words that mark a query as academic in register.
const ACADEMIC_KEYWORDS: &[&str] = &[
    "research",
    "study",
    "analysis",
    "theory",
    "model",
    "algorithm",
    "method",
    "evaluation",
    "experiment",
];

const COMPREHENSIVE_WEB_RESULTS: usize = 3;
const COMPREHENSIVE_ENCYCLOPEDIC_RESULTS: usize = 2;
const COMPREHENSIVE_ACADEMIC_RESULTS: usize = 2;

pub struct SearchExecutor {
    general: BackendChain,
    academic: BackendChain,
    encyclopedic: BackendChain,
    fetcher: Arc<dyn PageFetcher>,
    limiter: Mutex<RequestWindowLimiter>,
    fallback_results: usize,
    fetch_max_chars: usize,
}

impl SearchExecutor {
    pub fn new(
        general: BackendChain,
        academic: BackendChain,
        encyclopedic: BackendChain,
        fetcher: Arc<dyn PageFetcher>,
    ) -> Self {
        let defaults = SearchConfig::default();
        Self {
            general,
            academic,
            encyclopedic,
            fetcher,
            limiter: Mutex::new(RequestWindowLimiter::per_minute(
                defaults.rate_limit_per_minute,
            )),
            fallback_results: defaults.fallback_results,
            fetch_max_chars: defaults.fetch_max_chars,
        }
    }

    /// Wire the production backends in their fixed priority order.
    pub fn from_config(config: &SearchConfig) -> Result<Self, SearchError> {
        let general = BackendChain::new("general")
            .with_backend(Arc::new(SerperBackend::from_config(config)?))
            .with_backend(Arc::new(DuckDuckGoBackend::from_config(config)?))
            .with_backend(Arc::new(BingBackend::from_config(config)?))
            .with_backend(Arc::new(GoogleCustomBackend::from_config(config)?));
        let academic = BackendChain::new("academic")
            .with_backend(Arc::new(ScholarBackend::from_config(config)?))
            .with_backend(Arc::new(ArxivBackend::from_config(config)?));
        let encyclopedic = BackendChain::new("encyclopedic")
            .with_backend(Arc::new(WikipediaBackend::from_config(config)?));
        let fetcher = Arc::new(HttpPageFetcher::new(config.timeout_secs)?);

        info!(
            general = ?general.backend_names(),
            academic = ?academic.backend_names(),
            rate_limit = config.rate_limit_per_minute,
            "Search executor ready"
        );

        Ok(Self::new(general, academic, encyclopedic, fetcher)
            .with_rate_limit(config.rate_limit_per_minute)
            .with_fallback_results(config.fallback_results)
            .with_fetch_max_chars(config.fetch_max_chars))
    }

    pub fn with_rate_limit(mut self, per_minute: usize) -> Self {
        self.limiter = Mutex::new(RequestWindowLimiter::per_minute(per_minute));
        self
    }

    pub fn with_fallback_results(mut self, n: usize) -> Self {
        self.fallback_results = n;
        self
    }

    pub fn with_fetch_max_chars(mut self, n: usize) -> Self {
        self.fetch_max_chars = n;
        self
    }

    /// Wait until the rolling window has room, then count this call.
    async fn throttle(&self) {
        let mut limiter = self.limiter.lock().await;
        if let Some(wait) = limiter.check() {
            info!(wait_secs = wait.as_secs_f64(), "Rate limit reached, waiting");
            tokio::time::sleep(wait).await;
        }
        limiter.record();
    }

    /// General web search through the backend chain. Never fails.
    pub async fn search(&self, query: &str, max_results: usize) -> Vec<SearchResult> {
        self.throttle().await;
        self.general.search(query, max_results).await
    }

    /// Scholarly search: Google Scholar, then arXiv. Never fails.
    pub async fn academic_search(&self, query: &str, max_results: usize) -> Vec<SearchResult> {
        self.throttle().await;
        self.academic.search(query, max_results).await
    }

    /// Encyclopedic search used when the general chain comes back empty.
    pub async fn fallback_search(&self, query: &str) -> Vec<SearchResult> {
        self.throttle().await;
        self.encyclopedic.search(query, self.fallback_results).await
    }

    /// General, encyclopedic and (for academic-register queries) scholarly
    /// results, concatenated and deduplicated by URL.
    pub async fn comprehensive_search(&self, query: &str) -> Vec<SearchResult> {
        let mut results = self.search(query, COMPREHENSIVE_WEB_RESULTS).await;

        self.throttle().await;
        results.extend(
            self.encyclopedic
                .search(query, COMPREHENSIVE_ENCYCLOPEDIC_RESULTS)
                .await,
        );

        if is_academic_query(query) {
            debug!(query = %query, "Academic register detected, adding scholarly results");
            results.extend(
                self.academic_search(query, COMPREHENSIVE_ACADEMIC_RESULTS)
                    .await,
            );
        }

        dedup_by_url(results)
    }

    /// Readable text of a page, or `None` if it could not be fetched.
    pub async fn fetch_content(&self, url: &str) -> Option<String> {
        match self.fetcher.fetch_text(url).await {
            Ok(text) => {
                let text = clean_page_text(&text, self.fetch_max_chars);
                if text.is_empty() { None } else { Some(text) }
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Failed to fetch content");
                None
            }
        }
    }

    /// Look for a source that speaks to `claim`. Never fails.
    pub async fn fact_check(&self, claim: &str) -> FactCheck {
        let keywords = extract_keywords(claim);
        if !keywords.is_empty() {
            self.throttle().await;
            let hits = self.encyclopedic.search(&keywords.join(" "), 1).await;
            if let Some(hit) = hits.into_iter().next() {
                return FactCheck::from_encyclopedia(claim, hit);
            }
        }

        let web = self.search(&format!("fact check {}", claim), 1).await;
        match web.into_iter().next() {
            Some(hit) => FactCheck::from_result(claim, hit),
            None => {
                warn!(claim = %claim, "No source found for fact check");
                FactCheck::unavailable(claim)
            }
        }
    }
}

fn is_academic_query(query: &str) -> bool {
    let lower = query.to_lowercase();
    ACADEMIC_KEYWORDS.iter().any(|k| lower.contains(k))
}

#[cfg(test)]
mod tests {
    use super::super::testing::{ScriptedBackend, hit};
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    struct StaticFetcher(Result<String, ()>);

    #[async_trait]
    impl PageFetcher for StaticFetcher {
        async fn fetch_text(&self, _url: &str) -> Result<String, SearchError> {
            self.0.clone().map_err(|_| SearchError::Status {
                backend: "fetch".into(),
                status: 404,
            })
        }
    }

    fn chain(label: &str, backend: Arc<ScriptedBackend>) -> BackendChain {
        BackendChain::new(label).with_backend(backend)
    }

    fn executor(
        general: Arc<ScriptedBackend>,
        academic: Arc<ScriptedBackend>,
        encyclopedic: Arc<ScriptedBackend>,
    ) -> SearchExecutor {
        SearchExecutor::new(
            chain("general", general),
            chain("academic", academic),
            chain("encyclopedic", encyclopedic),
            Arc::new(StaticFetcher(Ok("page\n\n  content".into()))),
        )
    }

    #[tokio::test]
    async fn test_search_all_backends_fail() {
        let exec = executor(
            Arc::new(ScriptedBackend::failing("web")),
            Arc::new(ScriptedBackend::failing("scholar")),
            Arc::new(ScriptedBackend::failing("wiki")),
        );
        assert!(exec.search("anything", 5).await.is_empty());
        assert!(exec.academic_search("anything", 5).await.is_empty());
        assert!(exec.fallback_search("anything").await.is_empty());
    }

    #[tokio::test]
    async fn test_fallback_search_uses_configured_count() {
        let wiki = Arc::new(ScriptedBackend::returning(
            "wiki",
            (0..5).map(|i| hit(&format!("https://w/{i}"))).collect(),
        ));
        let exec = executor(
            Arc::new(ScriptedBackend::failing("web")),
            Arc::new(ScriptedBackend::failing("scholar")),
            wiki.clone(),
        );
        assert_eq!(exec.fallback_search("rust").await.len(), 3);
        assert_eq!(wiki.call_count(), 1);
    }

    #[tokio::test]
    async fn test_comprehensive_search_dedups_and_gates_academic() {
        let web = Arc::new(ScriptedBackend::returning(
            "web",
            vec![hit("https://a"), hit("https://shared")],
        ));
        let wiki = Arc::new(ScriptedBackend::returning(
            "wiki",
            vec![hit("https://shared"), hit("https://w")],
        ));
        let scholar = Arc::new(ScriptedBackend::returning("scholar", vec![hit("https://s")]));
        let exec = executor(web, scholar.clone(), wiki);

        let plain = exec.comprehensive_search("rust async runtimes").await;
        let urls: Vec<&str> = plain.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a", "https://shared", "https://w"]);
        assert_eq!(scholar.call_count(), 0);

        let academic = exec.comprehensive_search("a study of rust adoption").await;
        assert_eq!(academic.len(), 4);
        assert_eq!(scholar.call_count(), 1);
    }

    #[tokio::test]
    async fn test_fact_check_prefers_encyclopedia() {
        let mut wiki_hit = hit("https://en.wikipedia.org/wiki/Paris");
        wiki_hit.snippet = "Paris is the capital of France.".into();
        let wiki = Arc::new(ScriptedBackend::returning("wiki", vec![wiki_hit]));
        let web = Arc::new(ScriptedBackend::returning("web", vec![hit("https://web")]));
        let exec = executor(web.clone(), Arc::new(ScriptedBackend::failing("s")), wiki);

        let check = exec.fact_check("Paris is the capital of France").await;
        assert!(check.is_available());
        assert_eq!(check.url, "https://en.wikipedia.org/wiki/Paris");
        assert_eq!(check.confidence, Some(1.0));
        assert_eq!(web.call_count(), 0);
    }

    #[tokio::test]
    async fn test_fact_check_falls_back_to_web_then_unavailable() {
        let web = Arc::new(ScriptedBackend::returning("web", vec![hit("https://web")]));
        let exec = executor(
            web.clone(),
            Arc::new(ScriptedBackend::failing("s")),
            Arc::new(ScriptedBackend::returning("wiki", vec![])),
        );
        let check = exec.fact_check("water boils at 100 degrees").await;
        assert_eq!(check.url, "https://web");
        assert_eq!(check.confidence, None);
        assert_eq!(
            web.calls.lock().unwrap()[0],
            "fact check water boils at 100 degrees"
        );

        let exec = executor(
            Arc::new(ScriptedBackend::failing("web")),
            Arc::new(ScriptedBackend::failing("s")),
            Arc::new(ScriptedBackend::failing("wiki")),
        );
        assert!(!exec.fact_check("anything at all").await.is_available());
    }

    #[tokio::test]
    async fn test_fetch_content() {
        let exec = executor(
            Arc::new(ScriptedBackend::failing("web")),
            Arc::new(ScriptedBackend::failing("s")),
            Arc::new(ScriptedBackend::failing("wiki")),
        )
        .with_fetch_max_chars(4);
        assert_eq!(
            exec.fetch_content("https://x").await.as_deref(),
            Some("page...")
        );

        let failing = SearchExecutor::new(
            BackendChain::new("g"),
            BackendChain::new("a"),
            BackendChain::new("e"),
            Arc::new(StaticFetcher(Err(()))),
        );
        assert!(failing.fetch_content("https://x").await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_waits_for_window() {
        let exec = executor(
            Arc::new(ScriptedBackend::returning("web", vec![hit("https://a")])),
            Arc::new(ScriptedBackend::failing("s")),
            Arc::new(ScriptedBackend::failing("wiki")),
        )
        .with_rate_limit(1);

        let start = tokio::time::Instant::now();
        exec.search("first", 1).await;
        assert!(start.elapsed() < Duration::from_secs(1));
        exec.search("second", 1).await;
        assert!(start.elapsed() >= Duration::from_secs(59));
    }

    #[test]
    fn test_is_academic_query() {
        assert!(is_academic_query("A STUDY of sleep"));
        assert!(!is_academic_query("best pizza in town"));
    }
}
