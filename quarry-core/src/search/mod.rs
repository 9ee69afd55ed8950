//! Search layer: a uniform result shape, the backend trait, ordered fallback
//! chains, and the executor that the research pipeline calls.
//!
//! Backends are tried strictly in priority order. The first one returning a
//! non-empty list wins; errors and empty lists advance to the next backend,
//! and an exhausted chain yields an empty list rather than an error.

pub mod academic;
pub mod executor;
pub mod fact_check;
pub mod fetch;
pub mod html;
pub mod web;
pub mod wikipedia;

pub use executor::SearchExecutor;
pub use fact_check::FactCheck;
pub use fetch::{HttpPageFetcher, PageFetcher};

use crate::error::SearchError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// One hit from any backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub snippet: String,
    pub url: String,
    /// Which backend produced the hit, e.g. `serper/google` or `wikipedia`.
    pub source_tag: String,
    /// Creation time, `%Y-%m-%d %H:%M:%S` local.
    pub timestamp: String,
}

impl SearchResult {
    pub fn new(
        title: impl Into<String>,
        snippet: impl Into<String>,
        url: impl Into<String>,
        source_tag: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            snippet: snippet.into(),
            url: url.into(),
            source_tag: source_tag.into(),
            timestamp: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }

    pub fn has_snippet(&self) -> bool {
        !self.snippet.trim().is_empty()
    }
}

/// A single search provider.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Short identifier used in logs and errors.
    fn name(&self) -> &str;

    async fn search(&self, query: &str, max_results: usize)
    -> Result<Vec<SearchResult>, SearchError>;
}

/// An ordered list of interchangeable backends.
#[derive(Clone, Default)]
pub struct BackendChain {
    label: String,
    backends: Vec<Arc<dyn SearchBackend>>,
}

impl BackendChain {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            backends: Vec::new(),
        }
    }

    pub fn with_backend(mut self, backend: Arc<dyn SearchBackend>) -> Self {
        self.backends.push(backend);
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn backend_names(&self) -> Vec<&str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// Try each backend in order; never fails.
    pub async fn search(&self, query: &str, max_results: usize) -> Vec<SearchResult> {
        for backend in &self.backends {
            match backend.search(query, max_results).await {
                Ok(results) if !results.is_empty() => {
                    info!(
                        chain = %self.label,
                        backend = backend.name(),
                        count = results.len(),
                        "Search successful"
                    );
                    return results;
                }
                Ok(_) => {
                    debug!(
                        chain = %self.label,
                        backend = backend.name(),
                        "Backend returned no results"
                    );
                }
                Err(SearchError::NotConfigured { backend, reason }) => {
                    debug!(chain = %self.label, %backend, %reason, "Skipping unconfigured backend");
                }
                Err(e) => {
                    warn!(chain = %self.label, backend = e.backend(), error = %e, "Backend failed");
                }
            }
        }
        warn!(chain = %self.label, query = %query, "All search backends failed");
        Vec::new()
    }
}

/// Deduplicate by URL, keeping the first occurrence. Results without a URL
/// are dropped since they cannot be cited.
pub fn dedup_by_url(results: Vec<SearchResult>) -> Vec<SearchResult> {
    let mut seen = HashSet::new();
    results
        .into_iter()
        .filter(|r| !r.url.is_empty() && seen.insert(r.url.clone()))
        .collect()
}

/// Build the HTTP client every backend uses.
pub(crate) fn http_client(
    backend: &str,
    timeout_secs: u64,
) -> Result<reqwest::Client, SearchError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(concat!("Quarry/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| SearchError::Request {
            backend: backend.to_string(),
            message: format!("Failed to create HTTP client: {}", e),
        })
}

/// Read an API key from the named environment variable; blank counts as unset.
pub(crate) fn key_from_env(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}

/// Send a request and decode the JSON body, mapping every failure to a
/// backend-tagged `SearchError`.
pub(crate) async fn send_json(
    backend: &str,
    request: reqwest::RequestBuilder,
) -> Result<serde_json::Value, SearchError> {
    let response = request.send().await.map_err(|e| SearchError::Request {
        backend: backend.to_string(),
        message: e.to_string(),
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(SearchError::Status {
            backend: backend.to_string(),
            status: status.as_u16(),
        });
    }

    response.json().await.map_err(|e| SearchError::Parse {
        backend: backend.to_string(),
        message: e.to_string(),
    })
}

/// String field of a JSON object, empty when absent.
pub(crate) fn str_field<'a>(value: &'a serde_json::Value, key: &str) -> &'a str {
    value.get(key).and_then(|v| v.as_str()).unwrap_or_default()
}
