//! Encyclopedic fallback backend over the MediaWiki API.
//!
//! One request searches and pulls plain-text intro extracts for the hits.

use super::html::{strip_tags, truncate_chars};
use super::{SearchBackend, SearchResult, http_client, send_json, str_field};
use crate::config::SearchConfig;
use crate::error::SearchError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

/// Summaries longer than this are cut back to a sentence boundary.
const SUMMARY_MAX_CHARS: usize = 500;

pub struct WikipediaBackend {
    client: Client,
    endpoint: String,
}

impl WikipediaBackend {
    pub const NAME: &'static str = "wikipedia";

    pub fn from_config(config: &SearchConfig) -> Result<Self, SearchError> {
        Ok(Self {
            client: http_client(Self::NAME, config.timeout_secs)?,
            endpoint: "https://en.wikipedia.org/w/api.php".to_string(),
        })
    }
}

#[async_trait]
impl SearchBackend for WikipediaBackend {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let limit = max_results.to_string();
        let request = self.client.get(&self.endpoint).query(&[
            ("action", "query"),
            ("format", "json"),
            ("generator", "search"),
            ("gsrsearch", query),
            ("gsrlimit", limit.as_str()),
            ("prop", "extracts"),
            ("exintro", "1"),
            ("explaintext", "1"),
            ("exlimit", "max"),
            ("redirects", "1"),
        ]);
        let body = send_json(Self::NAME, request).await?;
        Ok(parse_wikipedia_response(&body, max_results))
    }
}

/// Pages come back keyed by page id; `index` restores search-rank order.
pub fn parse_wikipedia_response(body: &Value, max_results: usize) -> Vec<SearchResult> {
    let Some(pages) = body
        .get("query")
        .and_then(|q| q.get("pages"))
        .and_then(|p| p.as_object())
    else {
        return Vec::new();
    };

    let mut pages: Vec<&Value> = pages.values().collect();
    pages.sort_by_key(|p| p.get("index").and_then(|i| i.as_u64()).unwrap_or(u64::MAX));

    pages
        .into_iter()
        .filter(|p| !str_field(p, "title").is_empty())
        .take(max_results)
        .map(|page| {
            let title = str_field(page, "title");
            let summary = summarize(&strip_tags(str_field(page, "extract")));
            SearchResult::new(title, summary, article_url(title), "wikipedia")
        })
        .collect()
}

/// Canonical article URL for a page title.
pub fn article_url(title: &str) -> String {
    format!(
        "https://en.wikipedia.org/wiki/{}",
        urlencoding::encode(&title.replace(' ', "_"))
            .replace("%28", "(")
            .replace("%29", ")")
    )
}

/// Keep summaries within 500 chars, preferring to end on a full sentence.
pub fn summarize(text: &str) -> String {
    if text.chars().count() <= SUMMARY_MAX_CHARS {
        return text.to_string();
    }
    let head = truncate_chars(text, SUMMARY_MAX_CHARS);
    let sentences: Vec<&str> = head.split(". ").collect();
    if sentences.len() > 1 {
        format!("{}.", sentences[..sentences.len() - 1].join(". "))
    } else {
        format!("{}...", truncate_chars(text, SUMMARY_MAX_CHARS - 3))
    }
}
