//! General web search backends, in chain priority order: Serper (Google
//! results), DuckDuckGo instant answers, Bing Web Search, Google Custom Search.

use super::html::strip_tags;
use super::{SearchBackend, SearchResult, http_client, key_from_env, send_json, str_field};
use crate::config::SearchConfig;
use crate::error::SearchError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

fn not_configured(backend: &str, var: &str) -> SearchError {
    SearchError::NotConfigured {
        backend: backend.to_string(),
        reason: format!("{} not set", var),
    }
}

// ---------------------------------------------------------------------------
// Serper
// ---------------------------------------------------------------------------

/// Google results through google.serper.dev.
pub struct SerperBackend {
    client: Client,
    api_key: Option<String>,
    key_env: String,
}

impl SerperBackend {
    pub const NAME: &'static str = "serper";

    pub fn from_config(config: &SearchConfig) -> Result<Self, SearchError> {
        Ok(Self {
            client: http_client(Self::NAME, config.timeout_secs)?,
            api_key: key_from_env(&config.serper_api_key_env),
            key_env: config.serper_api_key_env.clone(),
        })
    }
}

#[async_trait]
impl SearchBackend for SerperBackend {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| not_configured(Self::NAME, &self.key_env))?;

        let request = self
            .client
            .post("https://google.serper.dev/search")
            .header("X-API-KEY", api_key)
            .json(&json!({"q": query, "num": max_results, "gl": "us", "hl": "en"}));
        let body = send_json(Self::NAME, request).await?;
        Ok(parse_serper_response(&body, max_results))
    }
}

/// Organic hits first `max_results`, then the answer box (if any) in front.
pub fn parse_serper_response(body: &Value, max_results: usize) -> Vec<SearchResult> {
    let mut results: Vec<SearchResult> = body
        .get("organic")
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .take(max_results)
                .map(|item| {
                    SearchResult::new(
                        str_field(item, "title"),
                        str_field(item, "snippet"),
                        str_field(item, "link"),
                        "serper/google",
                    )
                })
                .collect()
        })
        .unwrap_or_default();

    if let Some(answer) = body.get("answerBox") {
        let title = answer
            .get("title")
            .and_then(|v| v.as_str())
            .unwrap_or("Featured Answer");
        let snippet = answer
            .get("snippet")
            .or_else(|| answer.get("answer"))
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        results.insert(
            0,
            SearchResult::new(title, snippet, str_field(answer, "link"), "serper/featured"),
        );
    }

    results
}

// ---------------------------------------------------------------------------
// DuckDuckGo
// ---------------------------------------------------------------------------

/// DuckDuckGo instant answer API. Needs no key.
pub struct DuckDuckGoBackend {
    client: Client,
}

impl DuckDuckGoBackend {
    pub const NAME: &'static str = "duckduckgo";

    pub fn from_config(config: &SearchConfig) -> Result<Self, SearchError> {
        Ok(Self {
            client: http_client(Self::NAME, config.timeout_secs)?,
        })
    }
}

#[async_trait]
impl SearchBackend for DuckDuckGoBackend {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let url = format!(
            "https://api.duckduckgo.com/?q={}&format=json&no_html=1&skip_disambig=1",
            urlencoding::encode(query)
        );
        let body = send_json(Self::NAME, self.client.get(&url)).await?;
        Ok(parse_duckduckgo_response(&body, max_results))
    }
}

/// The abstract becomes a leading `duckduckgo/instant` hit; related topics
/// (flattening topic groups) and direct results fill the rest.
pub fn parse_duckduckgo_response(body: &Value, max_results: usize) -> Vec<SearchResult> {
    let mut topics = Vec::new();
    for key in ["Results", "RelatedTopics"] {
        if let Some(items) = body.get(key).and_then(|v| v.as_array()) {
            collect_topics(items, &mut topics);
        }
    }

    let mut results: Vec<SearchResult> = topics
        .into_iter()
        .take(max_results)
        .map(|topic| {
            let text = str_field(topic, "Text");
            let title = text.split(" - ").next().unwrap_or(text);
            SearchResult::new(title, text, str_field(topic, "FirstURL"), "duckduckgo")
        })
        .collect();

    let abstract_text = str_field(body, "AbstractText");
    if !abstract_text.is_empty() {
        let heading = str_field(body, "Heading");
        let title = if heading.is_empty() { "Quick Answer" } else { heading };
        results.insert(
            0,
            SearchResult::new(
                title,
                abstract_text,
                str_field(body, "AbstractURL"),
                "duckduckgo/instant",
            ),
        );
    }

    results
}

fn collect_topics<'a>(items: &'a [Value], out: &mut Vec<&'a Value>) {
    for item in items {
        if let Some(nested) = item.get("Topics").and_then(|v| v.as_array()) {
            collect_topics(nested, out);
        } else if !str_field(item, "Text").is_empty() {
            out.push(item);
        }
    }
}

// ---------------------------------------------------------------------------
// Bing
// ---------------------------------------------------------------------------

pub struct BingBackend {
    client: Client,
    api_key: Option<String>,
    key_env: String,
}

impl BingBackend {
    pub const NAME: &'static str = "bing";

    pub fn from_config(config: &SearchConfig) -> Result<Self, SearchError> {
        Ok(Self {
            client: http_client(Self::NAME, config.timeout_secs)?,
            api_key: key_from_env(&config.bing_api_key_env),
            key_env: config.bing_api_key_env.clone(),
        })
    }
}

#[async_trait]
impl SearchBackend for BingBackend {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| not_configured(Self::NAME, &self.key_env))?;

        let count = max_results.to_string();
        let request = self
            .client
            .get("https://api.bing.microsoft.com/v7.0/search")
            .header("Ocp-Apim-Subscription-Key", api_key)
            .query(&[
                ("q", query),
                ("count", count.as_str()),
                ("textDecorations", "false"),
                ("textFormat", "HTML"),
            ]);
        let body = send_json(Self::NAME, request).await?;
        Ok(parse_bing_response(&body, max_results))
    }
}

pub fn parse_bing_response(body: &Value, max_results: usize) -> Vec<SearchResult> {
    body.get("webPages")
        .and_then(|w| w.get("value"))
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .take(max_results)
                .map(|item| {
                    SearchResult::new(
                        str_field(item, "name"),
                        strip_tags(str_field(item, "snippet")),
                        str_field(item, "url"),
                        "bing",
                    )
                })
                .collect()
        })
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Google Custom Search
// ---------------------------------------------------------------------------

pub struct GoogleCustomBackend {
    client: Client,
    api_key: Option<String>,
    cx: Option<String>,
    key_env: String,
    cx_env: String,
}

impl GoogleCustomBackend {
    pub const NAME: &'static str = "google_custom";
    /// The API refuses more than ten results per request.
    const MAX_PER_REQUEST: usize = 10;

    pub fn from_config(config: &SearchConfig) -> Result<Self, SearchError> {
        Ok(Self {
            client: http_client(Self::NAME, config.timeout_secs)?,
            api_key: key_from_env(&config.google_api_key_env),
            cx: key_from_env(&config.google_cx_env),
            key_env: config.google_api_key_env.clone(),
            cx_env: config.google_cx_env.clone(),
        })
    }
}

#[async_trait]
impl SearchBackend for GoogleCustomBackend {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let (Some(api_key), Some(cx)) = (self.api_key.as_deref(), self.cx.as_deref()) else {
            return Err(not_configured(
                Self::NAME,
                &format!("{} or {}", self.key_env, self.cx_env),
            ));
        };

        let num = max_results.min(Self::MAX_PER_REQUEST).to_string();
        let request = self
            .client
            .get("https://www.googleapis.com/customsearch/v1")
            .query(&[("key", api_key), ("cx", cx), ("q", query), ("num", num.as_str())]);
        let body = send_json(Self::NAME, request).await?;
        Ok(parse_google_custom_response(&body, max_results))
    }
}

pub fn parse_google_custom_response(body: &Value, max_results: usize) -> Vec<SearchResult> {
    body.get("items")
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .take(max_results)
                .map(|item| {
                    SearchResult::new(
                        str_field(item, "title"),
                        str_field(item, "snippet"),
                        str_field(item, "link"),
                        "google_custom",
                    )
                })
                .collect()
        })
        .unwrap_or_default()
}
