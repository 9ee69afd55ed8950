//! Scholarly backends: Google Scholar through Serper, then the arXiv
//! preprint archive.

use super::html::{collapse_whitespace, truncate_with_ellipsis};
use super::{SearchBackend, SearchResult, http_client, key_from_env, send_json, str_field};
use crate::config::SearchConfig;
use crate::error::SearchError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

/// arXiv abstracts are cut to this many characters, ellipsis included.
const ARXIV_ABSTRACT_MAX_CHARS: usize = 300;

pub struct ScholarBackend {
    client: Client,
    api_key: Option<String>,
    key_env: String,
}

impl ScholarBackend {
    pub const NAME: &'static str = "google_scholar";

    pub fn from_config(config: &SearchConfig) -> Result<Self, SearchError> {
        Ok(Self {
            client: http_client(Self::NAME, config.timeout_secs)?,
            api_key: key_from_env(&config.serper_api_key_env),
            key_env: config.serper_api_key_env.clone(),
        })
    }
}

#[async_trait]
impl SearchBackend for ScholarBackend {
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
            .ok_or_else(|| SearchError::NotConfigured {
                backend: Self::NAME.to_string(),
                reason: format!("{} not set", self.key_env),
            })?;

        let request = self
            .client
            .post("https://google.serper.dev/scholar")
            .header("X-API-KEY", api_key)
            .json(&json!({"q": query, "num": max_results}));
        let body = send_json(Self::NAME, request).await?;
        Ok(parse_scholar_response(&body, max_results))
    }
}

pub fn parse_scholar_response(body: &Value, max_results: usize) -> Vec<SearchResult> {
    body.get("organic")
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
                        "google_scholar",
                    )
                })
                .collect()
        })
        .unwrap_or_default()
}

/// arXiv Atom API. Needs no key.
pub struct ArxivBackend {
    client: Client,
}

impl ArxivBackend {
    pub const NAME: &'static str = "arxiv";

    pub fn from_config(config: &SearchConfig) -> Result<Self, SearchError> {
        Ok(Self {
            client: http_client(Self::NAME, config.timeout_secs)?,
        })
    }
}

#[async_trait]
impl SearchBackend for ArxivBackend {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let search_query = format!("all:{}", query);
        let max = max_results.to_string();
        let response = self
            .client
            .get("http://export.arxiv.org/api/query")
            .query(&[
                ("search_query", search_query.as_str()),
                ("start", "0"),
                ("max_results", max.as_str()),
                ("sortBy", "relevance"),
                ("sortOrder", "descending"),
            ])
            .send()
            .await
            .map_err(|e| SearchError::Request {
                backend: Self::NAME.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Status {
                backend: Self::NAME.to_string(),
                status: status.as_u16(),
            });
        }
        let xml = response.text().await.map_err(|e| SearchError::Parse {
            backend: Self::NAME.to_string(),
            message: e.to_string(),
        })?;
        Ok(parse_arxiv_feed(&xml, max_results))
    }
}

/// Parse an Atom feed into results. Entries without a title are skipped.
pub fn parse_arxiv_feed(xml: &str, max_results: usize) -> Vec<SearchResult> {
    extract_entries(xml)
        .into_iter()
        .filter_map(|entry| {
            let title = collapse_whitespace(&extract_tag_text(entry, "title")?);
            let summary =
                collapse_whitespace(&extract_tag_text(entry, "summary").unwrap_or_default());
            let url = alternate_link(entry)
                .or_else(|| extract_tag_text(entry, "id"))
                .unwrap_or_default();
            Some(SearchResult::new(
                title,
                truncate_with_ellipsis(&summary, ARXIV_ABSTRACT_MAX_CHARS),
                url,
                "arxiv",
            ))
        })
        .take(max_results)
        .collect()
}

/// All `<entry>...</entry>` blocks in document order.
fn extract_entries(xml: &str) -> Vec<&str> {
    let mut entries = Vec::new();
    let mut search_from = 0;
    while let Some(pos) = xml[search_from..].find("<entry>") {
        let start = search_from + pos;
        let Some(end_pos) = xml[start..].find("</entry>") else {
            break;
        };
        let end = start + end_pos + "</entry>".len();
        entries.push(&xml[start..end]);
        search_from = end;
    }
    entries
}

/// Text content of the first `<tag>...</tag>`, attributes allowed.
fn extract_tag_text(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{}", tag);
    let close = format!("</{}>", tag);

    let mut from = 0;
    let start_pos = loop {
        let pos = from + xml[from..].find(&open)?;
        // Reject prefixes such as <titleExtra> when looking for <title
        let next = xml[pos + open.len()..].chars().next()?;
        if next == '>' || next.is_whitespace() {
            break pos;
        }
        from = pos + open.len();
    };
    let content_start = xml[start_pos..].find('>')? + start_pos + 1;
    let content_end = xml[content_start..].find(&close)? + content_start;
    Some(xml[content_start..content_end].trim().to_string())
}

/// The `href` of the `rel="alternate"` link, i.e. the abstract page.
fn alternate_link(entry: &str) -> Option<String> {
    let mut search_from = 0;
    while let Some(pos) = entry[search_from..].find("<link") {
        let start = search_from + pos;
        let end = start + entry[start..].find('>')? + 1;
        let tag = &entry[start..end];
        if extract_attribute(tag, "rel").as_deref() == Some("alternate") {
            return extract_attribute(tag, "href");
        }
        search_from = end;
    }
    None
}

fn extract_attribute(tag: &str, attr: &str) -> Option<String> {
    let needle = format!(" {}=\"", attr);
    let start = tag.find(&needle)? + needle.len();
    let end = tag[start..].find('"')? + start;
    Some(tag[start..end].to_string())
}
