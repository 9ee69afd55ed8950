//! Page fetching for results whose snippet is not enough.

use super::html::{collapse_whitespace, extract_text_from_html, truncate_chars};
use crate::error::SearchError;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Retrieves the readable text of a web page.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_text(&self, url: &str) -> Result<String, SearchError>;
}

/// Fetches over HTTP and strips markup from HTML responses.
pub struct HttpPageFetcher {
    client: Client,
}

impl HttpPageFetcher {
    pub const NAME: &'static str = "fetch";

    pub fn new(timeout_secs: u64) -> Result<Self, SearchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| SearchError::Request {
                backend: Self::NAME.to_string(),
                message: format!("Failed to create HTTP client: {}", e),
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, SearchError> {
        let parsed = url::Url::parse(url).map_err(|e| SearchError::Request {
            backend: Self::NAME.to_string(),
            message: format!("Invalid URL '{}': {}", url, e),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(SearchError::Request {
                backend: Self::NAME.to_string(),
                message: format!("URL must start with http:// or https://: {}", url),
            });
        }

        let response = self
            .client
            .get(parsed)
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

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let body = response.text().await.map_err(|e| SearchError::Parse {
            backend: Self::NAME.to_string(),
            message: e.to_string(),
        })?;

        if content_type.contains("text/html") || content_type.contains("application/xhtml") {
            Ok(extract_text_from_html(&body))
        } else {
            Ok(body)
        }
    }
}

/// Collapse page text onto one line and cap it at `max_chars`, appending
/// `...` when cut.
pub fn clean_page_text(text: &str, max_chars: usize) -> String {
    let text = collapse_whitespace(text);
    if text.chars().count() > max_chars {
        format!("{}...", truncate_chars(&text, max_chars))
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_page_text_collapses_and_truncates() {
        let text = "Line one\n\n   line   two\t\tthree";
        assert_eq!(clean_page_text(text, 100), "Line one line two three");

        let long = "abc ".repeat(50);
        let cleaned = clean_page_text(&long, 10);
        assert_eq!(cleaned, "abc abc ab...");
    }

    #[tokio::test]
    async fn test_fetch_rejects_non_http_url() {
        let fetcher = HttpPageFetcher::new(5).unwrap();
        let err = fetcher.fetch_text("ftp://example.com/file").await.unwrap_err();
        assert!(err.to_string().contains("http://"));

        let err = fetcher.fetch_text("not a url").await.unwrap_err();
        assert!(err.to_string().contains("Invalid URL"));
    }
}
