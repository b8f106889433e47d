//! Page fetching: the network half of the extraction pipeline.
//!
//! `WebPageReader` validates the URL, issues one GET with browser-like
//! headers, classifies transport and status failures, checks the content
//! type and hands the body to [`extract_document`]. There are no retries.

use std::time::Duration;

use async_trait::async_trait;
use quarry_config::FetchConfig;
use reqwest::header::{self, HeaderMap, HeaderValue};
use tracing::{debug, warn};

use crate::error::ToolError;
use crate::extract::{
    Extraction, FailureReason, extract_document, is_accepted_url, is_html_content_type,
};

/// Anything that can turn a URL into extracted page text.
#[async_trait]
pub trait PageReader: Send + Sync {
    async fn read(&self, url: &str) -> Extraction;
}

/// Reads pages over HTTP(S).
pub struct WebPageReader {
    client: reqwest::Client,
    timeout: Duration,
    max_chars: usize,
}

impl WebPageReader {
    pub fn new(config: &FetchConfig) -> Result<Self, ToolError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.5"),
        );

        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            timeout,
            max_chars: config.max_chars,
        })
    }

    fn transport_failure(&self, url: &str, error: &reqwest::Error) -> Extraction {
        if error.is_timeout() {
            Extraction::failed(
                FailureReason::Timeout,
                format!(
                    "Error: Page took too long to load (>{}s). Try a different URL.",
                    self.timeout.as_secs()
                ),
            )
        } else if error.is_connect() {
            Extraction::failed(
                FailureReason::ConnectionFailed,
                format!("Error: Could not connect to '{url}'. Check the URL or your internet connection."),
            )
        } else {
            Extraction::failed(
                FailureReason::Transport,
                format!("Error fetching '{url}': {error}"),
            )
        }
    }

    async fn fetch_and_extract(&self, url: &str) -> Extraction {
        if !is_accepted_url(url) {
            return Extraction::failed(
                FailureReason::InvalidUrl,
                format!("Error: Invalid URL '{url}'. Must start with http:// or https://"),
            );
        }

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => return self.transport_failure(url, &e),
        };

        let status = response.status();
        match status.as_u16() {
            403 => {
                return Extraction::failed(
                    FailureReason::Blocked,
                    format!("Error: Access denied (403). '{url}' blocks automated requests."),
                );
            }
            404 => {
                return Extraction::failed(
                    FailureReason::NotFound,
                    format!("Error: Page not found (404). '{url}' does not exist."),
                );
            }
            code if !status.is_success() => {
                return Extraction::failed(
                    FailureReason::HttpStatus(code),
                    format!("Error: HTTP {code} from '{url}'."),
                );
            }
            _ => {}
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        if !is_html_content_type(&content_type) {
            return Extraction::failed(
                FailureReason::UnsupportedType,
                format!(
                    "Error: Cannot read this file type (Content-Type: {content_type}). Only HTML pages are supported."
                ),
            );
        }

        let html = match response.text().await {
            Ok(html) => html,
            Err(e) => return self.transport_failure(url, &e),
        };
        debug!(url, bytes = html.len(), "Fetched page");

        extract_document(url, &html, self.max_chars)
    }
}

#[async_trait]
impl PageReader for WebPageReader {
    async fn read(&self, url: &str) -> Extraction {
        let extraction = self.fetch_and_extract(url).await;
        if let Some(reason) = extraction.failure_reason() {
            warn!(url, reason = reason.code(), "Page extraction failed");
        }
        extraction
    }
}
