//! Web search backend.
//!
//! The backend is an opaque JSON service: POST `{q, num}`, get back an
//! optional answer box and a list of organic results. `SerperClient` talks
//! to google.serper.dev; tests plug in their own [`SearchBackend`].

use std::time::Duration;

use async_trait::async_trait;
use quarry_config::SearchConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{SearchError, ToolError};

/// Returned when no organic result survives filtering and there is no
/// direct answer.
pub const NO_RESULTS: &str = "No results found.";

/// Raw search response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(rename = "answerBox", default, skip_serializing_if = "Option::is_none")]
    pub answer_box: Option<AnswerBox>,

    #[serde(default)]
    pub organic: Vec<OrganicResult>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnswerBox {
    #[serde(default)]
    pub answer: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrganicResult {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub snippet: Option<String>,
}

/// Anything that can answer a web search.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, query: &str, num_results: u32) -> Result<SearchResponse, SearchError>;
}

/// Render a search response the way the model reads it.
///
/// An optional `DIRECT ANSWER:` line comes first, then the first
/// `num_results` organic entries numbered from 1. Entries with neither a
/// title nor a URL are skipped.
pub fn format_results(response: &SearchResponse, num_results: usize) -> String {
    let mut blocks = Vec::new();

    if let Some(answer) = response
        .answer_box
        .as_ref()
        .and_then(|b| b.answer.as_deref())
        .filter(|a| !a.trim().is_empty())
    {
        blocks.push(format!("DIRECT ANSWER: {answer}"));
    }

    let entries = response
        .organic
        .iter()
        .take(num_results)
        .filter(|r| non_empty(&r.title).is_some() || non_empty(&r.link).is_some());

    for (i, result) in entries.enumerate() {
        blocks.push(format!(
            "Result {}:\n  Title:   {}\n  Summary: {}\n  URL:     {}\n",
            i + 1,
            non_empty(&result.title).unwrap_or("(untitled)"),
            non_empty(&result.snippet).unwrap_or(""),
            non_empty(&result.link).unwrap_or("(no URL)"),
        ));
    }

    if blocks.is_empty() {
        NO_RESULTS.to_string()
    } else {
        blocks.join("\n")
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// Serper.dev (Google) search client.
pub struct SerperClient {
    endpoint: String,
    api_key: String,
    max_results: u32,
    client: reqwest::Client,
}

impl SerperClient {
    pub fn new(api_key: impl Into<String>, config: &SearchConfig) -> Result<Self, ToolError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            endpoint: config.endpoint.clone(),
            api_key: api_key.into(),
            max_results: config.max_results,
            client,
        })
    }

    /// Point the client at a different endpoint (e.g., a local test server).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// The `num` actually sent: at least 1, at most the configured cap.
    pub fn clamp_results(&self, requested: u32) -> u32 {
        requested.clamp(1, self.max_results.max(1))
    }
}

#[derive(Serialize)]
struct SerperRequest<'a> {
    q: &'a str,
    num: u32,
}

#[async_trait]
impl SearchBackend for SerperClient {
    async fn search(&self, query: &str, num_results: u32) -> Result<SearchResponse, SearchError> {
        let num = self.clamp_results(num_results);
        debug!(query, num, "Sending search request");

        let response = self
            .client
            .post(&self.endpoint)
            .header("X-API-KEY", &self.api_key)
            .json(&SerperRequest { q: query, num })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SearchError::Timeout(e.to_string())
                } else {
                    SearchError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Http {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| SearchError::Decode(e.to_string()))
    }
}
