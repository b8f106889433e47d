//! Error types for the action layer.
//!
//! None of these reach the model as errors: the router renders them into
//! observation text. They exist so the clients stay testable on their own.

/// Search backend failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SearchError {
    #[error("search backend returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("search request timed out: {0}")]
    Timeout(String),

    #[error("search request failed: {0}")]
    Network(String),

    #[error("could not decode search response: {0}")]
    Decode(String),
}

/// Errors raised while wiring the action layer together.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("HTTP client setup failed: {0}")]
    HttpClient(String),

    #[error("not configured: {0}")]
    NotConfigured(String),
}

impl From<reqwest::Error> for ToolError {
    fn from(e: reqwest::Error) -> Self {
        Self::HttpClient(e.to_string())
    }
}
