//! Error types for the Quarry domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Only failures nobody below the agent loop can recover from are modelled
//! here; expected failures of actions (timeouts, blocked pages, empty search
//! results) are rendered into observation text instead.

use thiserror::Error;

/// The error a research run can return.
///
/// Configuration problems are reported by `quarry-config` before a run
/// starts, so the only fault left at this level is the model backend.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Model backend error: {0}")]
    Backend(#[from] BackendError),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Error)]
pub enum BackendError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by model backend, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response from model backend: {0}")]
    InvalidResponse(String),

    #[error("Model backend not configured: {0}")]
    NotConfigured(String),
}
