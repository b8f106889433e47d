//! Actions for the Quarry research agent.
//!
//! The model can request exactly two actions: a web search and a page
//! fetch. This crate holds the router that executes them, the search
//! backend client and the HTML content extraction pipeline.

pub mod action;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod router;
pub mod search;

use std::sync::Arc;

use quarry_config::AppConfig;

pub use action::{Action, ActionKind, FETCH_ACTION, SEARCH_ACTION};
pub use error::{SearchError, ToolError};
pub use extract::{Extraction, FailureReason, extract_document};
pub use fetch::{PageReader, WebPageReader};
pub use router::{ActionRouter, SessionCounters};
pub use search::{SearchBackend, SearchResponse, SerperClient};

/// Build the production router: Serper search plus the HTTP page reader.
pub fn build_router(config: &AppConfig) -> Result<ActionRouter, ToolError> {
    let api_key = config
        .search
        .api_key
        .clone()
        .ok_or_else(|| ToolError::NotConfigured("no Serper API key".into()))?;

    let search = SerperClient::new(api_key, &config.search)?;
    let reader = WebPageReader::new(&config.fetch)?;

    let router = ActionRouter::new(Arc::new(search), Arc::new(reader))
        .with_default_results(config.search.default_results);
    Ok(router)
}
