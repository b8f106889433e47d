//! Action router: the single boundary between model-issued action
//! requests and their real effects.
//!
//! `dispatch` always returns a string: the value goes verbatim into the
//! transcript as an observation, so failures are rendered, never raised.

use std::sync::Arc;

use quarry_core::ActionSchema;
use serde_json::Value;
use tracing::{info, warn};

use crate::action::{self, Action, ActionKind};
use crate::fetch::PageReader;
use crate::search::{SearchBackend, format_results};

/// Per-session tally of executed actions. Reporting only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionCounters {
    searches: u32,
    fetches: u32,
}

impl SessionCounters {
    pub fn record(&mut self, kind: ActionKind) {
        match kind {
            ActionKind::Search => self.searches += 1,
            ActionKind::Fetch => self.fetches += 1,
        }
    }

    pub fn count(&self, kind: ActionKind) -> u32 {
        match kind {
            ActionKind::Search => self.searches,
            ActionKind::Fetch => self.fetches,
        }
    }

    pub fn total(&self) -> u32 {
        self.searches + self.fetches
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// e.g. `"2 search(es), 1 fetch(es)"`; fetches only appear once one ran.
    pub fn summary(&self) -> String {
        let mut parts = vec![format!("{} search(es)", self.searches)];
        if self.fetches > 0 {
            parts.push(format!("{} fetch(es)", self.fetches));
        }
        parts.join(", ")
    }
}

/// Routes action requests to the search backend and the page reader.
pub struct ActionRouter {
    search: Arc<dyn SearchBackend>,
    reader: Arc<dyn PageReader>,
    schemas: Vec<ActionSchema>,
    default_results: u32,
    counters: SessionCounters,
}

impl ActionRouter {
    pub fn new(search: Arc<dyn SearchBackend>, reader: Arc<dyn PageReader>) -> Self {
        Self {
            search,
            reader,
            schemas: action::schemas(),
            default_results: action::DEFAULT_NUM_RESULTS,
            counters: SessionCounters::default(),
        }
    }

    /// Results requested when a search leaves out `num_results`.
    pub fn with_default_results(mut self, default_results: u32) -> Self {
        self.default_results = default_results.max(1);
        self
    }

    /// The fixed action schemas offered to the model.
    pub fn schemas(&self) -> &[ActionSchema] {
        &self.schemas
    }

    pub fn counters(&self) -> &SessionCounters {
        &self.counters
    }

    pub fn reset_counters(&mut self) {
        self.counters.reset();
    }

    /// Execute one action request and return its textual result.
    pub async fn dispatch(&mut self, name: &str, arguments: &Value) -> String {
        let Some(action) = Action::parse_with_default(name, arguments, self.default_results) else {
            warn!(action = name, "Unknown action requested");
            return format!(
                "Error: Unknown tool '{name}'. Available tools: {}, {}.",
                action::SEARCH_ACTION,
                action::FETCH_ACTION
            );
        };

        self.counters.record(action.kind());

        match action {
            Action::Search { query, num_results } => {
                info!(
                    action = action::SEARCH_ACTION,
                    n = self.counters.count(ActionKind::Search),
                    query = %query,
                    "Searching"
                );
                self.run_search(&query, num_results).await
            }
            Action::Fetch { url } => {
                info!(
                    action = action::FETCH_ACTION,
                    n = self.counters.count(ActionKind::Fetch),
                    url = %url,
                    "Fetching page"
                );
                self.reader.read(&url).await.into_text()
            }
        }
    }

    async fn run_search(&self, query: &str, num_results: u32) -> String {
        match self.search.search(query, num_results).await {
            Ok(response) => format_results(&response, num_results as usize),
            Err(e) => {
                warn!(query, error = %e, "Search failed");
                format!("Error: Search for '{query}' failed: {e}")
            }
        }
    }
}
