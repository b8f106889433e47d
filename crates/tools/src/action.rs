//! The fixed action set.
//!
//! The model may request exactly two actions. Requests are parsed into the
//! closed [`Action`] enum; any other name is the single "unknown action"
//! case, handled by the router.

use quarry_core::ActionSchema;
use serde_json::Value;

pub const SEARCH_ACTION: &str = "web_search";
pub const FETCH_ACTION: &str = "web_scraper";

/// `num_results` when the model leaves it out.
pub const DEFAULT_NUM_RESULTS: u32 = 5;

/// Which of the two actions ran; the key of the session tallies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Search,
    Fetch,
}

impl ActionKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Search => SEARCH_ACTION,
            Self::Fetch => FETCH_ACTION,
        }
    }
}

/// A parsed action request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Search { query: String, num_results: u32 },
    Fetch { url: String },
}

impl Action {
    /// Parse an action by name, reading arguments leniently.
    ///
    /// Missing `query`/`url` become the empty string and a missing or
    /// unusable `num_results` becomes [`DEFAULT_NUM_RESULTS`]. Returns
    /// `None` only for an unknown name.
    pub fn parse(name: &str, arguments: &Value) -> Option<Self> {
        Self::parse_with_default(name, arguments, DEFAULT_NUM_RESULTS)
    }

    /// Like [`Action::parse`], with a caller-chosen `num_results` fallback.
    pub fn parse_with_default(name: &str, arguments: &Value, default_results: u32) -> Option<Self> {
        match name {
            SEARCH_ACTION => Some(Self::Search {
                query: string_arg(arguments, "query"),
                num_results: count_arg(arguments, "num_results").unwrap_or(default_results),
            }),
            FETCH_ACTION => Some(Self::Fetch {
                url: string_arg(arguments, "url"),
            }),
            _ => None,
        }
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Search { .. } => ActionKind::Search,
            Self::Fetch { .. } => ActionKind::Fetch,
        }
    }
}

fn string_arg(arguments: &Value, key: &str) -> String {
    match arguments.get(key) {
        Some(Value::String(s)) => s.clone(),
        None | Some(Value::Null) => String::new(),
        Some(other) => other.to_string(),
    }
}

fn count_arg(arguments: &Value, key: &str) -> Option<u32> {
    match arguments.get(key) {
        Some(Value::Number(n)) => n
            .as_u64()
            .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u32)),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Schemas for the two actions, in a fixed order.
pub fn schemas() -> Vec<ActionSchema> {
    vec![
        ActionSchema {
            name: SEARCH_ACTION.into(),
            description: "Search the web for current information. Use this for any question \
                          that needs up-to-date facts. Returns titles, summaries and URLs of \
                          the top results."
                .into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The search query. Specific queries give better results."
                    },
                    "num_results": {
                        "type": "integer",
                        "description": "Number of results to return (default 5, max 10).",
                        "default": DEFAULT_NUM_RESULTS
                    }
                },
                "required": ["query"]
            }),
        },
        ActionSchema {
            name: FETCH_ACTION.into(),
            description: "Fetch a web page and read its main text. Use this when search \
                          snippets are not detailed enough and the full article is needed."
                .into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "url": {
                        "type": "string",
                        "description": "Full URL to fetch, starting with http:// or https://."
                    }
                },
                "required": ["url"]
            }),
        },
    ]
}
