//! ModelBackend trait: the abstraction over the language model service.
//!
//! The backend is stateless: every request carries the instructions, the
//! action schemas and the *entire* transcript. A backend only answers; it
//! never executes actions itself.
//!
//! Implementations: Anthropic Messages API (see `quarry-providers`).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::BackendError;
use crate::message::{ActionRequest, ContentBlock, Transcript, collect_text};

/// Static descriptor of an action the model may request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionSchema {
    /// The action name
    pub name: String,

    /// Description of what the action does
    pub description: String,

    /// JSON Schema describing the action's parameters
    pub parameters: serde_json::Value,
}

/// One request to the model backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRequest {
    /// System instructions for this run
    pub instructions: String,

    /// Actions the model may request
    pub available_actions: Vec<ActionSchema>,

    /// The full transcript, replayed by value
    pub transcript: Transcript,
}

/// Why the backend stopped generating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionSignal {
    /// Natural end of an answer
    Answer,
    /// The content holds one or more action requests
    ActionRequest,
    /// Anything else (token limit, stop sequence, refusal...)
    Other(String),
}

impl std::fmt::Display for CompletionSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Answer => write!(f, "answer"),
            Self::ActionRequest => write!(f, "action_request"),
            Self::Other(reason) => write!(f, "{reason}"),
        }
    }
}

/// Token usage information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// A complete response from the model backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelResponse {
    pub completion_signal: CompletionSignal,

    /// Content blocks exactly as the backend produced them
    pub content: Vec<ContentBlock>,

    /// Which model actually responded
    #[serde(default)]
    pub model: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl ModelResponse {
    /// Concatenated text of every text-bearing block.
    pub fn text(&self) -> String {
        collect_text(&self.content)
    }

    /// Action requests in the order they appear.
    pub fn action_requests(&self) -> Vec<&ActionRequest> {
        self.content
            .iter()
            .filter_map(ContentBlock::as_action_request)
            .collect()
    }
}

/// The core ModelBackend trait.
///
/// The agent loop calls `respond()` without knowing which service answers.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// A human-readable name for this backend (e.g., "anthropic").
    fn name(&self) -> &str;

    /// Send one request and wait for the complete response.
    async fn respond(&self, request: ModelRequest) -> Result<ModelResponse, BackendError>;
}
