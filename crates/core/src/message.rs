//! Transcript domain types.
//!
//! These are the value objects that flow through one research session:
//! the user asks → the model replies (maybe with action requests) → the
//! agent answers each request with an observation → the model replies again.
//!
//! Turns alternate strictly between the [`Participant::Requester`] (user
//! text and observations) and the [`Participant::Responder`] (the model).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a research session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The two sides of the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Participant {
    /// The user's questions and the agent's observations
    Requester,
    /// The model backend
    Responder,
}

/// A request from the model to run an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    /// Opaque identifier generated by the model backend
    pub id: String,

    /// Name of the action to invoke
    pub name: String,

    /// Arguments exactly as the backend produced them
    pub arguments: serde_json::Value,

    /// The whole block as the backend sent it, replayed in place of a
    /// rebuilt one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<serde_json::Value>,
}

impl ActionRequest {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: serde_json::Value,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
            raw: None,
        }
    }

    pub fn with_raw(mut self, raw: serde_json::Value) -> Self {
        self.raw = Some(raw);
        self
    }
}

/// The outcome of one action, fed back to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationResult {
    /// Echo of [`ActionRequest::id`]
    pub request_id: String,

    /// Textual result of the action (success or failure text)
    pub output: String,
}

impl ObservationResult {
    pub fn new(request_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            output: output.into(),
        }
    }
}

/// One block of turn content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
        /// Backend-native form of the block (citations and other extras)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        raw: Option<serde_json::Value>,
    },
    ActionRequest(ActionRequest),
    ObservationResult(ObservationResult),
    /// A backend block with no meaning to the agent (reasoning traces and
    /// the like). Kept as raw JSON so it can be replayed unchanged.
    Opaque { raw: serde_json::Value },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            raw: None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text, .. } => Some(text),
            _ => None,
        }
    }

    pub fn as_action_request(&self) -> Option<&ActionRequest> {
        match self {
            Self::ActionRequest(request) => Some(request),
            _ => None,
        }
    }
}

/// Concatenate every non-empty text block, newline-joined and trimmed.
pub fn collect_text(blocks: &[ContentBlock]) -> String {
    blocks
        .iter()
        .filter_map(ContentBlock::as_text)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// One alternating unit of the transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub participant: Participant,
    pub payload: Vec<ContentBlock>,
}

impl Turn {
    /// A requester turn carrying a single text block.
    pub fn requester_text(text: impl Into<String>) -> Self {
        Self {
            participant: Participant::Requester,
            payload: vec![ContentBlock::text(text)],
        }
    }

    /// A requester turn carrying a batch of observations.
    pub fn observations(results: Vec<ObservationResult>) -> Self {
        Self {
            participant: Participant::Requester,
            payload: results
                .into_iter()
                .map(ContentBlock::ObservationResult)
                .collect(),
        }
    }

    /// A responder turn holding the backend's content verbatim.
    pub fn responder(payload: Vec<ContentBlock>) -> Self {
        Self {
            participant: Participant::Responder,
            payload,
        }
    }

    /// Action requests in the order they appear in the payload.
    pub fn action_requests(&self) -> impl Iterator<Item = &ActionRequest> {
        self.payload.iter().filter_map(ContentBlock::as_action_request)
    }

    pub fn text(&self) -> String {
        collect_text(&self.payload)
    }
}

/// The ordered record of a session, replayed in full on every model request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Turn> {
        self.turns.iter()
    }

    /// True when turns alternate, starting with the requester, and every
    /// observation turn directly follows a responder turn that asked for
    /// at least one action.
    pub fn is_well_formed(&self) -> bool {
        let mut expected = Participant::Requester;
        let mut previous: Option<&Turn> = None;

        for turn in &self.turns {
            if turn.participant != expected {
                return false;
            }
            let has_observations = turn
                .payload
                .iter()
                .any(|b| matches!(b, ContentBlock::ObservationResult(_)));
            if has_observations {
                let follows_request =
                    previous.is_some_and(|p| p.action_requests().next().is_some());
                if !follows_request {
                    return false;
                }
            }
            expected = match expected {
                Participant::Requester => Participant::Responder,
                Participant::Responder => Participant::Requester,
            };
            previous = Some(turn);
        }
        true
    }

    pub(crate) fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub(crate) fn clear(&mut self) {
        self.turns.clear();
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a Turn;
    type IntoIter = std::slice::Iter<'a, Turn>;

    fn into_iter(self) -> Self::IntoIter {
        self.turns.iter()
    }
}
