//! Conversation state manager.
//!
//! Owns the transcript of one session and is the only thing allowed to
//! mutate it. Every mutation is an append; the alternation rules of the
//! backend protocol are preconditions of the append calls. Breaking one is
//! a bug in the caller, so they are checked with `debug_assert!` rather
//! than reported as runtime errors.

use crate::message::{
    ActionRequest, ContentBlock, ObservationResult, Participant, SessionId, Transcript, Turn,
};

/// The in-memory transcript of one research session.
#[derive(Debug, Clone)]
pub struct Conversation {
    id: SessionId,
    transcript: Transcript,
    /// Set by the first responder turn, cleared only by `reset`.
    completed_turn: bool,
}

impl Conversation {
    /// Create a new empty conversation.
    pub fn new() -> Self {
        Self {
            id: SessionId::new(),
            transcript: Transcript::new(),
            completed_turn: false,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Append a question or follow-up as a requester turn.
    pub fn append_requester_text(&mut self, text: impl Into<String>) {
        debug_assert!(
            self.last_participant() != Some(Participant::Requester),
            "requester text must start the transcript or follow a responder turn"
        );
        self.push(Turn::requester_text(text));
    }

    /// Record the backend's content exactly as returned.
    ///
    /// The payload is stored verbatim: a later observation refers back to
    /// the action-request identifiers inside it, and the backend expects to
    /// see the same structure replayed.
    pub fn append_responder(&mut self, payload: Vec<ContentBlock>) {
        debug_assert!(
            self.last_participant() == Some(Participant::Requester),
            "responder turn must follow a requester turn"
        );
        self.push(Turn::responder(payload));
        self.completed_turn = true;
    }

    /// Append one requester turn holding the whole batch of observations.
    ///
    /// Results are correlated to the pending action requests by identifier
    /// and ordered the way those requests appeared in the last responder
    /// turn, whatever order they were produced in.
    pub fn append_observations(&mut self, mut results: Vec<ObservationResult>) {
        let pending: Vec<String> = self
            .pending_requests()
            .into_iter()
            .map(|r| r.id.clone())
            .collect();
        debug_assert!(
            !pending.is_empty(),
            "observations must follow a responder turn with at least one action request"
        );
        debug_assert!(
            results.iter().all(|r| pending.contains(&r.request_id)),
            "every observation must answer a pending action request"
        );

        results.sort_by_key(|r| {
            pending
                .iter()
                .position(|id| *id == r.request_id)
                .unwrap_or(usize::MAX)
        });
        self.push(Turn::observations(results));
    }

    /// The full ordered transcript.
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// An owned copy of the transcript, for handing to the backend.
    pub fn snapshot(&self) -> Transcript {
        self.transcript.clone()
    }

    /// Action requests of the last turn, if it is a responder turn.
    pub fn pending_requests(&self) -> Vec<&ActionRequest> {
        match self.transcript.last() {
            Some(turn) if turn.participant == Participant::Responder => {
                turn.action_requests().collect()
            }
            _ => Vec::new(),
        }
    }

    /// True once at least one responder turn has been recorded.
    pub fn has_completed_turn(&self) -> bool {
        self.completed_turn
    }

    /// Forget everything and start a fresh session.
    pub fn reset(&mut self) {
        self.transcript.clear();
        self.completed_turn = false;
        self.id = SessionId::new();
    }

    fn last_participant(&self) -> Option<Participant> {
        self.transcript.last().map(|t| t.participant)
    }

    fn push(&mut self, turn: Turn) {
        self.transcript.push(turn);
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}
