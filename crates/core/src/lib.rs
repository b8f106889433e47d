//! # Quarry Core
//!
//! Domain types, traits, and error definitions for the Quarry research agent.
//! This crate has **no I/O**: it defines the transcript model, the
//! conversation state manager, and the seam every model backend implements.
//!
//! ## Design Philosophy
//!
//! The model backend is stateless, so the full transcript is replayed on
//! every request. The transcript is therefore a plain value: it is built
//! by [`Conversation`], cloned into each [`ModelRequest`], and never hidden
//! inside a client object.

pub mod backend;
pub mod conversation;
pub mod error;
pub mod message;

// Re-export key types at crate root for ergonomics
pub use backend::{
    ActionSchema, CompletionSignal, ModelBackend, ModelRequest, ModelResponse, Usage,
};
pub use conversation::Conversation;
pub use error::{BackendError, Error, Result};
pub use message::{
    ActionRequest, ContentBlock, ObservationResult, Participant, SessionId, Transcript, Turn,
};
