//! The research loop implementation.
//!
//! Each step sends the whole transcript to the backend. An answer ends the
//! run; action requests are executed in order and their observations
//! appended as one turn before the next step; anything else aborts.

use std::sync::Arc;

use quarry_core::{
    ActionRequest, CompletionSignal, ContentBlock, Conversation, ModelBackend, ModelRequest,
    ObservationResult,
};
use quarry_tools::{ActionRouter, SessionCounters};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::prompts::{FALLBACK_MESSAGE, FOLLOWUP_INSTRUCTIONS, RESEARCH_INSTRUCTIONS};

/// Step bound used unless configured otherwise.
pub const DEFAULT_MAX_STEPS: u32 = 10;

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// The backend produced a natural answer
    Answered,
    /// The step bound ran out
    Exhausted,
    /// The backend stopped for an unexpected reason
    Aborted { signal: String },
}

/// Everything a caller may want to know about one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResearchReport {
    /// Never empty: falls back to a fixed message
    pub answer: String,
    pub outcome: Outcome,
    /// Backend calls made
    pub steps: u32,
    pub actions_executed: u32,
}

/// One research session: a backend, the action router and the transcript.
pub struct ResearchAgent {
    backend: Arc<dyn ModelBackend>,
    router: ActionRouter,
    conversation: Conversation,
    max_steps: u32,
}

impl ResearchAgent {
    pub fn new(backend: Arc<dyn ModelBackend>, router: ActionRouter) -> Self {
        Self {
            backend,
            router,
            conversation: Conversation::new(),
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    /// Set the maximum number of backend calls per run (at least 1).
    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn counters(&self) -> &SessionCounters {
        self.router.counters()
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Answer one question (or follow-up) and return the answer text.
    pub async fn run(&mut self, question: &str) -> quarry_core::Result<String> {
        Ok(self.run_report(question).await?.answer)
    }

    /// Answer one question and report how the run went.
    ///
    /// Only backend failures are returned as errors; action failures
    /// become observation text and bounding conditions become the
    /// fallback answer.
    pub async fn run_report(&mut self, question: &str) -> quarry_core::Result<ResearchReport> {
        let follow_up = self.conversation.has_completed_turn();
        let instructions = if follow_up {
            FOLLOWUP_INSTRUCTIONS
        } else {
            RESEARCH_INSTRUCTIONS
        };
        self.conversation.append_requester_text(question);

        info!(
            session = %self.conversation.id(),
            backend = self.backend.name(),
            max_steps = self.max_steps,
            follow_up,
            "Research started"
        );

        let mut actions_executed = 0;

        for step in 1..=self.max_steps {
            debug!(step, max_steps = self.max_steps, "Reasoning step");

            let request = ModelRequest {
                instructions: instructions.to_string(),
                available_actions: self.router.schemas().to_vec(),
                transcript: self.conversation.snapshot(),
            };

            let response = match self.backend.respond(request).await {
                Ok(response) => response,
                Err(e) => {
                    warn!(step, error = %e, "Model backend failed");
                    self.close_unanswered();
                    return Err(e.into());
                }
            };

            match response.completion_signal.clone() {
                CompletionSignal::Answer => {
                    let text = response.text();
                    self.conversation.append_responder(response.content);
                    info!(
                        steps = step,
                        actions = %self.router.counters().summary(),
                        "Research finished"
                    );
                    let answer = if text.is_empty() {
                        FALLBACK_MESSAGE.to_string()
                    } else {
                        text
                    };
                    return Ok(ResearchReport {
                        answer,
                        outcome: Outcome::Answered,
                        steps: step,
                        actions_executed,
                    });
                }
                CompletionSignal::ActionRequest => {
                    let requests: Vec<ActionRequest> =
                        response.action_requests().into_iter().cloned().collect();
                    if requests.is_empty() {
                        warn!(step, "Action signal without any action request");
                        return Ok(self.abort(step, actions_executed, "action_request"));
                    }

                    self.conversation.append_responder(response.content);
                    let results = self.execute_actions(&requests).await;
                    actions_executed += results.len() as u32;
                    self.conversation.append_observations(results);
                }
                CompletionSignal::Other(signal) => {
                    warn!(step, signal = %signal, "Unexpected completion signal");
                    return Ok(self.abort(step, actions_executed, &signal));
                }
            }
        }

        warn!(
            max_steps = self.max_steps,
            actions = %self.router.counters().summary(),
            "Step limit reached without an answer"
        );
        self.close_unanswered();
        Ok(ResearchReport {
            answer: FALLBACK_MESSAGE.to_string(),
            outcome: Outcome::Exhausted,
            steps: self.max_steps,
            actions_executed,
        })
    }

    /// Run every requested action in order, echoing each request id.
    async fn execute_actions(&mut self, requests: &[ActionRequest]) -> Vec<ObservationResult> {
        let mut results = Vec::with_capacity(requests.len());
        for request in requests {
            debug!(action = %request.name, id = %request.id, "Executing action");
            let output = self.router.dispatch(&request.name, &request.arguments).await;
            results.push(ObservationResult::new(request.id.clone(), output));
        }
        results
    }

    fn abort(&mut self, steps: u32, actions_executed: u32, signal: &str) -> ResearchReport {
        self.close_unanswered();
        ResearchReport {
            answer: FALLBACK_MESSAGE.to_string(),
            outcome: Outcome::Aborted {
                signal: signal.to_string(),
            },
            steps,
            actions_executed,
        }
    }

    /// Close the exchange with the fallback text so the transcript keeps
    /// alternating and the next question starts a valid requester turn.
    fn close_unanswered(&mut self) {
        self.conversation
            .append_responder(vec![ContentBlock::text(FALLBACK_MESSAGE)]);
    }

    /// Forget the transcript and zero the action tallies.
    pub fn new_session(&mut self) {
        self.conversation.reset();
        self.router.reset_counters();
        info!(session = %self.conversation.id(), "New session started");
    }
}
