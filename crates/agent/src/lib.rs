//! The research loop for Quarry.
//!
//! The agent follows a **Reason → Act → Observe** cycle:
//!
//! 1. **Receive** a question and append it to the transcript
//! 2. **Reason**: send the full transcript, the action schemas and the
//!    instructions to the model backend
//! 3. **Act**: if the model requests actions, run each through the router
//! 4. **Observe**: append the results as one turn and loop back to step 2
//!
//! The loop ends on an answer, an unexpected completion signal, or when the
//! step bound runs out.

pub mod loop_runner;
pub mod prompts;

#[cfg(test)]
mod test_helpers;

use std::sync::Arc;

use quarry_config::AppConfig;
use quarry_core::ModelBackend;
use quarry_tools::ActionRouter;

pub use loop_runner::{DEFAULT_MAX_STEPS, Outcome, ResearchAgent, ResearchReport};
pub use prompts::{FALLBACK_MESSAGE, FOLLOWUP_INSTRUCTIONS, RESEARCH_INSTRUCTIONS};

/// Assemble an agent from configuration and already-built collaborators.
pub fn build_agent(
    config: &AppConfig,
    backend: Arc<dyn ModelBackend>,
    router: ActionRouter,
) -> ResearchAgent {
    ResearchAgent::new(backend, router).with_max_steps(config.max_steps)
}
