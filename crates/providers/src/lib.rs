//! Model backend implementations for Quarry.
//!
//! All backends implement the `quarry_core::ModelBackend` trait.

pub mod anthropic;

use std::sync::Arc;
use std::time::Duration;

use quarry_config::AppConfig;
use quarry_core::{BackendError, ModelBackend};

pub use anthropic::AnthropicBackend;

/// Build the configured model backend.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn ModelBackend>, BackendError> {
    let api_key = config
        .anthropic
        .api_key
        .clone()
        .ok_or_else(|| BackendError::NotConfigured("no Anthropic API key".into()))?;

    let backend = AnthropicBackend::new(
        api_key,
        &config.model,
        Duration::from_secs(config.anthropic.timeout_secs),
    )?
    .with_base_url(&config.anthropic.base_url)
    .with_max_tokens(config.max_tokens);

    Ok(Arc::new(backend))
}
