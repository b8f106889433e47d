//! Anthropic native backend implementation.
//!
//! Uses Anthropic's Messages API directly.
//!
//! Features:
//! - `x-api-key` header authentication (not Bearer)
//! - `anthropic-version` header
//! - Instructions as the top-level `system` field
//! - Native tool use with `tool_use` / `tool_result` content blocks
//! - Verbatim replay of blocks the agent does not interpret (e.g. `thinking`)

use std::time::Duration;

use async_trait::async_trait;
use quarry_core::backend::{
    ActionSchema, CompletionSignal, ModelBackend, ModelRequest, ModelResponse, Usage,
};
use quarry_core::error::BackendError;
use quarry_core::message::{ActionRequest, ContentBlock, Participant, Transcript, Turn};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Anthropic native Messages API backend.
pub struct AnthropicBackend {
    name: String,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    client: reqwest::Client,
}

impl AnthropicBackend {
    /// Create a new Anthropic backend.
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            name: "anthropic".into(),
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            model: model.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            client,
        })
    }

    /// Create with a custom base URL (e.g., for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the max tokens per response.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Convert the transcript to Anthropic API messages.
    fn to_api_messages(transcript: &Transcript) -> Vec<AnthropicMessage> {
        transcript
            .iter()
            .map(|turn| AnthropicMessage {
                role: match turn.participant {
                    Participant::Requester => "user".into(),
                    Participant::Responder => "assistant".into(),
                },
                content: Self::to_api_content(turn),
            })
            .collect()
    }

    fn to_api_content(turn: &Turn) -> AnthropicContent {
        match (turn.participant, turn.payload.as_slice()) {
            (Participant::Requester, [ContentBlock::Text { text, raw: None }]) => {
                AnthropicContent::Text(text.clone())
            }
            _ => AnthropicContent::Blocks(turn.payload.iter().map(Self::to_api_block).collect()),
        }
    }

    fn to_api_block(block: &ContentBlock) -> ApiBlock {
        match block {
            ContentBlock::Text { raw: Some(raw), .. } => ApiBlock::Raw(raw.clone()),
            ContentBlock::Text { text, raw: None } => {
                ApiBlock::Typed(TypedBlock::Text { text: text.clone() })
            }
            ContentBlock::ActionRequest(request) => match &request.raw {
                Some(raw) => ApiBlock::Raw(raw.clone()),
                None => ApiBlock::Typed(TypedBlock::ToolUse {
                    id: request.id.clone(),
                    name: request.name.clone(),
                    input: request.arguments.clone(),
                }),
            },
            ContentBlock::ObservationResult(result) => ApiBlock::Typed(TypedBlock::ToolResult {
                tool_use_id: result.request_id.clone(),
                content: result.output.clone(),
            }),
            ContentBlock::Opaque { raw } => ApiBlock::Raw(raw.clone()),
        }
    }

    /// Convert action schemas to Anthropic tool definitions.
    fn to_api_tools(actions: &[ActionSchema]) -> Vec<AnthropicTool> {
        actions
            .iter()
            .map(|a| AnthropicTool {
                name: a.name.clone(),
                description: a.description.clone(),
                input_schema: a.parameters.clone(),
            })
            .collect()
    }

    /// Map one response block into the domain model.
    ///
    /// Text and tool use are understood; every other block type is kept as
    /// raw JSON. Understood blocks keep their raw form too, so fields the
    /// agent ignores (e.g. `citations`) still reach the next request.
    fn from_api_block(raw: serde_json::Value) -> ContentBlock {
        match serde_json::from_value::<TypedBlock>(raw.clone()) {
            Ok(TypedBlock::Text { text }) => ContentBlock::Text {
                text,
                raw: Some(raw),
            },
            Ok(TypedBlock::ToolUse { id, name, input }) => {
                ContentBlock::ActionRequest(ActionRequest::new(id, name, input).with_raw(raw))
            }
            _ => ContentBlock::Opaque { raw },
        }
    }

    fn completion_signal(stop_reason: Option<&str>) -> CompletionSignal {
        match stop_reason {
            Some("end_turn") => CompletionSignal::Answer,
            Some("tool_use") => CompletionSignal::ActionRequest,
            Some(other) => CompletionSignal::Other(other.to_string()),
            None => CompletionSignal::Other("unknown".into()),
        }
    }

    /// Convert an Anthropic API response to our ModelResponse.
    fn response_to_model_response(resp: AnthropicResponse) -> ModelResponse {
        ModelResponse {
            completion_signal: Self::completion_signal(resp.stop_reason.as_deref()),
            content: resp.content.into_iter().map(Self::from_api_block).collect(),
            model: resp.model,
            usage: resp.usage.map(|u| Usage {
                input_tokens: u.input_tokens,
                output_tokens: u.output_tokens,
            }),
        }
    }

    fn request_body(&self, request: &ModelRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": Self::to_api_messages(&request.transcript),
        });

        if !request.instructions.is_empty() {
            body["system"] = serde_json::json!(request.instructions);
        }

        if !request.available_actions.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(&request.available_actions));
        }

        body
    }
}

#[async_trait]
impl ModelBackend for AnthropicBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn respond(&self, request: ModelRequest) -> Result<ModelResponse, BackendError> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = self.request_body(&request);

        debug!(
            backend = "anthropic",
            model = %self.model,
            turns = request.transcript.len(),
            "Sending completion request"
        );

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BackendError::Timeout(e.to_string())
                } else {
                    BackendError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if status == 429 {
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(5);
            return Err(BackendError::RateLimited { retry_after_secs });
        }
        if status == 401 || status == 403 {
            return Err(BackendError::AuthenticationFailed(
                "Invalid Anthropic API key".into(),
            ));
        }
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Anthropic API error");
            return Err(BackendError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_resp: AnthropicResponse = response.json().await.map_err(|e| {
            BackendError::InvalidResponse(format!("Failed to parse Anthropic response: {e}"))
        })?;

        Ok(Self::response_to_model_response(api_resp))
    }
}

// --- Anthropic API types ---

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: AnthropicContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum AnthropicContent {
    Text(String),
    Blocks(Vec<ApiBlock>),
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ApiBlock {
    Typed(TypedBlock),
    Raw(serde_json::Value),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum TypedBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
    },
}

#[derive(Debug, Serialize)]
struct AnthropicTool {
    name: String,
    description: String,
    input_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    content: Vec<serde_json::Value>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}
