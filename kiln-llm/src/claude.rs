use crate::client::LlmClient;
use crate::error::LlmError;
use crate::tools::{ToolCall, ToolChoice};
use crate::types::{CompletionRequest, CompletionResponse, ContentBlock, Role, Usage};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const REQUEST_TIMEOUT_SECS: u64 = 300;

/// Client for the Anthropic Messages API
pub struct ClaudeClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl ClaudeClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, LlmError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LlmError::Authentication {
                message: "Anthropic API key is empty".to_string(),
            });
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http,
            api_key,
            base_url: ANTHROPIC_API_URL.to_string(),
            model: model.into(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn build_body(&self, request: &CompletionRequest) -> ClaudeRequest {
        // System-role history entries join the top-level system prompt.
        let mut system_parts: Vec<String> = request.system.iter().cloned().collect();
        let mut messages = Vec::new();

        for message in &request.messages {
            let text = message.text_content();
            match message.role {
                Role::System => system_parts.push(text),
                Role::User | Role::Assistant if text.trim().is_empty() => {}
                Role::User => messages.push(ClaudeMessage {
                    role: "user",
                    content: text,
                }),
                Role::Assistant => messages.push(ClaudeMessage {
                    role: "assistant",
                    content: text,
                }),
            }
        }

        let tools = request.tools.as_ref().filter(|t| !t.is_empty()).map(|tools| {
            tools
                .iter()
                .map(|tool| ClaudeTool {
                    name: tool.name.clone(),
                    description: tool.description.clone(),
                    input_schema: tool.parameters.clone(),
                })
                .collect::<Vec<_>>()
        });

        let tool_choice = match (&tools, &request.tool_choice) {
            (None, _) | (_, None) => None,
            (Some(_), Some(ToolChoice::Auto)) => Some(serde_json::json!({ "type": "auto" })),
            (Some(_), Some(ToolChoice::Required)) => Some(serde_json::json!({ "type": "any" })),
            (Some(_), Some(ToolChoice::None)) => Some(serde_json::json!({ "type": "none" })),
            (Some(_), Some(ToolChoice::Specific { name })) => {
                Some(serde_json::json!({ "type": "tool", "name": name }))
            }
        };

        let model = if request.model.is_empty() {
            self.model.clone()
        } else {
            request.model.clone()
        };

        ClaudeRequest {
            model,
            max_tokens: request.max_tokens,
            system: (!system_parts.is_empty()).then(|| system_parts.join("\n\n")),
            messages,
            temperature: request.temperature,
            top_p: request.top_p,
            stop_sequences: request.stop_sequences.clone(),
            tools,
            tool_choice,
        }
    }

    fn parse_response(response: ClaudeResponse) -> CompletionResponse {
        let mut content = Vec::new();
        let mut tool_calls = Vec::new();

        for block in response.content {
            match block {
                ClaudeContent::Text { text } => content.push(ContentBlock::Text { text }),
                ClaudeContent::ToolUse { id, name, input } => {
                    tool_calls.push(ToolCall::new(id.clone(), name.clone(), input.clone()));
                    content.push(ContentBlock::ToolUse { id, name, input });
                }
                ClaudeContent::Other => {}
            }
        }

        CompletionResponse {
            content,
            role: Role::Assistant,
            usage: Usage {
                input_tokens: response.usage.input_tokens,
                output_tokens: response.usage.output_tokens,
            },
            stop_reason: response.stop_reason,
            tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
        }
    }
}

#[async_trait]
impl LlmClient for ClaudeClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let body = self.build_body(&request);
        tracing::debug!(
            model = %body.model,
            messages = body.messages.len(),
            tools = body.tools.as_ref().map_or(0, |t| t.len()),
            "Sending Claude request"
        );

        let response = self
            .http
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::from_status(status.as_u16(), text, retry_after));
        }

        let parsed: ClaudeResponse = response.json().await?;
        Ok(Self::parse_response(parsed))
    }

    fn provider_name(&self) -> &str {
        "anthropic"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Serialize)]
struct ClaudeRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<ClaudeMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ClaudeTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct ClaudeMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ClaudeTool {
    name: String,
    description: String,
    input_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ClaudeResponse {
    content: Vec<ClaudeContent>,
    stop_reason: Option<String>,
    #[serde(default)]
    usage: ClaudeUsage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClaudeContent {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Default, Deserialize)]
struct ClaudeUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}
