use crate::client::LlmClient;
use crate::error::LlmError;
use crate::tools::{ToolCall, ToolChoice};
use crate::types::{CompletionRequest, CompletionResponse, ContentBlock, Role, Usage};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const REQUEST_TIMEOUT_SECS: u64 = 300;

/// Client for OpenAI-compatible chat completion endpoints
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    provider: String,
}

impl OpenAiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: OPENAI_BASE_URL.to_string(),
            model: model.into(),
            provider: "openai".to_string(),
        })
    }

    /// Point the client at another compatible provider (Groq, Ollama, a local proxy).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_provider_name(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn build_body(&self, request: &CompletionRequest) -> ChatRequest {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(system) = request.system.as_ref().filter(|s| !s.is_empty()) {
            messages.push(ChatMessage {
                role: "system",
                content: system.clone(),
            });
        }

        for message in &request.messages {
            let content = message.text_content();
            if content.trim().is_empty() {
                continue;
            }
            let role = match message.role {
                Role::User => "user",
                Role::Assistant => "assistant",
                Role::System => "system",
            };
            messages.push(ChatMessage { role, content });
        }

        let tools = request.tools.as_ref().filter(|t| !t.is_empty()).map(|tools| {
            tools
                .iter()
                .map(|tool| ChatTool {
                    kind: "function",
                    function: ChatFunction {
                        name: tool.name.clone(),
                        description: tool.description.clone(),
                        parameters: tool.parameters.clone(),
                    },
                })
                .collect::<Vec<_>>()
        });

        let tool_choice = match (&tools, &request.tool_choice) {
            (None, _) | (_, None) => None,
            (Some(_), Some(ToolChoice::Auto)) => Some(serde_json::json!("auto")),
            (Some(_), Some(ToolChoice::Required)) => Some(serde_json::json!("required")),
            (Some(_), Some(ToolChoice::None)) => Some(serde_json::json!("none")),
            (Some(_), Some(ToolChoice::Specific { name })) => Some(serde_json::json!({
                "type": "function",
                "function": { "name": name }
            })),
        };

        let model = if request.model.is_empty() {
            self.model.clone()
        } else {
            request.model.clone()
        };

        ChatRequest {
            model,
            messages,
            max_tokens: Some(request.max_tokens),
            temperature: request.temperature,
            top_p: request.top_p,
            stop: request.stop_sequences.clone(),
            tools,
            tool_choice,
        }
    }

    fn parse_response(response: ChatResponse) -> Result<CompletionResponse, LlmError> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::Parse {
                message: "response contained no choices".to_string(),
            })?;

        let mut content = Vec::new();
        if let Some(text) = choice.message.content.filter(|t| !t.is_empty()) {
            content.push(ContentBlock::Text { text });
        }

        let mut tool_calls = Vec::new();
        for raw in choice.message.tool_calls.unwrap_or_default() {
            let id = raw
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4()));
            // Arguments arrive as a JSON string; keep the raw text when it does not parse.
            let arguments = serde_json::from_str(&raw.function.arguments)
                .unwrap_or(serde_json::Value::String(raw.function.arguments));
            content.push(ContentBlock::ToolUse {
                id: id.clone(),
                name: raw.function.name.clone(),
                input: arguments.clone(),
            });
            tool_calls.push(ToolCall::new(id, raw.function.name, arguments));
        }

        let usage = response.usage.unwrap_or_default();
        Ok(CompletionResponse {
            content,
            role: Role::Assistant,
            usage: Usage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
            },
            stop_reason: choice.finish_reason,
            tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
        })
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let body = self.build_body(&request);
        tracing::debug!(
            provider = %self.provider,
            model = %body.model,
            messages = body.messages.len(),
            "Sending chat completion request"
        );

        let mut builder = self.http.post(self.endpoint()).json(&body);
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }
        let response = builder.send().await?;

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

        let parsed: ChatResponse = response.json().await?;
        Self::parse_response(parsed)
    }

    fn provider_name(&self) -> &str {
        &self.provider
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ChatTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: ChatFunction,
}

#[derive(Debug, Serialize)]
struct ChatFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ChatToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ChatToolCall {
    id: Option<String>,
    function: ChatToolCallFunction,
}

#[derive(Debug, Deserialize)]
struct ChatToolCallFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Default, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::Tool;
    use crate::types::Message;

    #[test]
    fn test_build_body_prepends_system_and_wraps_tools() {
        let client = OpenAiClient::new("sk-test", "gpt-4o")
            .unwrap()
            .with_base_url("http://localhost:11434/v1/");
        assert_eq!(client.endpoint(), "http://localhost:11434/v1/chat/completions");

        let mut request = CompletionRequest::new("", vec![Message::user("hello")]);
        request.system = Some("You are terse".to_string());
        request.tools = Some(vec![Tool {
            name: "grep".to_string(),
            description: "Search files".to_string(),
            parameters: serde_json::json!({"type": "object"}),
        }]);
        request.tool_choice = Some(ToolChoice::Required);

        let json = serde_json::to_value(client.build_body(&request)).unwrap();
        assert_eq!(json["model"], "gpt-4o");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hello");
        assert_eq!(json["tools"][0]["type"], "function");
        assert_eq!(json["tools"][0]["function"]["name"], "grep");
        assert_eq!(json["tool_choice"], "required");
        assert_eq!(json["max_tokens"], 4096);
    }

    #[test]
    fn test_parse_response_tool_calls() {
        let raw = serde_json::json!({
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [
                        {"id": "call_abc", "type": "function",
                         "function": {"name": "read_file", "arguments": "{\"path\":\"a.txt\"}"}},
                        {"type": "function",
                         "function": {"name": "grep", "arguments": "not json"}}
                    ]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 20, "completion_tokens": 7}
        });
        let parsed: ChatResponse = serde_json::from_value(raw).unwrap();
        let response = OpenAiClient::parse_response(parsed).unwrap();

        assert_eq!(response.text(), "");
        let calls = response.tool_calls.unwrap();
        assert_eq!(calls[0].id(), "call_abc");
        assert_eq!(calls[0].arguments()["path"], "a.txt");
        assert!(calls[1].id().starts_with("call_"));
        assert_eq!(calls[1].arguments(), &serde_json::json!("not json"));
        assert_eq!(response.usage.input_tokens, 20);
    }

    #[test]
    fn test_parse_response_without_choices_fails() {
        let parsed: ChatResponse = serde_json::from_value(serde_json::json!({"choices": []})).unwrap();
        assert!(matches!(
            OpenAiClient::parse_response(parsed),
            Err(LlmError::Parse { .. })
        ));
    }
}
