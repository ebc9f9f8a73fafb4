//! Test doubles shared by the runtime, agent and factory tests.

use async_trait::async_trait;
use kiln_llm::{
    CompletionRequest, CompletionResponse, ContentBlock, LlmClient, LlmError, Role, ToolCall,
    Usage,
};
use std::collections::VecDeque;
use std::sync::Mutex;

type Responder = Box<dyn Fn(usize) -> CompletionResponse + Send + Sync>;

/// Replays queued responses in order and records every request it receives.
pub struct ScriptedClient {
    script: Mutex<VecDeque<CompletionResponse>>,
    fallback: Option<Responder>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedClient {
    pub fn new(responses: Vec<CompletionResponse>) -> Self {
        Self {
            script: Mutex::new(responses.into()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answer every call with `respond(call_index)`.
    pub fn repeating(respond: impl Fn(usize) -> CompletionResponse + Send + Sync + 'static) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Some(Box::new(respond)),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let index = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            requests.len() - 1
        };

        if let Some(response) = self.script.lock().unwrap().pop_front() {
            return Ok(response);
        }
        match &self.fallback {
            Some(respond) => Ok(respond(index)),
            None => Err(LlmError::Internal {
                message: "script exhausted".to_string(),
            }),
        }
    }

    fn provider_name(&self) -> &str {
        "scripted"
    }

    fn model_name(&self) -> &str {
        "scripted-model"
    }
}

pub fn text_response(text: &str) -> CompletionResponse {
    CompletionResponse {
        content: vec![ContentBlock::Text {
            text: text.to_string(),
        }],
        role: Role::Assistant,
        usage: Usage::default(),
        stop_reason: Some("end_turn".to_string()),
        tool_calls: None,
    }
}

pub fn tool_response(text: &str, calls: Vec<ToolCall>) -> CompletionResponse {
    CompletionResponse {
        content: if text.is_empty() {
            Vec::new()
        } else {
            vec![ContentBlock::Text {
                text: text.to_string(),
            }]
        },
        role: Role::Assistant,
        usage: Usage::default(),
        stop_reason: Some("tool_use".to_string()),
        tool_calls: Some(calls),
    }
}
