use crate::error::AgentError;
use crate::profile::{AgentProfile, ProfileOverrides};
use crate::storage::AgentStorage;
use crate::tools::AgentTool;
use kiln_llm::{CompletionRequest, LlmClient, Message as LlmMessage, Role, ToolCall, ToolChoice};
use kiln_tools::{ToolExecutor, ToolRequest};
use shared_types::{
    AgentMessage, AgentSession, AgentToolCall, MessageRole, SessionStatus, ToolCallStatus,
};
use std::sync::Arc;
use std::time::Instant;

const TOOL_PLACEHOLDER: &str = "[Using tools]";

/// Drives one session at a time from prompt to a terminal state.
pub struct Runtime {
    client: Arc<dyn LlmClient>,
    storage: Arc<dyn AgentStorage>,
    tool_executor: Arc<ToolExecutor>,
    overrides: ProfileOverrides,
}

impl Runtime {
    pub fn new(
        client: Arc<dyn LlmClient>,
        storage: Arc<dyn AgentStorage>,
        tool_executor: Arc<ToolExecutor>,
    ) -> Self {
        Self {
            client,
            storage,
            tool_executor,
            overrides: ProfileOverrides::default(),
        }
    }

    pub fn with_overrides(mut self, overrides: ProfileOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn storage(&self) -> &Arc<dyn AgentStorage> {
        &self.storage
    }

    pub fn tool_executor(&self) -> &Arc<ToolExecutor> {
        &self.tool_executor
    }

    /// Run `prompt` through a new session and return the model's final answer.
    pub async fn execute(&self, profile: &AgentProfile, prompt: &str) -> Result<String, AgentError> {
        let profile = self.overrides.apply(profile);

        let mut session = AgentSession::new(
            profile.name.clone(),
            self.client.provider_name(),
            self.client.model_name(),
            Some(profile.system_prompt.clone()),
            prompt,
            profile.session_config(),
        );
        let session_id = self.storage.create_session(session.clone()).await?;
        session.id = Some(session_id);
        tracing::info!(session_id, agent = %profile.name, "Session started");

        match self.run(&profile, &mut session, prompt).await {
            Ok(result) => Ok(result),
            Err(err) => {
                if !session.status.is_terminal() {
                    let mut failed = session.clone();
                    failed.fail(err.to_string());
                    if let Err(e) = self.storage.update_session(failed).await {
                        tracing::warn!(session_id, error = %e, "Failed to mark session as failed");
                    }
                }
                tracing::warn!(session_id, error = %err, "Session failed");
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        profile: &AgentProfile,
        session: &mut AgentSession,
        prompt: &str,
    ) -> Result<String, AgentError> {
        let session_id = session.id.unwrap_or_default();
        self.storage
            .create_message(AgentMessage::new(session_id, MessageRole::User, prompt))
            .await?;

        for iteration in 1..=profile.max_iterations {
            tracing::info!("Agent iteration {}", iteration);

            let request = CompletionRequest {
                messages: self.build_messages(session_id).await?,
                max_tokens: profile.max_tokens,
                model: self.client.model_name().to_string(),
                system: Some(profile.system_prompt.clone()),
                temperature: profile.temperature,
                top_p: None,
                stop_sequences: None,
                tools: Some(profile.tool_definitions.clone()),
                tool_choice: Some(ToolChoice::Auto),
            };

            let response = self.client.complete(request).await?;
            let text = response.text();
            let tool_calls = response.tool_calls.unwrap_or_default();

            let content = if text.is_empty() && !tool_calls.is_empty() {
                TOOL_PLACEHOLDER.to_string()
            } else {
                text.clone()
            };
            let message_id = self
                .storage
                .create_message(AgentMessage::new(session_id, MessageRole::Assistant, content))
                .await?;

            if tool_calls.is_empty() {
                let mut completed = session.clone();
                completed.complete(text.clone());
                self.storage.update_session(completed.clone()).await?;
                *session = completed;
                tracing::info!(session_id, iteration, "Session completed");
                return Ok(text);
            }

            for tool_call in &tool_calls {
                self.execute_tool_call(profile, session, message_id, tool_call)
                    .await?;
            }
        }

        let err = AgentError::IterationLimit {
            max_iterations: profile.max_iterations,
        };
        let mut failed = session.clone();
        failed.fail(err.to_string());
        self.storage.update_session(failed.clone()).await?;
        *session = failed;
        Err(err)
    }

    async fn build_messages(&self, session_id: i64) -> Result<Vec<LlmMessage>, AgentError> {
        let messages = self.storage.get_messages(session_id).await?;

        Ok(messages
            .into_iter()
            .map(|message| {
                let role = match message.role {
                    MessageRole::User => Role::User,
                    MessageRole::Assistant => Role::Assistant,
                    MessageRole::System => Role::System,
                    MessageRole::Tool => Role::User,
                };
                LlmMessage::text(role, message.content)
            })
            .collect())
    }

    async fn execute_tool_call(
        &self,
        profile: &AgentProfile,
        session: &mut AgentSession,
        message_id: i64,
        tool_call: &ToolCall,
    ) -> Result<(), AgentError> {
        let session_id = session.id.unwrap_or_default();

        let request = match AgentTool::parse_tool_call(
            tool_call.name(),
            tool_call.arguments().clone(),
            &profile.tools,
        ) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(
                    tool_name = tool_call.name(),
                    tool_call_id = tool_call.id(),
                    error = %e,
                    "Rejected tool call"
                );
                self.storage
                    .create_message(AgentMessage::new(
                        session_id,
                        MessageRole::Tool,
                        format!("Tool {} rejected: {}", tool_call.name(), e),
                    ))
                    .await?;
                return Ok(());
            }
        };

        let mut record = AgentToolCall::pending(
            session_id,
            Some(message_id),
            tool_call.id(),
            tool_call.name(),
            tool_call.arguments().clone(),
        );
        let record_id = self.storage.create_tool_call(record.clone()).await?;
        let already_used = self
            .storage
            .get_tool_calls(session_id)
            .await?
            .iter()
            .any(|stored| stored.id == Some(record_id) && stored.status != ToolCallStatus::Pending);
        if already_used {
            tracing::warn!(
                tool_name = tool_call.name(),
                tool_call_id = tool_call.id(),
                "Rejected reused tool call id"
            );
            self.storage
                .create_message(AgentMessage::new(
                    session_id,
                    MessageRole::Tool,
                    format!("Tool {} rejected: duplicate tool_call_id", tool_call.name()),
                ))
                .await?;
            return Ok(());
        }
        record.id = Some(record_id);
        record.start();
        self.storage.update_tool_call(record.clone()).await?;

        let asks_user = matches!(request, ToolRequest::AskUser(_));
        if asks_user {
            self.set_status(session, SessionStatus::WaitingForUserInput)
                .await?;
        }

        let started = Instant::now();
        let result = self.tool_executor.execute(request).await;
        let execution_time_ms = started.elapsed().as_millis() as i64;

        if asks_user {
            self.set_status(session, SessionStatus::Running).await?;
        }

        let content = match result {
            Ok(response) => {
                record.complete(serde_json::to_value(&response)?, execution_time_ms);
                tracing::debug!(
                    tool_name = tool_call.name(),
                    tool_call_id = tool_call.id(),
                    execution_time_ms,
                    "Tool call completed"
                );
                format!("Tool {} result:\n{}", tool_call.name(), response.to_llm_text())
            }
            Err(e) => {
                record.fail(e.to_string(), execution_time_ms);
                tracing::debug!(
                    tool_name = tool_call.name(),
                    tool_call_id = tool_call.id(),
                    execution_time_ms,
                    error = %e,
                    "Tool call failed"
                );
                format!("Tool {} failed: {}", tool_call.name(), e)
            }
        };

        self.storage.update_tool_call(record).await?;
        self.storage
            .create_message(AgentMessage::new(session_id, MessageRole::Tool, content))
            .await?;
        Ok(())
    }

    async fn set_status(
        &self,
        session: &mut AgentSession,
        status: SessionStatus,
    ) -> Result<(), AgentError> {
        let mut next = session.clone();
        next.status = status;
        self.storage.update_session(next.clone()).await?;
        tracing::info!(session_id = ?session.id, status = %status, "Session status changed");
        *session = next;
        Ok(())
    }
}
