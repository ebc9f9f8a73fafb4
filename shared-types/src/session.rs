use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

/// Error returned when a stored status or role string is not recognised
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Unknown {kind}: {value}")]
pub struct ParseStatusError {
    pub kind: &'static str,
    pub value: String,
}

/// Lifecycle state of an agent session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Running,
    Completed,
    Failed,
    WaitingForUserInput,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Running => "running",
            SessionStatus::Completed => "completed",
            SessionStatus::Failed => "failed",
            SessionStatus::WaitingForUserInput => "waiting_for_user_input",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Failed)
    }

    /// Terminal sessions never change again; a waiting session may resume running.
    pub fn can_transition_to(&self, _next: SessionStatus) -> bool {
        !self.is_terminal()
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(SessionStatus::Running),
            "completed" => Ok(SessionStatus::Completed),
            "failed" => Ok(SessionStatus::Failed),
            "waiting_for_user_input" => Ok(SessionStatus::WaitingForUserInput),
            other => Err(ParseStatusError {
                kind: "session status",
                value: other.to_string(),
            }),
        }
    }
}

/// Author of a message in the session log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
    System,
    Tool,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::System => "system",
            MessageRole::Tool => "tool",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageRole {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            "system" => Ok(MessageRole::System),
            "tool" => Ok(MessageRole::Tool),
            other => Err(ParseStatusError {
                kind: "message role",
                value: other.to_string(),
            }),
        }
    }
}

/// Progress of a single tool invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallStatus {
    Pending,
    Executing,
    Completed,
    Failed,
}

impl ToolCallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolCallStatus::Pending => "pending",
            ToolCallStatus::Executing => "executing",
            ToolCallStatus::Completed => "completed",
            ToolCallStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ToolCallStatus::Completed | ToolCallStatus::Failed)
    }

    /// Pending -> Executing -> {Completed | Failed}. A pending call may also fail
    /// without ever starting. Staying in a non-terminal state is allowed.
    pub fn can_transition_to(&self, next: ToolCallStatus) -> bool {
        use ToolCallStatus::*;
        matches!(
            (self, next),
            (Pending, Pending)
                | (Pending, Executing)
                | (Pending, Failed)
                | (Executing, Executing)
                | (Executing, Completed)
                | (Executing, Failed)
        )
    }
}

impl fmt::Display for ToolCallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolCallStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ToolCallStatus::Pending),
            "executing" => Ok(ToolCallStatus::Executing),
            "completed" => Ok(ToolCallStatus::Completed),
            "failed" => Ok(ToolCallStatus::Failed),
            other => Err(ParseStatusError {
                kind: "tool call status",
                value: other.to_string(),
            }),
        }
    }
}

/// Core agent session model stored in database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSession {
    pub id: Option<i64>,
    pub agent_name: String,
    pub provider: String,
    pub model: String,
    pub system_prompt: Option<String>,
    pub user_prompt: String,
    pub config: serde_json::Value,
    pub status: SessionStatus,
    pub started_at: i64,
    pub ended_at: Option<i64>,
    pub result: Option<String>,
    pub error: Option<String>,
}

impl AgentSession {
    pub fn new(
        agent_name: impl Into<String>,
        provider: impl Into<String>,
        model: impl Into<String>,
        system_prompt: Option<String>,
        user_prompt: impl Into<String>,
        config: serde_json::Value,
    ) -> Self {
        Self {
            id: None,
            agent_name: agent_name.into(),
            provider: provider.into(),
            model: model.into(),
            system_prompt,
            user_prompt: user_prompt.into(),
            config,
            status: SessionStatus::Running,
            started_at: chrono::Utc::now().timestamp(),
            ended_at: None,
            result: None,
            error: None,
        }
    }

    pub fn complete(&mut self, result: String) {
        self.status = SessionStatus::Completed;
        self.result = Some(result);
        self.ended_at = Some(chrono::Utc::now().timestamp());
    }

    pub fn fail(&mut self, error: String) {
        self.status = SessionStatus::Failed;
        self.error = Some(error);
        self.ended_at = Some(chrono::Utc::now().timestamp());
    }
}

/// Message in an agent session (user, assistant, system, tool)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentMessage {
    pub id: Option<i64>,
    pub session_id: i64,
    pub role: MessageRole,
    pub content: String,
    pub created_at: i64,
}

impl AgentMessage {
    pub fn new(session_id: i64, role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: None,
            session_id,
            role,
            content: content.into(),
            created_at: chrono::Utc::now().timestamp(),
        }
    }
}

/// Tool/function call made during agent execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentToolCall {
    pub id: Option<i64>,
    pub session_id: i64,
    pub message_id: Option<i64>,
    pub tool_call_id: String,
    pub tool_name: String,
    pub request: serde_json::Value,
    pub response: Option<serde_json::Value>,
    pub status: ToolCallStatus,
    pub execution_time_ms: Option<i64>,
    pub created_at: i64,
    pub completed_at: Option<i64>,
    pub error_details: Option<String>,
}

impl AgentToolCall {
    pub fn pending(
        session_id: i64,
        message_id: Option<i64>,
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        request: serde_json::Value,
    ) -> Self {
        Self {
            id: None,
            session_id,
            message_id,
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            request,
            response: None,
            status: ToolCallStatus::Pending,
            execution_time_ms: None,
            created_at: chrono::Utc::now().timestamp(),
            completed_at: None,
            error_details: None,
        }
    }

    pub fn start(&mut self) {
        self.status = ToolCallStatus::Executing;
    }

    pub fn complete(&mut self, response: serde_json::Value, execution_time_ms: i64) {
        self.response = Some(response);
        self.status = ToolCallStatus::Completed;
        self.completed_at = Some(chrono::Utc::now().timestamp());
        self.execution_time_ms = Some(execution_time_ms);
    }

    pub fn fail(&mut self, error: String, execution_time_ms: i64) {
        self.status = ToolCallStatus::Failed;
        self.error_details = Some(error);
        self.completed_at = Some(chrono::Utc::now().timestamp());
        self.execution_time_ms = Some(execution_time_ms);
    }
}

// API Response types

/// Simplified session info for list views
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct SessionListItem {
    pub id: i64,
    pub agent_name: String,
    pub user_prompt: String,
    pub status: SessionStatus,
    pub started_at: i64,
}

impl SessionListItem {
    pub fn from_session(session: &AgentSession) -> Option<Self> {
        Some(Self {
            id: session.id?,
            agent_name: session.agent_name.clone(),
            user_prompt: session.user_prompt.clone(),
            status: session.status,
            started_at: session.started_at,
        })
    }
}

/// List of sessions response
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct SessionListResponse {
    pub sessions: Vec<SessionListItem>,
}

/// Detailed session with messages and tool calls
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct SessionResponse {
    pub id: i64,
    pub agent_name: String,
    pub provider: String,
    pub model: String,
    pub system_prompt: Option<String>,
    pub user_prompt: String,
    #[ts(type = "any")]
    pub config: serde_json::Value,
    pub status: SessionStatus,
    pub result: Option<String>,
    pub error: Option<String>,
    pub messages: Vec<SessionMessage>,
    pub tool_calls: Vec<SessionToolCall>,
    pub started_at: i64,
    pub ended_at: Option<i64>,
}

impl SessionResponse {
    /// Assemble the transcript view a host renders for one session.
    pub fn from_parts(
        session: AgentSession,
        messages: Vec<AgentMessage>,
        tool_calls: Vec<AgentToolCall>,
    ) -> Self {
        Self {
            id: session.id.unwrap_or_default(),
            agent_name: session.agent_name,
            provider: session.provider,
            model: session.model,
            system_prompt: session.system_prompt,
            user_prompt: session.user_prompt,
            config: session.config,
            status: session.status,
            result: session.result,
            error: session.error,
            messages: messages
                .into_iter()
                .map(|message| SessionMessage {
                    role: message.role,
                    content: message.content,
                    created_at: message.created_at,
                })
                .collect(),
            tool_calls: tool_calls
                .into_iter()
                .map(|call| SessionToolCall {
                    tool_call_id: call.tool_call_id,
                    tool_name: call.tool_name,
                    request: call.request,
                    response: call.response,
                    status: call.status,
                    execution_time_ms: call.execution_time_ms,
                    error_details: call.error_details,
                })
                .collect(),
            started_at: session.started_at,
            ended_at: session.ended_at,
        }
    }
}

/// Message in session response
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct SessionMessage {
    pub role: MessageRole,
    pub content: String,
    pub created_at: i64,
}

/// Tool call in session response
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct SessionToolCall {
    pub tool_call_id: String,
    pub tool_name: String,
    #[ts(type = "any")]
    pub request: serde_json::Value,
    #[ts(type = "any")]
    pub response: Option<serde_json::Value>,
    pub status: ToolCallStatus,
    pub execution_time_ms: Option<i64>,
    pub error_details: Option<String>,
}
