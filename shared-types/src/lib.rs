use serde::{Deserialize, Serialize};

pub mod session;
pub mod user_interaction;

pub use session::{
    AgentMessage, AgentSession, AgentToolCall, MessageRole, ParseStatusError, SessionListItem,
    SessionListResponse, SessionMessage, SessionResponse, SessionStatus, SessionToolCall,
    ToolCallStatus,
};
pub use user_interaction::{
    AskUserRequest, AskUserResponse, QuestionType, UserQuestion, UserQuestionResponse,
};

/// Error payload a host returns when a session cannot be read
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
