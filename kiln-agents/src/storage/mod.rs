#[cfg(test)]
#[macro_use]
mod contract;
pub mod memory;
pub mod migrations;
pub mod sqlite_storage;

pub use memory::InMemoryStorage;
pub use sqlite_storage::SqliteAgentStorage;

use async_trait::async_trait;
use shared_types::{AgentMessage, AgentSession, AgentToolCall};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage operation failed: {0}")]
    OperationFailed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Other(String),
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::QueryReturnedNoRows => StorageError::NotFound(err.to_string()),
            rusqlite::Error::FromSqlConversionFailure(..) => StorageError::Other(err.to_string()),
            other => StorageError::OperationFailed(other.to_string()),
        }
    }
}

/// Persistence for sessions and their message and tool-call logs.
///
/// Calls for distinct sessions may run concurrently; calls for one session are
/// serialized by the runtime driving it.
#[async_trait]
pub trait AgentStorage: Send + Sync {
    async fn create_session(&self, session: AgentSession) -> Result<i64, StorageError>;
    async fn get_session(&self, session_id: i64) -> Result<Option<AgentSession>, StorageError>;
    /// Persists status, result, error and ended_at. Rejects illegal status transitions.
    async fn update_session(&self, session: AgentSession) -> Result<(), StorageError>;
    /// Most recent first.
    async fn list_sessions(&self) -> Result<Vec<AgentSession>, StorageError>;
    /// Removes the session together with its messages and tool calls.
    async fn delete_session(&self, session_id: i64) -> Result<(), StorageError>;

    async fn create_message(&self, message: AgentMessage) -> Result<i64, StorageError>;
    /// Ordered by (created_at, id).
    async fn get_messages(&self, session_id: i64) -> Result<Vec<AgentMessage>, StorageError>;

    /// Idempotent on (session_id, tool_call_id): a repeat returns the existing row id.
    async fn create_tool_call(&self, tool_call: AgentToolCall) -> Result<i64, StorageError>;
    /// Completed and failed rows never change; re-sending the same terminal status is a no-op.
    async fn update_tool_call(&self, tool_call: AgentToolCall) -> Result<(), StorageError>;
    async fn get_tool_calls(&self, session_id: i64) -> Result<Vec<AgentToolCall>, StorageError>;
    /// Calls still pending or executing, in creation order.
    async fn get_pending_tool_calls(
        &self,
        session_id: i64,
    ) -> Result<Vec<AgentToolCall>, StorageError>;
}

fn missing_id(kind: &str) -> StorageError {
    StorageError::OperationFailed(format!("Cannot update a {} without an id", kind))
}

fn session_not_found(session_id: i64) -> StorageError {
    StorageError::NotFound(format!("Session {} not found", session_id))
}
