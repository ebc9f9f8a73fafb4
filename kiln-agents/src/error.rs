use crate::storage::StorageError;
use kiln_llm::LlmError;
use kiln_tools::ToolError;

/// Errors that end an agent run.
///
/// Tool failures are not among them: the runtime hands those back to the model as
/// tool messages and keeps going.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("Maximum iteration limit reached ({max_iterations} iterations)")]
    IterationLimit { max_iterations: u32 },

    #[error("Validation failed: {0}")]
    Validation(#[from] ToolError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for AgentError {
    fn from(err: serde_json::Error) -> Self {
        AgentError::Storage(StorageError::SerializationError(err))
    }
}
