//! Provider-neutral completion API used by the agent runtime.
//!
//! The runtime only ever talks to [`LlmClient`]; each provider module owns the
//! translation between these types and its own wire format.

pub mod claude;
pub mod client;
pub mod error;
pub mod openai;
pub mod tools;
pub mod types;

pub use claude::ClaudeClient;
pub use client::LlmClient;
pub use error::LlmError;
pub use openai::OpenAiClient;
pub use tools::{Tool, ToolBuilder, ToolCall, ToolChoice};
pub use types::{CompletionRequest, CompletionResponse, ContentBlock, Message, Role, Usage};
