//! Sandboxed tools an agent can call: file access, search, patching, a restricted shell,
//! read-only SQLite and questions to the user.

pub mod bash;
pub mod error;
pub mod executor;
pub mod filesystem;
pub mod grep;
pub mod sqlite_reader;
pub mod types;
pub mod user_interaction;

pub use bash::{BashExecutor, BashPermissions, PermissionAction, PermissionRule};
pub use error::ToolError;
pub use executor::{ToolExecutor, ToolExecutorBuilder, DEFAULT_MAX_FILE_SIZE};
pub use types::*;
pub use user_interaction::{ChannelPrompter, PendingPrompt, StdinPrompter, UserPrompter};
