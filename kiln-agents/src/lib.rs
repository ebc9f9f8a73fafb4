//! Agents that drive a persisted conversation between a completion service and a
//! fixed set of sandboxed tools.
//!
//! Every agent is a thin configuration ([`AgentProfile`]) over one [`Runtime`].

pub mod codebase_analysis;
pub mod config;
pub mod error;
pub mod factory;
pub mod profile;
pub mod requirements_gathering;
pub mod runtime;
pub mod sqlite_reader;
pub mod storage;
pub mod tesseract;
pub mod tools;

#[cfg(test)]
pub(crate) mod testing;

pub use codebase_analysis::CodebaseAnalysisAgent;
pub use error::AgentError;
pub use factory::{AgentFactory, AgentKind};
pub use profile::{AgentProfile, ProfileOverrides};
pub use requirements_gathering::RequirementsGatheringAgent;
pub use runtime::Runtime;
pub use sqlite_reader::SqliteReaderAgent;
pub use storage::{AgentStorage, InMemoryStorage, SqliteAgentStorage, StorageError};
pub use tesseract::TesseractAgent;
pub use tools::AgentTool;

use async_trait::async_trait;

/// An agent: a profile and the runtime that executes it.
#[async_trait]
pub trait Agent: Send + Sync {
    fn profile(&self) -> &AgentProfile;

    fn runtime(&self) -> &Runtime;

    fn name(&self) -> &str {
        &self.profile().name
    }

    fn objective(&self) -> &str {
        &self.profile().objective
    }

    fn system_prompt(&self) -> &str {
        &self.profile().system_prompt
    }

    /// Environment requirements a host should check before running the agent.
    fn pre_conditions(&self) -> Option<Vec<String>> {
        None
    }

    fn tools(&self) -> &[AgentTool] {
        &self.profile().tools
    }

    async fn execute(&self, prompt: &str) -> Result<String, AgentError> {
        self.runtime().execute(self.profile(), prompt).await
    }
}
