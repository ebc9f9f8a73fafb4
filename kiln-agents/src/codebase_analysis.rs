use crate::error::AgentError;
use crate::profile::{AgentProfile, ProfileOverrides};
use crate::runtime::Runtime;
use crate::storage::AgentStorage;
use crate::tools::AgentTool;
use crate::Agent;
use kiln_llm::LlmClient;
use kiln_tools::{ToolError, ToolExecutor};
use std::path::PathBuf;
use std::sync::Arc;

pub const AGENT_NAME: &str = "codebase-analysis";

const SYSTEM_PROMPT: &str = "You are a codebase analysis expert. Your role is to examine code \
repositories, understand their structure, identify architectural patterns, and provide clear \
insights about how the codebase is organized. Look at file layout, module boundaries, \
dependencies and design decisions. Use list_files to explore directories, grep to find \
definitions and usages, and read_file to inspect the files that matter. All paths are relative \
to the repository root.";

/// Explores a repository with read-only file tools.
pub struct CodebaseAnalysisAgent {
    profile: AgentProfile,
    runtime: Runtime,
}

impl CodebaseAnalysisAgent {
    pub fn new(
        client: Arc<dyn LlmClient>,
        storage: Arc<dyn AgentStorage>,
        base_path: impl Into<PathBuf>,
    ) -> Result<Self, AgentError> {
        let base_path = base_path.into();
        if !base_path.is_dir() {
            return Err(AgentError::Validation(ToolError::NotFound(format!(
                "Directory does not exist: {}",
                base_path.display()
            ))));
        }

        let tool_executor = ToolExecutor::new(&base_path);
        let profile = AgentProfile::new(
            AGENT_NAME,
            "Analyze codebase structure and identify architectural patterns",
            SYSTEM_PROMPT,
            vec![AgentTool::ListFiles, AgentTool::ReadFile, AgentTool::Grep],
        )
        .with_config(serde_json::json!({
            "base_path": tool_executor.base_path().display().to_string(),
        }));

        Ok(Self {
            profile,
            runtime: Runtime::new(client, storage, Arc::new(tool_executor)),
        })
    }

    pub fn with_overrides(mut self, overrides: ProfileOverrides) -> Self {
        self.runtime = self.runtime.with_overrides(overrides);
        self
    }
}

impl Agent for CodebaseAnalysisAgent {
    fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    fn runtime(&self) -> &Runtime {
        &self.runtime
    }
}
