use kiln_llm::Tool;
use kiln_tools::{
    ApplyPatchRequest, AskUserRequest, BashRequest, GrepRequest, ListFilesRequest,
    ReadFileRequest, Sqlite3ReaderRequest, ToolError, ToolRequest, WriteFileRequest,
};
use serde::de::DeserializeOwned;

/// Tool capabilities an agent can enable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentTool {
    ListFiles,
    ReadFile,
    WriteFile,
    Grep,
    ApplyPatch,
    Bash,
    AskUser,
    Sqlite3Reader,
}

impl AgentTool {
    pub const ALL: [AgentTool; 8] = [
        AgentTool::ListFiles,
        AgentTool::ReadFile,
        AgentTool::WriteFile,
        AgentTool::Grep,
        AgentTool::ApplyPatch,
        AgentTool::Bash,
        AgentTool::AskUser,
        AgentTool::Sqlite3Reader,
    ];

    /// Name the model uses to call this tool; matches `ToolRequest::tool_name`.
    pub fn name(&self) -> &'static str {
        match self {
            AgentTool::ListFiles => "list_files",
            AgentTool::ReadFile => "read_file",
            AgentTool::WriteFile => "write_file",
            AgentTool::Grep => "grep",
            AgentTool::ApplyPatch => "apply_patch",
            AgentTool::Bash => "bash",
            AgentTool::AskUser => "ask_user",
            AgentTool::Sqlite3Reader => "sqlite3_reader",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.name() == name)
    }

    fn description(&self) -> &'static str {
        match self {
            AgentTool::ListFiles => {
                "List files and directories under a path, breadth first. Hidden entries are skipped unless include_hidden is set."
            }
            AgentTool::ReadFile => "Read the contents of a UTF-8 text file.",
            AgentTool::WriteFile => {
                "Write or append to a file. With search and replace, edit the first occurrence of search instead."
            }
            AgentTool::Grep => {
                "Search file contents with a regular expression. Supports include and exclude glob patterns."
            }
            AgentTool::ApplyPatch => {
                "Apply a patch in the '*** Begin Patch' format to add, delete, update or move files."
            }
            AgentTool::Bash => "Run a shell command. Only permitted commands are executed.",
            AgentTool::AskUser => {
                "Ask the user one or more clarifying questions and wait for their answers."
            }
            AgentTool::Sqlite3Reader => {
                "Run a read-only query (SELECT or PRAGMA) against the configured SQLite database, or reflect its schema."
            }
        }
    }

    /// Name, description and JSON schema advertised to the model.
    pub fn definition(&self) -> Tool {
        let builder = match self {
            AgentTool::ListFiles => Tool::from_type::<ListFilesRequest>(),
            AgentTool::ReadFile => Tool::from_type::<ReadFileRequest>(),
            AgentTool::WriteFile => Tool::from_type::<WriteFileRequest>(),
            AgentTool::Grep => Tool::from_type::<GrepRequest>(),
            AgentTool::ApplyPatch => Tool::from_type::<ApplyPatchRequest>(),
            AgentTool::Bash => Tool::from_type::<BashRequest>(),
            AgentTool::AskUser => Tool::from_type::<AskUserRequest>(),
            AgentTool::Sqlite3Reader => Tool::from_type::<Sqlite3ReaderRequest>(),
        };
        builder.name(self.name()).description(self.description()).build()
    }

    /// Turn a model tool call into a typed request. Unknown or disabled tools and
    /// arguments that do not match the tool's schema are rejected.
    pub fn parse_tool_call(
        name: &str,
        arguments: serde_json::Value,
        enabled: &[AgentTool],
    ) -> Result<ToolRequest, ToolError> {
        let tool = Self::from_name(name)
            .ok_or_else(|| ToolError::InvalidArgument(format!("Unknown tool: {}", name)))?;
        if !enabled.contains(&tool) {
            return Err(ToolError::InvalidArgument(format!(
                "Tool {} is not enabled for this agent",
                name
            )));
        }

        let request = match tool {
            AgentTool::ListFiles => ToolRequest::ListFiles(arguments_as(name, arguments)?),
            AgentTool::ReadFile => ToolRequest::ReadFile(arguments_as(name, arguments)?),
            AgentTool::WriteFile => ToolRequest::WriteFile(arguments_as(name, arguments)?),
            AgentTool::Grep => ToolRequest::Grep(arguments_as(name, arguments)?),
            AgentTool::ApplyPatch => ToolRequest::ApplyPatch(arguments_as(name, arguments)?),
            AgentTool::Bash => ToolRequest::Bash(arguments_as(name, arguments)?),
            AgentTool::AskUser => ToolRequest::AskUser(arguments_as(name, arguments)?),
            AgentTool::Sqlite3Reader => ToolRequest::Sqlite3Reader(arguments_as(name, arguments)?),
        };
        Ok(request)
    }
}

/// Schemas for a tool set, in the order given.
pub fn tool_definitions(tools: &[AgentTool]) -> Vec<Tool> {
    tools.iter().map(AgentTool::definition).collect()
}

fn arguments_as<T: DeserializeOwned>(name: &str, arguments: serde_json::Value) -> Result<T, ToolError> {
    // Some providers send arguments as a JSON-encoded string.
    let arguments = match arguments {
        serde_json::Value::String(raw) => serde_json::from_str(&raw).map_err(|e| {
            ToolError::InvalidArgument(format!("Invalid arguments for {}: {}", name, e))
        })?,
        other => other,
    };
    serde_json::from_value(arguments)
        .map_err(|e| ToolError::InvalidArgument(format!("Invalid arguments for {}: {}", name, e)))
}
