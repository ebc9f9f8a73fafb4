use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Run a shell command. Only commands allowed by the agent's policy will run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BashRequest {
    /// The command line to execute
    pub command: String,
    /// Working directory, relative to the agent's working directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,
    /// Timeout in seconds (default 30, maximum 600)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BashResponse {
    pub command: String,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub execution_time_ms: u64,
}
