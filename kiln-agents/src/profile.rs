use crate::tools::{tool_definitions, AgentTool};
use kiln_llm::Tool;

pub const DEFAULT_MAX_ITERATIONS: u32 = 30;
pub const DEFAULT_MAX_TOKENS: u32 = 4096;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Everything the runtime needs to know about an agent.
///
/// Tool definitions are generated once here and reused on every completion call.
#[derive(Debug, Clone)]
pub struct AgentProfile {
    pub name: String,
    pub objective: String,
    pub system_prompt: String,
    pub tools: Vec<AgentTool>,
    pub tool_definitions: Vec<Tool>,
    pub max_iterations: u32,
    pub temperature: Option<f32>,
    pub max_tokens: u32,
    /// Agent-specific settings recorded with each session
    pub config: serde_json::Value,
}

impl AgentProfile {
    pub fn new(
        name: impl Into<String>,
        objective: impl Into<String>,
        system_prompt: impl Into<String>,
        tools: Vec<AgentTool>,
    ) -> Self {
        let tool_definitions = tool_definitions(&tools);
        Self {
            name: name.into(),
            objective: objective.into(),
            system_prompt: system_prompt.into(),
            tools,
            tool_definitions,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            temperature: Some(DEFAULT_TEMPERATURE),
            max_tokens: DEFAULT_MAX_TOKENS,
            config: serde_json::json!({}),
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_config(mut self, config: serde_json::Value) -> Self {
        self.config = config;
        self
    }

    /// Snapshot stored in the session's config column.
    pub fn session_config(&self) -> serde_json::Value {
        serde_json::json!({
            "objective": self.objective,
            "tools": self.tools.iter().map(AgentTool::name).collect::<Vec<_>>(),
            "max_iterations": self.max_iterations,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
            "settings": self.config,
        })
    }
}

/// Settings from the configuration file that take precedence over an agent's own.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProfileOverrides {
    pub max_iterations: Option<u32>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl ProfileOverrides {
    pub fn is_empty(&self) -> bool {
        self.max_iterations.is_none() && self.temperature.is_none() && self.max_tokens.is_none()
    }

    pub fn apply(&self, profile: &AgentProfile) -> AgentProfile {
        let mut profile = profile.clone();
        if let Some(max_iterations) = self.max_iterations {
            profile.max_iterations = max_iterations;
        }
        if let Some(temperature) = self.temperature {
            profile.temperature = Some(temperature);
        }
        if let Some(max_tokens) = self.max_tokens {
            profile.max_tokens = max_tokens;
        }
        profile
    }
}
