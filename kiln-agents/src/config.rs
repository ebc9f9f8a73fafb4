use crate::error::AgentError;
use crate::profile::ProfileOverrides;
use config::{Config, ConfigError, Environment, File};
use kiln_llm::{ClaudeClient, LlmClient, OpenAiClient};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-5";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";

const DEFAULT_CONFIG: &str = r#"
[llm]
# provider = "anthropic" or "openai"
provider = "anthropic"
# model = "claude-sonnet-4-5"
# base_url = "http://localhost:11434/v1"
# max_tokens = 4096

[api_keys]
# anthropic_api_key = "your-anthropic-key"
# openai_api_key = "your-openai-key"

[runtime]
# max_iterations = 30
# temperature = 0.7

[database]
# path = "/path/to/sessions.sqlite"

[bash]
# timeout_secs = 120
"#;

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct KilnConfig {
    #[serde(default)]
    pub llm: LlmConfig,
    pub api_keys: Option<ApiKeysConfig>,
    #[serde(default)]
    pub runtime: RuntimeConfig,
    pub database: Option<DatabaseConfig>,
    pub bash: Option<BashConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    Anthropic,
    OpenAi,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: LlmProvider,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ApiKeysConfig {
    pub anthropic_api_key: Option<String>,
    pub openai_api_key: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct RuntimeConfig {
    pub max_iterations: Option<u32>,
    pub temperature: Option<f32>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BashConfig {
    pub timeout_secs: Option<u64>,
}

impl KilnConfig {
    /// Load from the user config directory, writing a commented default on first run.
    pub fn load() -> Result<(Self, PathBuf), ConfigError> {
        let config_path = get_config_path();
        let config = Self::load_from(&config_path)?;
        Ok((config, config_path))
    }

    pub fn load_from(config_path: &Path) -> Result<Self, ConfigError> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ConfigError::Message(format!("Failed to create config directory: {e}"))
            })?;
        }

        if !config_path.exists() {
            std::fs::write(config_path, DEFAULT_CONFIG).map_err(|e| {
                ConfigError::Message(format!("Failed to write default config: {e}"))
            })?;
            tracing::info!("Wrote default config to {}", config_path.display());
        }

        let builder = Config::builder()
            .add_source(File::from(config_path.to_path_buf()))
            .add_source(
                Environment::with_prefix("KILN")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        builder.try_deserialize()
    }

    pub fn overrides(&self) -> ProfileOverrides {
        ProfileOverrides {
            max_iterations: self.runtime.max_iterations,
            temperature: self.runtime.temperature,
            max_tokens: self.llm.max_tokens,
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.database
            .as_ref()
            .and_then(|db| db.path.clone())
            .unwrap_or_else(default_db_path)
    }

    pub fn bash_timeout_secs(&self) -> Option<u64> {
        self.bash.as_ref().and_then(|bash| bash.timeout_secs)
    }

    pub fn model(&self) -> String {
        self.llm.model.clone().unwrap_or_else(|| {
            match self.llm.provider {
                LlmProvider::Anthropic => DEFAULT_ANTHROPIC_MODEL,
                LlmProvider::OpenAi => DEFAULT_OPENAI_MODEL,
            }
            .to_string()
        })
    }

    pub fn build_client(&self) -> Result<Arc<dyn LlmClient>, AgentError> {
        let keys = self.api_keys.clone().unwrap_or_default();
        let model = self.model();

        let client: Arc<dyn LlmClient> = match self.llm.provider {
            LlmProvider::Anthropic => {
                let api_key = keys
                    .anthropic_api_key
                    .ok_or_else(|| missing_key("anthropic_api_key"))?;
                let mut client = ClaudeClient::new(api_key, model)?;
                if let Some(base_url) = &self.llm.base_url {
                    client = client.with_base_url(base_url);
                }
                Arc::new(client)
            }
            LlmProvider::OpenAi => {
                let api_key = keys
                    .openai_api_key
                    .ok_or_else(|| missing_key("openai_api_key"))?;
                let mut client = OpenAiClient::new(api_key, model)?;
                if let Some(base_url) = &self.llm.base_url {
                    client = client.with_base_url(base_url);
                }
                Arc::new(client)
            }
        };

        tracing::info!(
            provider = client.provider_name(),
            model = client.model_name(),
            "Created LLM client"
        );
        Ok(client)
    }
}

fn missing_key(name: &str) -> AgentError {
    AgentError::Config(format!(
        "Missing {} in [api_keys] of {}",
        name,
        get_config_path().display()
    ))
}

pub fn get_config_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        config_dir.join("kiln").join("agents.toml")
    } else {
        PathBuf::from("agents.toml")
    }
}

pub fn default_db_path() -> PathBuf {
    if let Some(data_dir) = dirs::data_local_dir() {
        data_dir.join("kiln").join("sessions.sqlite")
    } else {
        PathBuf::from("sessions.sqlite")
    }
}
