use crate::codebase_analysis::CodebaseAnalysisAgent;
use crate::error::AgentError;
use crate::profile::ProfileOverrides;
use crate::requirements_gathering::RequirementsGatheringAgent;
use crate::sqlite_reader::SqliteReaderAgent;
use crate::storage::AgentStorage;
use crate::tesseract::TesseractAgent;
use crate::Agent;
use kiln_llm::LlmClient;
use kiln_tools::UserPrompter;
use std::path::PathBuf;
use std::sync::Arc;

/// Which agent to build, with the configuration that agent needs.
pub enum AgentKind {
    CodebaseAnalysis { base_path: PathBuf },
    SqliteReader { db_path: PathBuf },
    Tesseract { image_path: PathBuf },
    RequirementsGathering { user_prompter: Arc<dyn UserPrompter> },
}

impl AgentKind {
    pub fn name(&self) -> &'static str {
        match self {
            AgentKind::CodebaseAnalysis { .. } => crate::codebase_analysis::AGENT_NAME,
            AgentKind::SqliteReader { .. } => crate::sqlite_reader::AGENT_NAME,
            AgentKind::Tesseract { .. } => crate::tesseract::AGENT_NAME,
            AgentKind::RequirementsGathering { .. } => crate::requirements_gathering::AGENT_NAME,
        }
    }
}

/// Builds agents that share one client and one storage.
pub struct AgentFactory {
    client: Arc<dyn LlmClient>,
    storage: Arc<dyn AgentStorage>,
    overrides: ProfileOverrides,
    bash_timeout_secs: Option<u64>,
}

impl AgentFactory {
    pub fn new(client: Arc<dyn LlmClient>, storage: Arc<dyn AgentStorage>) -> Self {
        Self {
            client,
            storage,
            overrides: ProfileOverrides::default(),
            bash_timeout_secs: None,
        }
    }

    pub fn with_overrides(mut self, overrides: ProfileOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn with_bash_timeout(mut self, timeout_secs: u64) -> Self {
        self.bash_timeout_secs = Some(timeout_secs);
        self
    }

    pub fn storage(&self) -> &Arc<dyn AgentStorage> {
        &self.storage
    }

    pub async fn create(&self, kind: AgentKind) -> Result<Box<dyn Agent>, AgentError> {
        tracing::debug!(agent = kind.name(), "Creating agent");
        let client = self.client.clone();
        let storage = self.storage.clone();

        let agent: Box<dyn Agent> = match kind {
            AgentKind::CodebaseAnalysis { base_path } => Box::new(
                CodebaseAnalysisAgent::new(client, storage, base_path)?
                    .with_overrides(self.overrides),
            ),
            AgentKind::SqliteReader { db_path } => Box::new(
                SqliteReaderAgent::new(client, storage, db_path)
                    .await?
                    .with_overrides(self.overrides),
            ),
            AgentKind::Tesseract { image_path } => Box::new(
                TesseractAgent::new(client, storage, image_path, self.bash_timeout_secs)?
                    .with_overrides(self.overrides),
            ),
            AgentKind::RequirementsGathering { user_prompter } => Box::new(
                RequirementsGatheringAgent::new(client, storage, user_prompter)
                    .with_overrides(self.overrides),
            ),
        };
        Ok(agent)
    }
}
