use crate::error::AgentError;
use crate::profile::{AgentProfile, ProfileOverrides};
use crate::runtime::Runtime;
use crate::storage::AgentStorage;
use crate::tools::AgentTool;
use crate::Agent;
use kiln_llm::LlmClient;
use kiln_tools::{BashExecutor, BashPermissions, ToolError, ToolExecutor};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const AGENT_NAME: &str = "tesseract";
pub const DEFAULT_BASH_TIMEOUT_SECS: u64 = 120;

/// Extracts text from one image with the tesseract CLI.
///
/// The shell only admits `tesseract`; file tools are rooted at the image's directory.
pub struct TesseractAgent {
    profile: AgentProfile,
    runtime: Runtime,
    image_path: PathBuf,
}

impl TesseractAgent {
    pub fn new(
        client: Arc<dyn LlmClient>,
        storage: Arc<dyn AgentStorage>,
        image_path: impl Into<PathBuf>,
        bash_timeout_secs: Option<u64>,
    ) -> Result<Self, AgentError> {
        let image_path = image_path.into();
        if !image_path.is_file() {
            return Err(AgentError::Validation(ToolError::NotFound(format!(
                "Image file does not exist: {}",
                image_path.display()
            ))));
        }

        let image_filename = image_path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .ok_or_else(|| {
                AgentError::Validation(ToolError::InvalidArgument(format!(
                    "Image path has no file name: {}",
                    image_path.display()
                )))
            })?;
        let base_path = match image_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let permissions = BashPermissions::minimal(&["tesseract"])
            .map_err(|e| AgentError::Config(format!("Invalid shell permissions: {}", e)))?;
        let bash = BashExecutor::new(permissions)
            .with_default_timeout(bash_timeout_secs.unwrap_or(DEFAULT_BASH_TIMEOUT_SECS));

        let tool_executor = ToolExecutor::builder()
            .base_path(&base_path)
            .bash_executor(bash)
            .build();

        let profile = AgentProfile::new(
            AGENT_NAME,
            "Extract text from images using Tesseract OCR",
            system_prompt(&image_filename),
            vec![AgentTool::Bash, AgentTool::ReadFile, AgentTool::WriteFile],
        )
        .with_config(serde_json::json!({
            "image_path": image_path.display().to_string(),
        }));

        Ok(Self {
            profile,
            runtime: Runtime::new(client, storage, Arc::new(tool_executor)),
            image_path,
        })
    }

    pub fn with_overrides(mut self, overrides: ProfileOverrides) -> Self {
        self.runtime = self.runtime.with_overrides(overrides);
        self
    }

    pub fn image_path(&self) -> &Path {
        &self.image_path
    }
}

impl Agent for TesseractAgent {
    fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    fn pre_conditions(&self) -> Option<Vec<String>> {
        Some(vec![
            "Tesseract OCR must be installed on the system".to_string(),
            "Run 'tesseract --version' to verify installation".to_string(),
            "Install with: brew install tesseract (macOS) or apt-get install tesseract-ocr (Linux)"
                .to_string(),
        ])
    }
}

fn system_prompt(image_filename: &str) -> String {
    format!(
        r#"You are a Tesseract OCR specialist. Your task is to extract text from the image file "{image}" and, when asked, clean and format the extracted text.

You have access to these tools:
1. bash - ONLY for running the tesseract command
2. read_file - To read tesseract output files
3. write_file - To write cleaned results (optional)

# Tesseract Command Format

tesseract {image} <output_base> [options]

Common options:
- -l <lang> - Language (eng, spa, fra, deu, etc.)
- --psm <n> - Page segmentation mode:
  3 = Fully automatic page segmentation (default)
  6 = Assume a single uniform block of text
  11 = Sparse text. Find as much text as possible
- --oem <n> - OCR engine mode:
  1 = Neural nets LSTM engine
  3 = Default (based on what is available)

# Workflow

1. Run tesseract to extract text from the image
   Example: tesseract {image} output -l eng --psm 3
2. Read the output file (tesseract appends .txt)
   Example: read_file output.txt
3. Analyze the extracted text
4. If the user asks for cleaning or formatting:
   - Fix common OCR misrecognitions (l/I, O/0 and similar)
   - Improve formatting and structure
   - Remove noise and artifacts
   - Preserve the intended structure (paragraphs, lists, tables)
5. Present the result to the user
6. Write the cleaned result to a file only if the user asks for it
"#,
        image = image_filename
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStorage;
    use crate::testing::{text_response, tool_response, ScriptedClient};
    use kiln_llm::ToolCall;
    use shared_types::ToolCallStatus;
    use tempfile::TempDir;

    fn image(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("receipt.png");
        std::fs::write(&path, [0x89, b'P', b'N', b'G']).unwrap();
        path
    }

    #[test]
    fn test_missing_image() {
        let result = TesseractAgent::new(
            Arc::new(ScriptedClient::new(vec![])),
            Arc::new(InMemoryStorage::new()),
            "/no/such/receipt.png",
            None,
        );
        assert!(matches!(
            result,
            Err(AgentError::Validation(ToolError::NotFound(_)))
        ));
    }

    #[test]
    fn test_profile() {
        let dir = TempDir::new().unwrap();
        let agent = TesseractAgent::new(
            Arc::new(ScriptedClient::new(vec![])),
            Arc::new(InMemoryStorage::new()),
            image(&dir),
            None,
        )
        .unwrap();

        assert!(agent.system_prompt().contains("tesseract receipt.png output"));
        assert_eq!(
            agent.tools(),
            &[AgentTool::Bash, AgentTool::ReadFile, AgentTool::WriteFile]
        );
        assert_eq!(agent.pre_conditions().map(|p| p.len()), Some(3));
        assert_eq!(
            agent.runtime().tool_executor().base_path(),
            dir.path().canonicalize().unwrap()
        );
    }

    #[tokio::test]
    async fn test_other_commands_are_denied() {
        let dir = TempDir::new().unwrap();
        let client = Arc::new(ScriptedClient::new(vec![
            tool_response(
                "",
                vec![ToolCall::new(
                    "call_1",
                    "bash",
                    serde_json::json!({"command": "cat /etc/passwd"}),
                )],
            ),
            text_response("I can only run tesseract"),
        ]));
        let storage = Arc::new(InMemoryStorage::new());
        let agent = TesseractAgent::new(client, storage.clone(), image(&dir), Some(10)).unwrap();

        agent.execute("Read the receipt").await.unwrap();

        let calls = storage.get_tool_calls(1).await.unwrap();
        assert_eq!(calls[0].status, ToolCallStatus::Failed);
        let messages = storage.get_messages(1).await.unwrap();
        assert!(messages[2].content.starts_with("Tool bash failed: Permission denied"));
    }
}
