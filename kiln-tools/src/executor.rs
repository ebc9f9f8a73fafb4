use crate::bash::BashExecutor;
use crate::error::ToolError;
use crate::filesystem::{apply_patch, list_files, read_file, resolve_path, write_file};
use crate::grep::grep_search;
use crate::sqlite_reader::execute_sqlite3_reader;
use crate::types::{BashRequest, BashResponse, ToolRequest, ToolResponse};
use crate::user_interaction::{ask_user, UserPrompter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Validates and dispatches tool requests inside one working directory.
pub struct ToolExecutor {
    base_path: PathBuf,
    max_file_size: u64,
    bash_executor: Option<BashExecutor>,
    database_path: Option<PathBuf>,
    user_prompter: Option<Arc<dyn UserPrompter>>,
}

impl ToolExecutor {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self::builder().base_path(base_path).build()
    }

    pub fn builder() -> ToolExecutorBuilder {
        ToolExecutorBuilder::default()
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn database_path(&self) -> Option<&Path> {
        self.database_path.as_deref()
    }

    pub async fn execute(&self, request: ToolRequest) -> Result<ToolResponse, ToolError> {
        let tool_name = request.tool_name();
        let started = Instant::now();

        let result = self.dispatch(request).await;

        let execution_time_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => tracing::debug!(tool_name, execution_time_ms, "Tool executed"),
            Err(e) => tracing::warn!(tool_name, execution_time_ms, error = %e, "Tool failed"),
        }
        result
    }

    async fn dispatch(&self, request: ToolRequest) -> Result<ToolResponse, ToolError> {
        match request {
            ToolRequest::ListFiles(req) => {
                let base = self.base_path.clone();
                blocking(move || list_files::list_files(&base, req))
                    .await
                    .map(ToolResponse::ListFiles)
            }
            ToolRequest::ReadFile(req) => {
                let base = self.base_path.clone();
                let max = self.max_file_size;
                blocking(move || read_file::read_file(&base, max, req))
                    .await
                    .map(ToolResponse::ReadFile)
            }
            ToolRequest::WriteFile(req) => {
                let base = self.base_path.clone();
                blocking(move || write_file::write_file(&base, req))
                    .await
                    .map(ToolResponse::WriteFile)
            }
            ToolRequest::Grep(req) => {
                let base = self.base_path.clone();
                blocking(move || grep_search(&base, req))
                    .await
                    .map(ToolResponse::Grep)
            }
            ToolRequest::ApplyPatch(req) => {
                let base = self.base_path.clone();
                blocking(move || apply_patch::apply_patch(&base, req))
                    .await
                    .map(ToolResponse::ApplyPatch)
            }
            ToolRequest::Bash(req) => self.run_bash(req).await.map(ToolResponse::Bash),
            ToolRequest::AskUser(req) => ask_user(self.user_prompter.as_deref(), req)
                .await
                .map(ToolResponse::AskUser),
            ToolRequest::Sqlite3Reader(req) => {
                // The configured database is always used; the model never picks the file.
                let db_path = self.database_path.clone().ok_or_else(|| {
                    ToolError::InvalidArgument("No database is configured for this agent".to_string())
                })?;
                blocking(move || execute_sqlite3_reader(&db_path, req))
                    .await
                    .map(ToolResponse::Sqlite3Reader)
            }
        }
    }

    async fn run_bash(&self, request: BashRequest) -> Result<BashResponse, ToolError> {
        let bash = self.bash_executor.as_ref().ok_or_else(|| {
            ToolError::PermissionDenied("Shell access is not enabled for this agent".to_string())
        })?;

        let working_dir = resolve_path(
            &self.base_path,
            request.working_dir.as_deref().unwrap_or("."),
        )?;
        if !working_dir.is_dir() {
            return Err(ToolError::NotFound(format!(
                "Working directory does not exist: {}",
                request.working_dir.as_deref().unwrap_or(".")
            )));
        }

        let output = bash
            .execute(&request.command, &working_dir, request.timeout_secs)
            .await?;
        Ok(BashResponse {
            command: request.command,
            stdout: output.stdout,
            stderr: output.stderr,
            exit_code: output.exit_code,
            execution_time_ms: output.execution_time_ms,
        })
    }
}

async fn blocking<T, F>(f: F) -> Result<T, ToolError>
where
    F: FnOnce() -> Result<T, ToolError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}

#[derive(Default)]
pub struct ToolExecutorBuilder {
    base_path: Option<PathBuf>,
    max_file_size: Option<u64>,
    bash_executor: Option<BashExecutor>,
    database_path: Option<PathBuf>,
    user_prompter: Option<Arc<dyn UserPrompter>>,
}

impl ToolExecutorBuilder {
    pub fn base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    pub fn max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = Some(bytes);
        self
    }

    pub fn bash_executor(mut self, executor: BashExecutor) -> Self {
        self.bash_executor = Some(executor);
        self
    }

    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = Some(path.into());
        self
    }

    pub fn user_prompter(mut self, prompter: Arc<dyn UserPrompter>) -> Self {
        self.user_prompter = Some(prompter);
        self
    }

    pub fn build(self) -> ToolExecutor {
        let base_path = self.base_path.unwrap_or_else(|| PathBuf::from("."));
        // Canonical so prefix checks compare like with like.
        let base_path = base_path.canonicalize().unwrap_or(base_path);

        ToolExecutor {
            base_path,
            max_file_size: self.max_file_size.unwrap_or(DEFAULT_MAX_FILE_SIZE),
            bash_executor: self.bash_executor,
            database_path: self.database_path,
            user_prompter: self.user_prompter,
        }
    }
}
