//! Typed requests and responses for every tool the runtime can dispatch.

mod bash;
mod filesystem;
mod grep;
mod sqlite_reader;

pub use bash::{BashRequest, BashResponse};
pub use filesystem::{
    ApplyPatchRequest, ApplyPatchResponse, FileEntry, ListFilesRequest, ListFilesResponse,
    PatchOperation, PatchedFile, ReadFileRequest, ReadFileResponse, WriteFileRequest,
    WriteFileResponse,
};
pub use grep::{GrepMatch, GrepRequest, GrepResponse};
pub use shared_types::{AskUserRequest, AskUserResponse};
pub use sqlite_reader::{Sqlite3ReaderRequest, Sqlite3ReaderResponse, SqliteMode};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolRequest {
    ListFiles(ListFilesRequest),
    ReadFile(ReadFileRequest),
    WriteFile(WriteFileRequest),
    Grep(GrepRequest),
    ApplyPatch(ApplyPatchRequest),
    Bash(BashRequest),
    AskUser(AskUserRequest),
    #[serde(rename = "sqlite3_reader")]
    Sqlite3Reader(Sqlite3ReaderRequest),
}

impl ToolRequest {
    /// Name the model uses to invoke this tool.
    pub fn tool_name(&self) -> &'static str {
        match self {
            ToolRequest::ListFiles(_) => "list_files",
            ToolRequest::ReadFile(_) => "read_file",
            ToolRequest::WriteFile(_) => "write_file",
            ToolRequest::Grep(_) => "grep",
            ToolRequest::ApplyPatch(_) => "apply_patch",
            ToolRequest::Bash(_) => "bash",
            ToolRequest::AskUser(_) => "ask_user",
            ToolRequest::Sqlite3Reader(_) => "sqlite3_reader",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolResponse {
    ListFiles(ListFilesResponse),
    ReadFile(ReadFileResponse),
    WriteFile(WriteFileResponse),
    Grep(GrepResponse),
    ApplyPatch(ApplyPatchResponse),
    Bash(BashResponse),
    AskUser(AskUserResponse),
    #[serde(rename = "sqlite3_reader")]
    Sqlite3Reader(Sqlite3ReaderResponse),
}

impl ToolResponse {
    /// Plain-text rendering handed back to the model as the tool result.
    pub fn to_llm_text(&self) -> String {
        match self {
            ToolResponse::ListFiles(response) => {
                let mut out = String::new();
                for entry in &response.entries {
                    if entry.is_directory {
                        out.push_str(&format!("{}/\n", entry.path));
                    } else {
                        match entry.size {
                            Some(size) => out.push_str(&format!("{} ({} bytes)\n", entry.path, size)),
                            None => out.push_str(&format!("{}\n", entry.path)),
                        }
                    }
                }
                out.push_str(&format!("{} entries", response.total_files));
                if response.truncated {
                    out.push_str(" (truncated)");
                }
                out
            }
            ToolResponse::ReadFile(response) => response.content.clone(),
            ToolResponse::WriteFile(response) => format!(
                "{} {} bytes to {}",
                if response.created { "Created file with" } else { "Wrote" },
                response.bytes_written,
                response.path
            ),
            ToolResponse::Grep(response) => {
                if response.matches.is_empty() {
                    return format!(
                        "No matches for '{}' in {} files",
                        response.pattern, response.files_searched
                    );
                }
                let mut out = String::new();
                for m in &response.matches {
                    out.push_str(&format!("{}:{}: {}\n", m.file_path, m.line_number, m.line_content));
                }
                out.push_str(&format!(
                    "{} matches in {} files searched",
                    response.total_matches, response.files_searched
                ));
                if response.truncated {
                    out.push_str(" (truncated)");
                }
                out
            }
            ToolResponse::ApplyPatch(response) => {
                let mut out = format!(
                    "Patch applied: {} files changed, +{} -{}\n",
                    response.files_changed.len(),
                    response.additions,
                    response.deletions
                );
                for file in &response.files_changed {
                    let op = match file.operation {
                        PatchOperation::Add => "A",
                        PatchOperation::Delete => "D",
                        PatchOperation::Update => "M",
                    };
                    match &file.moved_to {
                        Some(to) => out.push_str(&format!("{} {} -> {}\n", op, file.path, to)),
                        None => out.push_str(&format!("{} {}\n", op, file.path)),
                    }
                }
                out.trim_end().to_string()
            }
            ToolResponse::Bash(response) => {
                let mut out = format!("Exit code: {}\n", response.exit_code);
                if !response.stdout.is_empty() {
                    out.push_str(&format!("stdout:\n{}\n", response.stdout));
                }
                if !response.stderr.is_empty() {
                    out.push_str(&format!("stderr:\n{}\n", response.stderr));
                }
                out.trim_end().to_string()
            }
            ToolResponse::AskUser(response) => {
                let mut out = response.message.clone();
                for answer in &response.responses {
                    out.push_str(&format!("\n{}: {}", answer.question_id, answer.answer));
                }
                out
            }
            ToolResponse::Sqlite3Reader(response) => response.formatted_output.clone(),
        }
    }
}
