use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// List files and directories under a path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ListFilesRequest {
    /// Directory to list, relative to the working directory. Defaults to "."
    #[serde(default)]
    pub path: String,
    /// Descend into subdirectories
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recursive: Option<bool>,
    /// Include entries whose name starts with a dot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_hidden: Option<bool>,
    /// Maximum number of entries to return (default 100, maximum 1000)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_files: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Path relative to the listed directory
    pub path: String,
    pub is_directory: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListFilesResponse {
    pub path: String,
    pub entries: Vec<FileEntry>,
    pub total_files: u32,
    pub truncated: bool,
}

/// Read the contents of a UTF-8 text file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ReadFileRequest {
    /// File to read, relative to the working directory
    pub path: String,
    /// Refuse files larger than this many bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_size: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadFileResponse {
    pub path: String,
    pub content: String,
    pub size: u64,
}

/// Write a file, or replace the first occurrence of `search` with `replace`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WriteFileRequest {
    /// File to write, relative to the working directory
    pub path: String,
    /// Full content to write. Ignored when search/replace is used
    #[serde(default)]
    pub content: String,
    /// Create missing parent directories
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_dirs: Option<bool>,
    /// Append to the file instead of overwriting it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub append: Option<bool>,
    /// Exact text to find in the existing file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    /// Replacement for the first occurrence of `search`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replace: Option<String>,
}

impl WriteFileRequest {
    pub fn validate(&self) -> Result<(), String> {
        match (&self.search, &self.replace) {
            (Some(search), Some(_)) => {
                if search.is_empty() {
                    return Err("search text cannot be empty".to_string());
                }
                if self.append.unwrap_or(false) {
                    return Err("append cannot be combined with search/replace".to_string());
                }
                Ok(())
            }
            (Some(_), None) => Err("search requires replace".to_string()),
            (None, Some(_)) => Err("replace requires search".to_string()),
            (None, None) => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteFileResponse {
    pub path: String,
    pub bytes_written: u64,
    pub created: bool,
}

/// Apply a multi-file patch in the "*** Begin Patch" format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ApplyPatchRequest {
    /// Patch text starting with "*** Begin Patch" and ending with "*** End Patch".
    /// File sections are "*** Add File: <path>", "*** Delete File: <path>" and
    /// "*** Update File: <path>" (optionally followed by "*** Move to: <path>").
    /// Update hunks start with "@@" and use ' ', '-' and '+' line prefixes.
    pub patch: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchOperation {
    Add,
    Delete,
    Update,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchedFile {
    pub path: String,
    pub operation: PatchOperation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moved_to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplyPatchResponse {
    pub files_changed: Vec<PatchedFile>,
    pub additions: usize,
    pub deletions: usize,
}
