use super::{display_path, resolve_path};
use crate::error::ToolError;
use crate::types::{WriteFileRequest, WriteFileResponse};
use std::fs;
use std::io::Write;
use std::path::Path;

pub fn write_file(base: &Path, request: WriteFileRequest) -> Result<WriteFileResponse, ToolError> {
    request.validate().map_err(ToolError::InvalidArgument)?;

    let target = resolve_path(base, &request.path)?;
    if target.is_dir() {
        return Err(ToolError::InvalidArgument(format!(
            "Path is a directory: {}",
            request.path
        )));
    }
    let existed = target.exists();

    if let (Some(search), Some(replace)) = (&request.search, &request.replace) {
        if !existed {
            return Err(ToolError::NotFound(format!(
                "File does not exist: {}",
                request.path
            )));
        }
        let existing = fs::read_to_string(&target)?;
        if !existing.contains(search.as_str()) {
            return Err(ToolError::InvalidArgument(format!(
                "Search text not found in {}",
                request.path
            )));
        }
        let updated = existing.replacen(search.as_str(), replace, 1);
        fs::write(&target, &updated)?;
        return Ok(WriteFileResponse {
            path: display_path(base, &target),
            bytes_written: updated.len() as u64,
            created: false,
        });
    }

    if let Some(parent) = target.parent() {
        if !parent.exists() {
            if request.create_dirs.unwrap_or(false) {
                fs::create_dir_all(parent)?;
            } else {
                return Err(ToolError::NotFound(format!(
                    "Parent directory does not exist for {} (set create_dirs to create it)",
                    request.path
                )));
            }
        }
    }

    if request.append.unwrap_or(false) {
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&target)?;
        file.write_all(request.content.as_bytes())?;
    } else {
        fs::write(&target, &request.content)?;
    }

    Ok(WriteFileResponse {
        path: display_path(base, &target),
        bytes_written: request.content.len() as u64,
        created: !existed,
    })
}
