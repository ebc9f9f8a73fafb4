use super::{display_path, resolve_path};
use crate::error::ToolError;
use crate::types::{FileEntry, ListFilesRequest, ListFilesResponse};
use std::collections::VecDeque;
use std::fs;
use std::path::Path;

const DEFAULT_MAX_FILES: u32 = 100;
const MAX_FILES_LIMIT: u32 = 1000;

pub fn list_files(base: &Path, request: ListFilesRequest) -> Result<ListFilesResponse, ToolError> {
    let root = resolve_path(base, &request.path)?;
    if !root.exists() {
        return Err(ToolError::NotFound(format!(
            "Path does not exist: {}",
            request.path
        )));
    }
    if !root.is_dir() {
        return Err(ToolError::InvalidArgument(format!(
            "Path is not a directory: {}",
            request.path
        )));
    }

    let recursive = request.recursive.unwrap_or(false);
    let include_hidden = request.include_hidden.unwrap_or(false);
    let max_files = request
        .max_files
        .unwrap_or(DEFAULT_MAX_FILES)
        .clamp(1, MAX_FILES_LIMIT) as usize;

    let mut entries = Vec::new();
    let mut truncated = false;
    let mut queue = VecDeque::from([root.clone()]);

    'walk: while let Some(dir) = queue.pop_front() {
        let mut children: Vec<_> = match fs::read_dir(&dir) {
            Ok(read) => read.filter_map(Result::ok).collect(),
            Err(err) if dir == root => return Err(err.into()),
            Err(_) => continue,
        };
        children.sort_by_key(|entry| entry.file_name());

        for child in children {
            let name = child.file_name();
            if !include_hidden && name.to_string_lossy().starts_with('.') {
                continue;
            }
            let metadata = match child.metadata() {
                Ok(metadata) => metadata,
                Err(_) => continue,
            };

            if entries.len() >= max_files {
                truncated = true;
                break 'walk;
            }

            let path = child.path();
            let is_directory = metadata.is_dir();
            entries.push(FileEntry {
                path: display_path(&root, &path),
                is_directory,
                size: (!is_directory).then(|| metadata.len()),
            });

            if recursive && is_directory && !metadata.file_type().is_symlink() {
                queue.push_back(path);
            }
        }
    }

    entries.sort_by(|a, b| a.path.cmp(&b.path));

    Ok(ListFilesResponse {
        path: display_path(base, &root),
        total_files: entries.len() as u32,
        entries,
        truncated,
    })
}
