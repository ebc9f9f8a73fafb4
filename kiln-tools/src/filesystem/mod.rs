pub mod apply_patch;
pub mod list_files;
pub mod read_file;
pub mod write_file;

use crate::error::ToolError;
use std::path::{Component, Path, PathBuf};

/// Resolve a model-supplied path against `base`, refusing anything that lands outside it.
///
/// `base` must already be canonical. Paths that do not exist yet are resolved through
/// their closest existing ancestor so symlinked parents cannot escape the base either.
pub fn resolve_path(base: &Path, requested: &str) -> Result<PathBuf, ToolError> {
    let requested = requested.trim();
    let candidate = if requested.is_empty() || requested == "." {
        base.to_path_buf()
    } else {
        let path = Path::new(requested);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base.join(path)
        }
    };

    let normalized = normalize(&candidate);
    let resolved = match normalized.canonicalize() {
        Ok(path) => path,
        Err(_) => canonicalize_existing_prefix(&normalized),
    };

    if !resolved.starts_with(base) {
        return Err(ToolError::PermissionDenied(format!(
            "Path '{}' is outside the working directory",
            requested
        )));
    }

    Ok(resolved)
}

/// Path of `path` relative to `base`, with forward slashes, for display to the model.
pub fn display_path(base: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(base).unwrap_or(path);
    let shown = relative.to_string_lossy().replace('\\', "/");
    if shown.is_empty() {
        ".".to_string()
    } else {
        shown
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn canonicalize_existing_prefix(path: &Path) -> PathBuf {
    let mut existing = path.to_path_buf();
    let mut rest = Vec::new();
    while !existing.exists() {
        match existing.file_name() {
            Some(name) => rest.push(name.to_os_string()),
            None => break,
        }
        if !existing.pop() {
            break;
        }
    }

    let mut resolved = existing.canonicalize().unwrap_or(existing);
    for name in rest.into_iter().rev() {
        resolved.push(name);
    }
    resolved
}
