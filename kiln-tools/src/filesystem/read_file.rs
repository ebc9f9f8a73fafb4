use super::{display_path, resolve_path};
use crate::error::ToolError;
use crate::types::{ReadFileRequest, ReadFileResponse};
use std::fs;
use std::path::Path;

pub fn read_file(
    base: &Path,
    max_file_size: u64,
    request: ReadFileRequest,
) -> Result<ReadFileResponse, ToolError> {
    let target = resolve_path(base, &request.path)?;
    if !target.exists() {
        return Err(ToolError::NotFound(format!(
            "File does not exist: {}",
            request.path
        )));
    }
    if target.is_dir() {
        return Err(ToolError::InvalidArgument(format!(
            "Path is a directory, not a file: {}",
            request.path
        )));
    }

    let size = fs::metadata(&target)?.len();
    let limit = request
        .max_size
        .map_or(max_file_size, |requested| requested.min(max_file_size));
    if size > limit {
        return Err(ToolError::InvalidArgument(format!(
            "File is too large: {} bytes (max: {})",
            size, limit
        )));
    }

    let bytes = fs::read(&target)?;
    let content = String::from_utf8(bytes).map_err(|_| {
        ToolError::InvalidArgument(format!("File is not valid UTF-8 text: {}", request.path))
    })?;

    Ok(ReadFileResponse {
        path: display_path(base, &target),
        content,
        size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn base() -> (TempDir, std::path::PathBuf) {
        let dir = TempDir::new().unwrap();
        let base = dir.path().canonicalize().unwrap();
        (dir, base)
    }

    fn request(path: &str) -> ReadFileRequest {
        ReadFileRequest {
            path: path.to_string(),
            max_size: None,
        }
    }

    #[test]
    fn test_reads_text_file() {
        let (_dir, base) = base();
        fs::write(base.join("notes.md"), "line one\nline two\n").unwrap();

        let response = read_file(&base, 1024, request("notes.md")).unwrap();
        assert_eq!(response.content, "line one\nline two\n");
        assert_eq!(response.size, 18);
        assert_eq!(response.path, "notes.md");
    }

    #[test]
    fn test_size_ceiling() {
        let (_dir, base) = base();
        fs::write(base.join("big.txt"), "x".repeat(100)).unwrap();

        assert!(matches!(
            read_file(&base, 50, request("big.txt")),
            Err(ToolError::InvalidArgument(_))
        ));

        let mut req = request("big.txt");
        req.max_size = Some(10);
        assert!(matches!(
            read_file(&base, 1024, req),
            Err(ToolError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_binary_and_missing_files() {
        let (_dir, base) = base();
        fs::write(base.join("image.bin"), [0xff, 0xfe, 0x00, 0x80]).unwrap();

        assert!(matches!(
            read_file(&base, 1024, request("image.bin")),
            Err(ToolError::InvalidArgument(_))
        ));
        assert!(matches!(
            read_file(&base, 1024, request("missing.txt")),
            Err(ToolError::NotFound(_))
        ));
    }
}
