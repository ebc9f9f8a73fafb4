//! Multi-file patches in the envelope format:
//!
//! ```text
//! *** Begin Patch
//! *** Add File: docs/new.md
//! +hello
//! *** Update File: src/lib.rs
//! *** Move to: src/core.rs
//! @@ fn main() {
//! -    old();
//! +    new();
//! *** Delete File: obsolete.txt
//! *** End Patch
//! ```

use super::{display_path, resolve_path};
use crate::error::ToolError;
use crate::types::{ApplyPatchRequest, ApplyPatchResponse, PatchOperation, PatchedFile};
use std::fs;
use std::path::{Path, PathBuf};

const BEGIN_PATCH: &str = "*** Begin Patch";
const END_PATCH: &str = "*** End Patch";
const ADD_FILE: &str = "*** Add File: ";
const DELETE_FILE: &str = "*** Delete File: ";
const UPDATE_FILE: &str = "*** Update File: ";
const MOVE_TO: &str = "*** Move to: ";
const END_OF_FILE: &str = "*** End of File";

#[derive(Debug, PartialEq)]
enum Hunk {
    Add {
        path: String,
        contents: String,
    },
    Delete {
        path: String,
    },
    Update {
        path: String,
        move_to: Option<String>,
        chunks: Vec<Chunk>,
    },
}

#[derive(Debug, Default, PartialEq)]
struct Chunk {
    context: Option<String>,
    old_lines: Vec<String>,
    new_lines: Vec<String>,
    is_end_of_file: bool,
}

/// A fully computed change, ready to be written.
enum FileChange {
    Write {
        target: PathBuf,
        contents: String,
        remove: Option<PathBuf>,
    },
    Remove {
        target: PathBuf,
    },
}

pub fn apply_patch(base: &Path, request: ApplyPatchRequest) -> Result<ApplyPatchResponse, ToolError> {
    let hunks = parse_patch(&request.patch)?;

    let mut changes = Vec::with_capacity(hunks.len());
    let mut files_changed = Vec::with_capacity(hunks.len());
    let mut additions = 0;
    let mut deletions = 0;

    // Every hunk is resolved against the current files before anything is written.
    for hunk in hunks {
        match hunk {
            Hunk::Add { path, contents } => {
                let target = resolve_path(base, &path)?;
                if target.is_dir() {
                    return Err(ToolError::InvalidArgument(format!(
                        "Cannot add file over directory: {}",
                        path
                    )));
                }
                additions += contents.lines().count();
                files_changed.push(PatchedFile {
                    path: display_path(base, &target),
                    operation: PatchOperation::Add,
                    moved_to: None,
                });
                changes.push(FileChange::Write {
                    target,
                    contents,
                    remove: None,
                });
            }
            Hunk::Delete { path } => {
                let target = resolve_path(base, &path)?;
                let existing = read_existing(&target, &path)?;
                deletions += existing.lines().count();
                files_changed.push(PatchedFile {
                    path: display_path(base, &target),
                    operation: PatchOperation::Delete,
                    moved_to: None,
                });
                changes.push(FileChange::Remove { target });
            }
            Hunk::Update {
                path,
                move_to,
                chunks,
            } => {
                let source = resolve_path(base, &path)?;
                let original = read_existing(&source, &path)?;
                let updated = apply_chunks(&original, &chunks, &path)?;
                for chunk in &chunks {
                    additions += chunk.new_lines.len();
                    deletions += chunk.old_lines.len();
                }

                let destination = match &move_to {
                    Some(to) => resolve_path(base, to)?,
                    None => source.clone(),
                };
                files_changed.push(PatchedFile {
                    path: display_path(base, &source),
                    operation: PatchOperation::Update,
                    moved_to: move_to.as_ref().map(|_| display_path(base, &destination)),
                });
                let remove = (destination != source).then_some(source);
                changes.push(FileChange::Write {
                    target: destination,
                    contents: updated,
                    remove,
                });
            }
        }
    }

    for change in changes {
        match change {
            FileChange::Write {
                target,
                contents,
                remove,
            } => {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&target, contents)?;
                if let Some(old) = remove {
                    fs::remove_file(old)?;
                }
            }
            FileChange::Remove { target } => fs::remove_file(target)?,
        }
    }

    tracing::debug!(
        files = files_changed.len(),
        additions,
        deletions,
        "Patch applied"
    );

    Ok(ApplyPatchResponse {
        files_changed,
        additions,
        deletions,
    })
}

fn read_existing(target: &Path, shown: &str) -> Result<String, ToolError> {
    if !target.is_file() {
        return Err(ToolError::NotFound(format!("File does not exist: {}", shown)));
    }
    Ok(fs::read_to_string(target)?)
}

fn invalid(line_number: usize, message: impl std::fmt::Display) -> ToolError {
    ToolError::InvalidArgument(format!("Invalid patch at line {}: {}", line_number, message))
}

fn parse_patch(patch: &str) -> Result<Vec<Hunk>, ToolError> {
    let lines: Vec<&str> = patch.trim().lines().collect();
    match (lines.first(), lines.last()) {
        (Some(first), Some(last)) if first.trim() == BEGIN_PATCH && last.trim() == END_PATCH => {}
        _ => {
            return Err(ToolError::InvalidArgument(format!(
                "Patch must start with '{}' and end with '{}'",
                BEGIN_PATCH, END_PATCH
            )))
        }
    }

    let body = &lines[1..lines.len() - 1];
    let mut hunks = Vec::new();
    let mut index = 0;

    while index < body.len() {
        let line = body[index];
        let line_number = index + 2;

        if let Some(path) = line.strip_prefix(ADD_FILE) {
            index += 1;
            let mut contents = String::new();
            while index < body.len() {
                match body[index].strip_prefix('+') {
                    Some(added) => {
                        contents.push_str(added);
                        contents.push('\n');
                        index += 1;
                    }
                    None => break,
                }
            }
            hunks.push(Hunk::Add {
                path: path.trim().to_string(),
                contents,
            });
        } else if let Some(path) = line.strip_prefix(DELETE_FILE) {
            hunks.push(Hunk::Delete {
                path: path.trim().to_string(),
            });
            index += 1;
        } else if let Some(path) = line.strip_prefix(UPDATE_FILE) {
            index += 1;
            let move_to = match body.get(index).and_then(|l| l.strip_prefix(MOVE_TO)) {
                Some(to) => {
                    index += 1;
                    Some(to.trim().to_string())
                }
                None => None,
            };

            let mut chunks = Vec::new();
            while index < body.len() && !body[index].starts_with("*** ") {
                let (chunk, consumed) = parse_chunk(&body[index..], index + 2, chunks.is_empty())?;
                chunks.push(chunk);
                index += consumed;
            }
            if chunks.is_empty() {
                return Err(invalid(line_number, format!("update of '{}' has no hunks", path.trim())));
            }
            hunks.push(Hunk::Update {
                path: path.trim().to_string(),
                move_to,
                chunks,
            });
        } else if line.trim().is_empty() {
            index += 1;
        } else {
            return Err(invalid(line_number, format!("unexpected line '{}'", line)));
        }
    }

    if hunks.is_empty() {
        return Err(ToolError::InvalidArgument("Patch contains no file changes".to_string()));
    }
    Ok(hunks)
}

/// Parse one `@@` chunk. The header may be omitted on the first chunk of a file.
fn parse_chunk(
    lines: &[&str],
    line_number: usize,
    allow_missing_header: bool,
) -> Result<(Chunk, usize), ToolError> {
    let mut chunk = Chunk::default();
    let mut consumed = 0;

    match lines[0] {
        "@@" => consumed = 1,
        header if header.starts_with("@@ ") => {
            chunk.context = Some(header[3..].to_string());
            consumed = 1;
        }
        _ if allow_missing_header => {}
        other => {
            return Err(invalid(
                line_number,
                format!("expected '@@' hunk header, found '{}'", other),
            ))
        }
    }

    let mut body_lines = 0;
    while consumed < lines.len() {
        let line = lines[consumed];
        if line == END_OF_FILE {
            chunk.is_end_of_file = true;
            consumed += 1;
            break;
        }
        if line.starts_with("@@") || line.starts_with("*** ") {
            break;
        }
        match line.chars().next() {
            None => {
                chunk.old_lines.push(String::new());
                chunk.new_lines.push(String::new());
            }
            Some(' ') => {
                chunk.old_lines.push(line[1..].to_string());
                chunk.new_lines.push(line[1..].to_string());
            }
            Some('-') => chunk.old_lines.push(line[1..].to_string()),
            Some('+') => chunk.new_lines.push(line[1..].to_string()),
            Some(_) => {
                return Err(invalid(
                    line_number + consumed,
                    format!("hunk lines must start with ' ', '-' or '+': '{}'", line),
                ))
            }
        }
        body_lines += 1;
        consumed += 1;
    }

    if body_lines == 0 {
        return Err(invalid(line_number, "hunk has no lines"));
    }
    Ok((chunk, consumed))
}

fn apply_chunks(original: &str, chunks: &[Chunk], path: &str) -> Result<String, ToolError> {
    let mut lines: Vec<String> = original.split('\n').map(str::to_string).collect();
    if lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }

    let mut replacements: Vec<(usize, usize, Vec<String>)> = Vec::new();
    let mut cursor = 0;

    for chunk in chunks {
        if let Some(context) = &chunk.context {
            let found = seek_sequence(&lines, std::slice::from_ref(context), cursor, false)
                .ok_or_else(|| {
                    ToolError::InvalidArgument(format!(
                        "Failed to find context '{}' in {}",
                        context, path
                    ))
                })?;
            cursor = found + 1;
        }

        if chunk.old_lines.is_empty() {
            let at = if chunk.context.is_some() { cursor } else { lines.len() };
            replacements.push((at, 0, chunk.new_lines.clone()));
            continue;
        }

        let mut pattern: &[String] = &chunk.old_lines;
        let mut new_lines: &[String] = &chunk.new_lines;
        let mut found = seek_sequence(&lines, pattern, cursor, chunk.is_end_of_file);
        if found.is_none() && pattern.last().is_some_and(|l| l.is_empty()) {
            // A trailing blank line in the hunk often stands for the file's final newline.
            pattern = &pattern[..pattern.len() - 1];
            if new_lines.last().is_some_and(|l| l.is_empty()) {
                new_lines = &new_lines[..new_lines.len() - 1];
            }
            found = seek_sequence(&lines, pattern, cursor, chunk.is_end_of_file);
        }

        let start = found.ok_or_else(|| {
            ToolError::InvalidArgument(format!(
                "Failed to find expected lines in {}:\n{}",
                path,
                chunk.old_lines.join("\n")
            ))
        })?;
        replacements.push((start, pattern.len(), new_lines.to_vec()));
        cursor = start + pattern.len();
    }

    replacements.sort_by_key(|(start, _, _)| *start);
    for (start, len, new_lines) in replacements.into_iter().rev() {
        lines.splice(start..start + len, new_lines);
    }

    let mut out = lines.join("\n");
    out.push('\n');
    Ok(out)
}

/// Find `pattern` in `lines` at or after `start`, trying exact, trailing-whitespace-insensitive
/// and whitespace-insensitive comparisons in that order.
fn seek_sequence(lines: &[String], pattern: &[String], start: usize, at_eof: bool) -> Option<usize> {
    if pattern.is_empty() {
        return Some(start);
    }
    if pattern.len() > lines.len() {
        return None;
    }

    let last_start = lines.len() - pattern.len();
    let first = if at_eof { last_start.max(start) } else { start };
    if first > last_start {
        return None;
    }

    let passes: [fn(&str, &str) -> bool; 3] = [
        |a, b| a == b,
        |a, b| a.trim_end() == b.trim_end(),
        |a, b| a.trim() == b.trim(),
    ];

    passes.iter().find_map(|eq| {
        (first..=last_start).find(|&i| {
            pattern
                .iter()
                .enumerate()
                .all(|(offset, expected)| eq(&lines[i + offset], expected))
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn base() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let base = dir.path().canonicalize().unwrap();
        (dir, base)
    }

    fn patch(body: &str) -> ApplyPatchRequest {
        ApplyPatchRequest {
            patch: format!("*** Begin Patch\n{}\n*** End Patch", body),
        }
    }

    #[test]
    fn test_add_update_delete() {
        let (_dir, base) = base();
        fs::write(base.join("main.rs"), "fn main() {\n    old();\n}\n").unwrap();
        fs::write(base.join("gone.txt"), "bye\n").unwrap();

        let response = apply_patch(
            &base,
            patch(
                "*** Add File: docs/readme.md\n+# Title\n+body\n\
                 *** Update File: main.rs\n@@ fn main() {\n-    old();\n+    new();\n\
                 *** Delete File: gone.txt",
            ),
        )
        .unwrap();

        assert_eq!(
            fs::read_to_string(base.join("docs/readme.md")).unwrap(),
            "# Title\nbody\n"
        );
        assert_eq!(
            fs::read_to_string(base.join("main.rs")).unwrap(),
            "fn main() {\n    new();\n}\n"
        );
        assert!(!base.join("gone.txt").exists());
        assert_eq!(response.files_changed.len(), 3);
        assert_eq!(response.additions, 3);
        assert_eq!(response.deletions, 2);
    }

    #[test]
    fn test_fuzzy_match_ignores_trailing_whitespace() {
        let (_dir, base) = base();
        fs::write(base.join("a.txt"), "alpha   \nbeta\ngamma\n").unwrap();

        apply_patch(
            &base,
            patch("*** Update File: a.txt\n@@\n alpha\n-beta\n+BETA\n gamma"),
        )
        .unwrap();

        // Context lines are rewritten from the hunk.
        assert_eq!(
            fs::read_to_string(base.join("a.txt")).unwrap(),
            "alpha\nBETA\ngamma\n"
        );
    }

    #[test]
    fn test_move_file() {
        let (_dir, base) = base();
        fs::write(base.join("old.rs"), "a\nb\n").unwrap();

        let response = apply_patch(
            &base,
            patch("*** Update File: old.rs\n*** Move to: new/place.rs\n@@\n a\n-b\n+c"),
        )
        .unwrap();

        assert!(!base.join("old.rs").exists());
        assert_eq!(fs::read_to_string(base.join("new/place.rs")).unwrap(), "a\nc\n");
        assert_eq!(
            response.files_changed[0].moved_to.as_deref(),
            Some("new/place.rs")
        );
    }

    #[test]
    fn test_failed_hunk_writes_nothing() {
        let (_dir, base) = base();
        fs::write(base.join("keep.txt"), "one\ntwo\n").unwrap();

        let result = apply_patch(
            &base,
            patch(
                "*** Add File: created.txt\n+new\n\
                 *** Update File: keep.txt\n@@\n-three\n+four",
            ),
        );

        assert!(matches!(result, Err(ToolError::InvalidArgument(_))));
        assert!(!base.join("created.txt").exists());
        assert_eq!(fs::read_to_string(base.join("keep.txt")).unwrap(), "one\ntwo\n");
    }

    #[test]
    fn test_rejects_bad_envelope_and_escapes() {
        let (_dir, base) = base();
        assert!(matches!(
            apply_patch(
                &base,
                ApplyPatchRequest {
                    patch: "*** Add File: a.txt\n+x".to_string()
                }
            ),
            Err(ToolError::InvalidArgument(_))
        ));
        assert!(matches!(
            apply_patch(&base, patch("*** Add File: ../evil.txt\n+x")),
            Err(ToolError::PermissionDenied(_))
        ));
    }

    #[test]
    fn test_multiple_chunks_in_order() {
        let (_dir, base) = base();
        fs::write(base.join("list.txt"), "a\nb\nc\nd\ne\n").unwrap();

        apply_patch(
            &base,
            patch("*** Update File: list.txt\n@@\n-b\n+B\n@@\n-d\n+D"),
        )
        .unwrap();

        assert_eq!(
            fs::read_to_string(base.join("list.txt")).unwrap(),
            "a\nB\nc\nD\ne\n"
        );
    }
}
