use crate::error::ToolError;
use crate::filesystem::{display_path, resolve_path};
use crate::types::{GrepMatch, GrepRequest, GrepResponse};
use glob::Pattern;
use regex::RegexBuilder;
use std::fs;
use std::path::Path;
use walkdir::{DirEntry, WalkDir};

const DEFAULT_MAX_RESULTS: u32 = 100;
const MAX_RESULTS_LIMIT: u32 = 1000;
const MAX_LINE_CHARS: usize = 500;
const BINARY_SNIFF_BYTES: usize = 8192;

const SKIPPED_DIRS: &[&str] = &["target", "node_modules", "dist", "build", "__pycache__"];

pub fn grep_search(base: &Path, request: GrepRequest) -> Result<GrepResponse, ToolError> {
    let root = resolve_path(base, request.path.as_deref().unwrap_or("."))?;
    if !root.exists() {
        return Err(ToolError::NotFound(format!(
            "Search path does not exist: {}",
            request.path.as_deref().unwrap_or(".")
        )));
    }

    let regex = RegexBuilder::new(&request.pattern)
        .case_insensitive(!request.case_sensitive.unwrap_or(false))
        .build()
        .map_err(|e| ToolError::InvalidArgument(format!("Invalid regex pattern: {}", e)))?;
    let include = compile_glob(request.include_pattern.as_deref(), "include")?;
    let exclude = compile_glob(request.exclude_pattern.as_deref(), "exclude")?;

    let max_results = request
        .max_results
        .unwrap_or(DEFAULT_MAX_RESULTS)
        .clamp(1, MAX_RESULTS_LIMIT) as usize;
    let recursive = request.recursive.unwrap_or(true);

    let mut walker = WalkDir::new(&root).sort_by_file_name();
    if !recursive {
        walker = walker.max_depth(1);
    }

    let mut matches = Vec::new();
    let mut total_matches = 0;
    let mut files_searched = 0;

    let entries = walker
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_skipped(entry))
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file());

    for entry in entries {
        let relative = display_path(&root, entry.path());
        let shown = if relative == "." {
            display_path(base, entry.path())
        } else {
            relative.clone()
        };

        if let Some(include) = &include {
            if !glob_matches(include, &relative, entry.file_name()) {
                continue;
            }
        }
        if let Some(exclude) = &exclude {
            if glob_matches(exclude, &relative, entry.file_name()) {
                continue;
            }
        }

        let bytes = match fs::read(entry.path()) {
            Ok(bytes) => bytes,
            Err(_) => continue,
        };
        if bytes.iter().take(BINARY_SNIFF_BYTES).any(|b| *b == 0) {
            continue;
        }
        let content = match String::from_utf8(bytes) {
            Ok(content) => content,
            Err(_) => continue,
        };
        files_searched += 1;

        for (index, line) in content.lines().enumerate() {
            if !regex.is_match(line) {
                continue;
            }
            total_matches += 1;
            if matches.len() < max_results {
                matches.push(GrepMatch {
                    file_path: shown.clone(),
                    line_number: index + 1,
                    line_content: truncate_line(line.trim_end()),
                });
            }
        }
    }

    Ok(GrepResponse {
        pattern: request.pattern,
        truncated: total_matches > matches.len(),
        matches,
        total_matches,
        files_searched,
    })
}

fn compile_glob(pattern: Option<&str>, label: &str) -> Result<Option<Pattern>, ToolError> {
    pattern
        .map(|p| {
            Pattern::new(p).map_err(|e| {
                ToolError::InvalidArgument(format!("Invalid {} pattern '{}': {}", label, p, e))
            })
        })
        .transpose()
}

/// Globs match either the path relative to the search root or the bare file name.
fn glob_matches(pattern: &Pattern, relative: &str, file_name: &std::ffi::OsStr) -> bool {
    pattern.matches(relative) || pattern.matches(&file_name.to_string_lossy())
}

fn is_skipped(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || (entry.file_type().is_dir() && SKIPPED_DIRS.contains(&&*name))
}

fn truncate_line(line: &str) -> String {
    if line.chars().count() <= MAX_LINE_CHARS {
        return line.to_string();
    }
    let cut: String = line.chars().take(MAX_LINE_CHARS).collect();
    format!("{}...", cut)
}
