use shared_types::*;
use std::fs;
use std::path::PathBuf;
use ts_rs::TS;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut types = Vec::new();

    // Session types
    types.push(clean_type(SessionStatus::export_to_string()?));
    types.push(clean_type(MessageRole::export_to_string()?));
    types.push(clean_type(ToolCallStatus::export_to_string()?));
    types.push(clean_type(SessionMessage::export_to_string()?));
    types.push(clean_type(SessionToolCall::export_to_string()?));
    types.push(clean_type(SessionResponse::export_to_string()?));
    types.push(clean_type(SessionListItem::export_to_string()?));
    types.push(clean_type(SessionListResponse::export_to_string()?));

    // User interaction types
    types.push(clean_type(QuestionType::export_to_string()?));
    types.push(clean_type(UserQuestion::export_to_string()?));
    types.push(clean_type(AskUserRequest::export_to_string()?));
    types.push(clean_type(UserQuestionResponse::export_to_string()?));
    types.push(clean_type(AskUserResponse::export_to_string()?));

    let output_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("bindings/types.ts"));
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(&output_path, types.join("\n\n"))?;
    println!("Generated TypeScript types in {}", output_path.display());

    Ok(())
}

/// Types are concatenated into one file, so per-type imports and banners are dropped.
fn clean_type(mut type_def: String) -> String {
    type_def.retain(|c| c != '\r');

    let result = type_def
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.starts_with("import type")
                && !trimmed.starts_with("// This file was generated")
                && !trimmed.starts_with("/* This file was generated")
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string();

    if result.is_empty() {
        result
    } else {
        format!("{}\n", result)
    }
}
