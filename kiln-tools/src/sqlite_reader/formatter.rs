use super::executor::QueryResult;

const MAX_DISPLAY_ROWS: usize = 20;
const MAX_CELL_CHARS: usize = 50;

/// Render rows as an aligned text table for the model.
pub fn format_query_result(result: &QueryResult) -> String {
    if result.row_count == 0 {
        return "Query executed successfully but returned no rows.".to_string();
    }

    let mut output = format!("Query executed successfully. Returned {} rows", result.row_count);
    if result.truncated {
        output.push_str(&format!(" (results truncated to {} rows)", result.row_count));
    }
    output.push_str(&format!(".\nExecution time: {}ms\n\n", result.execution_time_ms));

    let shown: Vec<Vec<String>> = result
        .rows
        .iter()
        .take(MAX_DISPLAY_ROWS)
        .map(|row| row.iter().map(format_cell).collect())
        .collect();

    let mut widths: Vec<usize> = result.columns.iter().map(|c| c.chars().count()).collect();
    for row in &shown {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let header: Vec<String> = result
        .columns
        .iter()
        .zip(&widths)
        .map(|(column, width)| pad(column, *width))
        .collect();
    output.push_str(header.join(" | ").trim_end());
    output.push('\n');

    let separator: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
    output.push_str(&separator.join("-+-"));
    output.push('\n');

    for row in &shown {
        let cells: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, width)| pad(cell, *width))
            .collect();
        output.push_str(cells.join(" | ").trim_end());
        output.push('\n');
    }

    if result.row_count > MAX_DISPLAY_ROWS {
        output.push_str(&format!(
            "\n... and {} more rows",
            result.row_count - MAX_DISPLAY_ROWS
        ));
    }

    output
}

fn format_cell(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "NULL".to_string(),
        serde_json::Value::String(s) if s.chars().count() > MAX_CELL_CHARS => {
            let cut: String = s.chars().take(MAX_CELL_CHARS - 3).collect();
            format!("{}...", cut)
        }
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn pad(text: &str, width: usize) -> String {
    let len = text.chars().count();
    format!("{}{}", text, " ".repeat(width.saturating_sub(len)))
}
