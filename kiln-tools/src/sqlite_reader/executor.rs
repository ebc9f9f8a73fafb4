use crate::error::ToolError;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
    pub row_count: usize,
    pub truncated: bool,
    pub execution_time_ms: u64,
}

/// A read-only connection. One is opened per tool call and dropped afterwards.
pub struct SqlExecutor {
    conn: Connection,
}

impl SqlExecutor {
    pub fn open(db_path: &Path, timeout_ms: u64) -> Result<Self, ToolError> {
        let conn = Connection::open_with_flags(
            db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| ToolError::Other(format!("Failed to open database: {}", e)))?;
        conn.busy_timeout(Duration::from_millis(timeout_ms))?;
        Ok(Self { conn })
    }

    /// Run one statement and collect at most `limit` rows.
    pub fn execute(&self, query: &str, limit: usize) -> Result<QueryResult, ToolError> {
        let started = Instant::now();
        let mut stmt = self
            .conn
            .prepare(query)
            .map_err(|e| ToolError::InvalidArgument(format!("Failed to prepare query: {}", e)))?;

        if !stmt.readonly() {
            return Err(ToolError::PermissionDenied(
                "Statement would modify the database".to_string(),
            ));
        }

        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let column_count = columns.len();

        let mut rows = Vec::new();
        let mut truncated = false;
        let mut cursor = stmt.query([])?;
        while let Some(row) = cursor.next()? {
            if rows.len() >= limit {
                truncated = true;
                break;
            }
            let mut values = Vec::with_capacity(column_count);
            for index in 0..column_count {
                values.push(to_json(row.get_ref(index)?));
            }
            rows.push(values);
        }

        Ok(QueryResult {
            columns,
            row_count: rows.len(),
            rows,
            truncated,
            execution_time_ms: started.elapsed().as_millis() as u64,
        })
    }
}

fn to_json(value: ValueRef<'_>) -> serde_json::Value {
    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => serde_json::Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Text(bytes) => serde_json::Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => serde_json::Value::String(format!("<BLOB {} bytes>", bytes.len())),
    }
}
