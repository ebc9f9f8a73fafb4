use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SqliteMode {
    /// Run a SELECT query or a read-only PRAGMA
    Query {
        /// SQL to execute. Only SELECT queries and PRAGMA statements are allowed
        query: String,
    },
    /// Inspect the schema without writing SQL
    Reflect {
        /// One of: tables, schema, table_info, indexes, views, foreign_keys, stats
        target: String,
        /// Table to inspect, required for table_info and foreign_keys
        #[serde(default, skip_serializing_if = "Option::is_none")]
        table_name: Option<String>,
    },
}

/// Read-only access to the agent's SQLite database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Sqlite3ReaderRequest {
    /// Either a query or a schema reflection
    pub mode: SqliteMode,
    /// Maximum number of rows to return (default 100, maximum 1000)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sqlite3ReaderResponse {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
    pub row_count: usize,
    pub truncated: bool,
    pub execution_time_ms: u64,
    pub formatted_output: String,
}
