use crate::error::AgentError;
use crate::profile::{AgentProfile, ProfileOverrides};
use crate::runtime::Runtime;
use crate::storage::AgentStorage;
use crate::tools::AgentTool;
use crate::Agent;
use kiln_llm::LlmClient;
use kiln_tools::sqlite_reader::{get_table_names, validate_db_path};
use kiln_tools::{ToolError, ToolExecutor};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const AGENT_NAME: &str = "sqlite-reader";

/// Answers questions about one SQLite database through read-only queries.
///
/// Construction is two-phase: the database path is validated and its tables are
/// listed before the system prompt is written, so a bad path fails before any
/// session exists.
pub struct SqliteReaderAgent {
    profile: AgentProfile,
    runtime: Runtime,
    db_path: PathBuf,
}

impl SqliteReaderAgent {
    pub async fn new(
        client: Arc<dyn LlmClient>,
        storage: Arc<dyn AgentStorage>,
        db_path: impl Into<PathBuf>,
    ) -> Result<Self, AgentError> {
        let db_path = db_path.into();
        check_db_path(&db_path)?;

        let tables = {
            let db_path = db_path.clone();
            tokio::task::spawn_blocking(move || get_table_names(&db_path))
                .await
                .map_err(ToolError::from)??
        };
        tracing::info!(db_path = %db_path.display(), tables = tables.len(), "Discovered database tables");

        let db_name = db_path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| "database".to_string());

        let base_path = db_path.parent().unwrap_or(Path::new("/")).to_path_buf();
        let tool_executor = ToolExecutor::builder()
            .base_path(base_path)
            .database_path(&db_path)
            .build();

        let profile = AgentProfile::new(
            AGENT_NAME,
            "Analyze SQLite database structure and contents",
            system_prompt(&db_name, &tables),
            vec![AgentTool::Sqlite3Reader],
        )
        .with_config(serde_json::json!({
            "db_path": db_path.display().to_string(),
            "tables": tables,
        }));

        Ok(Self {
            profile,
            runtime: Runtime::new(client, storage, Arc::new(tool_executor)),
            db_path,
        })
    }

    pub fn with_overrides(mut self, overrides: ProfileOverrides) -> Self {
        self.runtime = self.runtime.with_overrides(overrides);
        self
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

impl Agent for SqliteReaderAgent {
    fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    fn runtime(&self) -> &Runtime {
        &self.runtime
    }
}

fn check_db_path(db_path: &Path) -> Result<(), ToolError> {
    if db_path.as_os_str().is_empty() {
        return Err(ToolError::InvalidArgument(
            "Database path cannot be empty".to_string(),
        ));
    }
    if !db_path.is_absolute() {
        return Err(ToolError::InvalidArgument(format!(
            "Database path must be absolute: {}",
            db_path.display()
        )));
    }
    validate_db_path(db_path)
}

fn system_prompt(db_name: &str, tables: &[String]) -> String {
    let tables_list = if tables.is_empty() {
        "No tables found".to_string()
    } else {
        tables.join(", ")
    };

    format!(
        "You are a database analysis expert specialized in SQLite databases.
Your role is to query data and provide insights about database contents.
You have access to the sqlite3_reader tool to run SQL against the database.

Use mode \"query\" with SELECT statements to retrieve data, and PRAGMA statements to inspect
the schema. Use mode \"reflect\" with one of the targets tables, schema, table_info, indexes,
views, foreign_keys or stats to explore the structure without writing SQL.

You can ONLY use SELECT and PRAGMA statements. Do NOT use CREATE, INSERT, UPDATE, DELETE,
ALTER, DROP, or any other statement that modifies data.

Do not summarize the data unless explicitly asked. Just list the results.

The database path is already configured.
You are analyzing the database named: {}
Tables in the database: {}
",
        db_name, tables_list
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStorage;
    use crate::testing::{text_response, tool_response, ScriptedClient};
    use kiln_llm::ToolCall;
    use rusqlite::Connection;
    use shared_types::ToolCallStatus;
    use tempfile::TempDir;

    fn database(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("shop.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE customers (id INTEGER PRIMARY KEY, name TEXT);
             CREATE TABLE orders (id INTEGER PRIMARY KEY, customer_id INTEGER, total REAL);
             INSERT INTO customers (name) VALUES ('Ada'), ('Grace');",
        )
        .unwrap();
        path
    }

    #[tokio::test]
    async fn test_prompt_lists_tables() {
        let dir = TempDir::new().unwrap();
        let path = database(&dir);
        let agent = SqliteReaderAgent::new(
            Arc::new(ScriptedClient::new(vec![])),
            Arc::new(InMemoryStorage::new()),
            &path,
        )
        .await
        .unwrap();

        assert!(agent.system_prompt().contains("database named: shop.db"));
        assert!(agent
            .system_prompt()
            .contains("Tables in the database: customers, orders"));
        assert_eq!(agent.tools(), &[AgentTool::Sqlite3Reader]);
        assert_eq!(agent.db_path(), path.as_path());
    }

    #[tokio::test]
    async fn test_missing_database_fails_before_any_session() {
        let storage = Arc::new(InMemoryStorage::new());
        let result = SqliteReaderAgent::new(
            Arc::new(ScriptedClient::new(vec![])),
            storage.clone(),
            "/definitely/not/here.db",
        )
        .await;

        assert!(matches!(
            result,
            Err(AgentError::Validation(ToolError::NotFound(_)))
        ));
        assert!(storage.list_sessions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_relative_and_empty_paths_rejected() {
        for path in ["", "shop.db"] {
            let result = SqliteReaderAgent::new(
                Arc::new(ScriptedClient::new(vec![])),
                Arc::new(InMemoryStorage::new()),
                path,
            )
            .await;
            assert!(matches!(
                result,
                Err(AgentError::Validation(ToolError::InvalidArgument(_)))
            ));
        }
    }

    #[tokio::test]
    async fn test_write_attempt_is_denied_and_leaves_data_alone() {
        let dir = TempDir::new().unwrap();
        let path = database(&dir);
        let client = Arc::new(ScriptedClient::new(vec![
            tool_response(
                "",
                vec![ToolCall::new(
                    "call_1",
                    "sqlite3_reader",
                    serde_json::json!({"mode": {"mode": "query", "query": "DELETE FROM customers"}}),
                )],
            ),
            tool_response(
                "",
                vec![ToolCall::new(
                    "call_2",
                    "sqlite3_reader",
                    serde_json::json!({"mode": {"mode": "query", "query": "SELECT COUNT(*) AS n FROM customers"}}),
                )],
            ),
            text_response("There are 2 customers"),
        ]));
        let storage = Arc::new(InMemoryStorage::new());
        let agent = SqliteReaderAgent::new(client, storage.clone(), &path)
            .await
            .unwrap();

        let result = agent.execute("How many customers?").await.unwrap();
        assert_eq!(result, "There are 2 customers");

        let calls = storage.get_tool_calls(1).await.unwrap();
        assert_eq!(calls[0].status, ToolCallStatus::Failed);
        assert!(calls[0]
            .error_details
            .as_deref()
            .unwrap_or_default()
            .starts_with("Permission denied"));
        assert_eq!(calls[1].status, ToolCallStatus::Completed);

        let count: i64 = Connection::open(&path)
            .unwrap()
            .query_row("SELECT COUNT(*) FROM customers", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 2);
    }
}
