//! Read-only SQLite access.
//!
//! Statements pass three gates: a parse with `sqlparser` that only admits a single SELECT
//! (including `WITH ... SELECT`) or a PRAGMA without assignment, a connection opened with
//! `SQLITE_OPEN_READ_ONLY`, and SQLite's own `sqlite3_stmt_readonly` check.

mod executor;
pub mod formatter;

pub use executor::{QueryResult, SqlExecutor};

use crate::error::ToolError;
use crate::types::{Sqlite3ReaderRequest, Sqlite3ReaderResponse, SqliteMode};
use sqlparser::ast::{SetExpr, Statement};
use sqlparser::dialect::SQLiteDialect;
use sqlparser::parser::Parser;
use std::path::Path;

pub const DEFAULT_LIMIT: usize = 100;
pub const MAX_LIMIT: usize = 1000;
pub const BUSY_TIMEOUT_MS: u64 = 5000;

pub fn execute_sqlite3_reader(
    db_path: &Path,
    request: Sqlite3ReaderRequest,
) -> Result<Sqlite3ReaderResponse, ToolError> {
    validate_db_path(db_path)?;
    let limit = request.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    let (query, target) = match request.mode {
        SqliteMode::Query { query } => {
            validate_query(&query)?;
            (query, None)
        }
        SqliteMode::Reflect { target, table_name } => {
            (build_reflection_query(&target, table_name.as_deref())?, Some(target))
        }
    };

    let executor = SqlExecutor::open(db_path, BUSY_TIMEOUT_MS)?;
    let result = executor.execute(&query, limit)?;

    let formatted_output = match target {
        Some(target) => format!(
            "Schema Reflection ({}):\n{}",
            target,
            formatter::format_query_result(&result)
        ),
        None => formatter::format_query_result(&result),
    };

    Ok(Sqlite3ReaderResponse {
        columns: result.columns,
        rows: result.rows,
        row_count: result.row_count,
        truncated: result.truncated,
        execution_time_ms: result.execution_time_ms,
        formatted_output,
    })
}

/// Names of the user tables in the database, sorted.
pub fn get_table_names(db_path: &Path) -> Result<Vec<String>, ToolError> {
    validate_db_path(db_path)?;
    let executor = SqlExecutor::open(db_path, BUSY_TIMEOUT_MS)?;
    let result = executor.execute(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        usize::MAX,
    )?;

    Ok(result
        .rows
        .into_iter()
        .filter_map(|row| match row.into_iter().next() {
            Some(serde_json::Value::String(name)) => Some(name),
            _ => None,
        })
        .collect())
}

pub fn validate_db_path(db_path: &Path) -> Result<(), ToolError> {
    if db_path.as_os_str().is_empty() {
        return Err(ToolError::InvalidArgument(
            "Database path cannot be empty".to_string(),
        ));
    }
    if !db_path.exists() {
        return Err(ToolError::NotFound(format!(
            "Database file not found: {}",
            db_path.display()
        )));
    }
    if !db_path.is_file() {
        return Err(ToolError::InvalidArgument(format!(
            "Path is not a file: {}",
            db_path.display()
        )));
    }
    Ok(())
}

/// Admit a single SELECT or a PRAGMA without assignment.
pub fn validate_query(query: &str) -> Result<(), ToolError> {
    let trimmed = query.trim().trim_end_matches(';').trim();
    if trimmed.is_empty() {
        return Err(ToolError::InvalidArgument("Query cannot be empty".to_string()));
    }

    let is_pragma = trimmed
        .get(..6)
        .is_some_and(|head| head.eq_ignore_ascii_case("pragma"));
    if is_pragma {
        if trimmed.contains(';') {
            return Err(ToolError::PermissionDenied(
                "Only a single statement is allowed".to_string(),
            ));
        }
        if trimmed.contains('=') {
            return Err(ToolError::PermissionDenied(
                "PRAGMA assignments are not allowed".to_string(),
            ));
        }
        return Ok(());
    }

    let statements = Parser::parse_sql(&SQLiteDialect {}, trimmed)
        .map_err(|e| ToolError::InvalidArgument(format!("Failed to parse SQL: {}", e)))?;

    match statements.as_slice() {
        [Statement::Query(query)] => match query.body.as_ref() {
            SetExpr::Select(_)
            | SetExpr::Query(_)
            | SetExpr::SetOperation { .. }
            | SetExpr::Values(_) => Ok(()),
            _ => Err(ToolError::PermissionDenied(
                "Only SELECT queries and read-only PRAGMA statements are allowed".to_string(),
            )),
        },
        [] => Err(ToolError::InvalidArgument("Query cannot be empty".to_string())),
        [_] => Err(ToolError::PermissionDenied(
            "Only SELECT queries and read-only PRAGMA statements are allowed".to_string(),
        )),
        _ => Err(ToolError::PermissionDenied(
            "Only a single statement is allowed".to_string(),
        )),
    }
}

fn build_reflection_query(target: &str, table_name: Option<&str>) -> Result<String, ToolError> {
    let required_table = |label: &str| {
        table_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| name.replace('\'', "''"))
            .ok_or_else(|| {
                ToolError::InvalidArgument(format!(
                    "table_name is required for {} reflection",
                    label
                ))
            })
    };

    let query = match target.trim().to_lowercase().as_str() {
        "tables" => "SELECT name, sql FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name".to_string(),
        "schema" => "SELECT type, name, sql FROM sqlite_master WHERE sql IS NOT NULL ORDER BY type, name".to_string(),
        "table_info" => format!("SELECT * FROM pragma_table_info('{}')", required_table("table_info")?),
        "indexes" => "SELECT name, tbl_name, sql FROM sqlite_master WHERE type='index' AND name NOT LIKE 'sqlite_%' ORDER BY tbl_name, name".to_string(),
        "views" => "SELECT name, sql FROM sqlite_master WHERE type='view' ORDER BY name".to_string(),
        "foreign_keys" => format!("SELECT * FROM pragma_foreign_key_list('{}')", required_table("foreign_keys")?),
        "stats" => "SELECT name, file FROM pragma_database_list UNION ALL SELECT 'Total Tables' AS name, CAST(COUNT(*) AS TEXT) AS file FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'".to_string(),
        other => {
            return Err(ToolError::InvalidArgument(format!(
                "Unknown reflection target: {}. Valid targets: tables, schema, table_info, indexes, views, foreign_keys, stats",
                other
            )))
        }
    };
    Ok(query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;
    use tempfile::NamedTempFile;

    fn database() -> NamedTempFile {
        let file = NamedTempFile::new().unwrap();
        let conn = Connection::open(file.path()).unwrap();
        conn.execute_batch(
            "CREATE TABLE authors (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
             CREATE TABLE posts (id INTEGER PRIMARY KEY, author_id INTEGER REFERENCES authors(id), title TEXT);
             CREATE INDEX idx_posts_author ON posts(author_id);
             INSERT INTO authors (name) VALUES ('Ada'), ('Grace');
             INSERT INTO posts (author_id, title) VALUES (1, 'Notes'), (2, 'Compilers');",
        )
        .unwrap();
        file
    }

    fn query(sql: &str) -> Sqlite3ReaderRequest {
        Sqlite3ReaderRequest {
            mode: SqliteMode::Query {
                query: sql.to_string(),
            },
            limit: None,
        }
    }

    fn reflect(target: &str, table_name: Option<&str>) -> Sqlite3ReaderRequest {
        Sqlite3ReaderRequest {
            mode: SqliteMode::Reflect {
                target: target.to_string(),
                table_name: table_name.map(str::to_string),
            },
            limit: None,
        }
    }

    #[test]
    fn test_query_mode() {
        let file = database();
        let response =
            execute_sqlite3_reader(file.path(), query("SELECT name FROM authors ORDER BY id")).unwrap();

        assert_eq!(response.columns, vec!["name"]);
        assert_eq!(response.rows[1][0], serde_json::json!("Grace"));
        assert!(response.formatted_output.contains("Returned 2 rows"));
    }

    #[test]
    fn test_cte_select_allowed() {
        let file = database();
        let response = execute_sqlite3_reader(
            file.path(),
            query("WITH named AS (SELECT name FROM authors) SELECT COUNT(*) AS n FROM named"),
        )
        .unwrap();
        assert_eq!(response.rows[0][0], serde_json::json!(2));
    }

    #[test]
    fn test_mutations_denied_without_side_effects() {
        let file = database();
        for sql in [
            "DELETE FROM authors",
            "UPDATE authors SET name = 'x'",
            "DROP TABLE posts",
            "SELECT 1; DELETE FROM authors",
            "PRAGMA user_version = 5",
        ] {
            let result = execute_sqlite3_reader(file.path(), query(sql));
            assert!(
                matches!(result, Err(ToolError::PermissionDenied(_))),
                "{} should be denied",
                sql
            );
        }

        let names = get_table_names(file.path()).unwrap();
        assert_eq!(names, vec!["authors", "posts"]);
        let count: i64 = Connection::open(file.path())
            .unwrap()
            .query_row("SELECT COUNT(*) FROM authors", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_reflect_targets() {
        let file = database();

        let tables = execute_sqlite3_reader(file.path(), reflect("tables", None)).unwrap();
        assert_eq!(tables.row_count, 2);
        assert!(tables.formatted_output.starts_with("Schema Reflection (tables):"));

        let info = execute_sqlite3_reader(file.path(), reflect("table_info", Some("posts"))).unwrap();
        assert_eq!(info.row_count, 3);
        assert!(info.columns.contains(&"name".to_string()));

        let fks = execute_sqlite3_reader(file.path(), reflect("foreign_keys", Some("posts"))).unwrap();
        assert_eq!(fks.row_count, 1);

        let indexes = execute_sqlite3_reader(file.path(), reflect("indexes", None)).unwrap();
        assert_eq!(indexes.rows[0][0], serde_json::json!("idx_posts_author"));

        assert!(matches!(
            execute_sqlite3_reader(file.path(), reflect("table_info", None)),
            Err(ToolError::InvalidArgument(_))
        ));
        assert!(matches!(
            execute_sqlite3_reader(file.path(), reflect("triggers", None)),
            Err(ToolError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_quoted_table_name_cannot_break_out() {
        let file = database();
        let response =
            execute_sqlite3_reader(file.path(), reflect("table_info", Some("posts'); DROP TABLE posts; --")))
                .unwrap();
        assert_eq!(response.row_count, 0);
        assert_eq!(get_table_names(file.path()).unwrap().len(), 2);
    }

    #[test]
    fn test_limit_is_clamped() {
        let file = database();
        let mut request = query("SELECT * FROM authors");
        request.limit = Some(1);
        let response = execute_sqlite3_reader(file.path(), request).unwrap();
        assert_eq!(response.row_count, 1);
        assert!(response.truncated);
    }

    #[test]
    fn test_missing_database() {
        let result = execute_sqlite3_reader(Path::new("/definitely/not/here.db"), query("SELECT 1"));
        assert!(matches!(result, Err(ToolError::NotFound(_))));
    }
}
