use super::migrations::run_migrations;
use super::{missing_id, session_not_found, AgentStorage, StorageError};
use async_trait::async_trait;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row};
use shared_types::{AgentMessage, AgentSession, AgentToolCall, ParseStatusError, ToolCallStatus};
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

const SESSION_COLUMNS: &str = "id, agent_name, provider, model, system_prompt, user_prompt, config,
     status, started_at, ended_at, result, error";

const TOOL_CALL_COLUMNS: &str = "id, session_id, message_id, tool_call_id, tool_name, request,
     response, status, execution_time_ms, created_at, completed_at, error_details";

pub struct SqliteAgentStorage {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteAgentStorage {
    /// Wrap a shared connection, creating the session tables if needed.
    pub fn new(conn: Arc<Mutex<Connection>>) -> Result<Self, StorageError> {
        {
            let guard = conn
                .lock()
                .map_err(|_| StorageError::OperationFailed("Database lock poisoned".to_string()))?;
            run_migrations(&guard)?;
        }
        Ok(Self { conn })
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let conn = Connection::open(path.as_ref())?;
        Self::new(Arc::new(Mutex::new(conn)))
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::new(Arc::new(Mutex::new(Connection::open_in_memory()?)))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn
            .lock()
            .map_err(|_| StorageError::OperationFailed("Database lock poisoned".to_string()))
    }
}

fn session_exists(conn: &Connection, session_id: i64) -> Result<bool, StorageError> {
    let found = conn
        .query_row(
            "SELECT 1 FROM agent_sessions WHERE id = ?",
            [session_id],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

fn parsed<T>(row: &Row<'_>, index: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = ParseStatusError>,
{
    let raw: String = row.get(index)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(e)))
}

fn json(row: &Row<'_>, index: usize) -> rusqlite::Result<Option<serde_json::Value>> {
    let raw: Option<String> = row.get(index)?;
    raw.map(|text| serde_json::from_str(&text))
        .transpose()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(e)))
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<AgentSession> {
    Ok(AgentSession {
        id: Some(row.get(0)?),
        agent_name: row.get(1)?,
        provider: row.get(2)?,
        model: row.get(3)?,
        system_prompt: row.get(4)?,
        user_prompt: row.get(5)?,
        config: json(row, 6)?.unwrap_or(serde_json::Value::Null),
        status: parsed(row, 7)?,
        started_at: row.get(8)?,
        ended_at: row.get(9)?,
        result: row.get(10)?,
        error: row.get(11)?,
    })
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<AgentMessage> {
    Ok(AgentMessage {
        id: Some(row.get(0)?),
        session_id: row.get(1)?,
        role: parsed(row, 2)?,
        content: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn tool_call_from_row(row: &Row<'_>) -> rusqlite::Result<AgentToolCall> {
    Ok(AgentToolCall {
        id: Some(row.get(0)?),
        session_id: row.get(1)?,
        message_id: row.get(2)?,
        tool_call_id: row.get(3)?,
        tool_name: row.get(4)?,
        request: json(row, 5)?.unwrap_or(serde_json::Value::Null),
        response: json(row, 6)?,
        status: parsed(row, 7)?,
        execution_time_ms: row.get(8)?,
        created_at: row.get(9)?,
        completed_at: row.get(10)?,
        error_details: row.get(11)?,
    })
}

fn query_tool_calls(
    conn: &Connection,
    filter: &str,
    session_id: i64,
) -> Result<Vec<AgentToolCall>, StorageError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM agent_tool_calls
         WHERE session_id = ?{}
         ORDER BY created_at ASC, id ASC",
        TOOL_CALL_COLUMNS, filter
    ))?;

    let tool_calls = stmt
        .query_map([session_id], tool_call_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(tool_calls)
}

#[async_trait]
impl AgentStorage for SqliteAgentStorage {
    async fn create_session(&self, session: AgentSession) -> Result<i64, StorageError> {
        let conn = self.lock()?;
        let config = serde_json::to_string(&session.config)?;

        conn.execute(
            "INSERT INTO agent_sessions
             (agent_name, provider, model, system_prompt, user_prompt, config, status,
              started_at, ended_at, result, error)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            rusqlite::params![
                session.agent_name,
                session.provider,
                session.model,
                session.system_prompt,
                session.user_prompt,
                config,
                session.status.as_str(),
                session.started_at,
                session.ended_at,
                session.result,
                session.error,
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    async fn get_session(&self, session_id: i64) -> Result<Option<AgentSession>, StorageError> {
        let conn = self.lock()?;

        let session = conn
            .query_row(
                &format!("SELECT {} FROM agent_sessions WHERE id = ?", SESSION_COLUMNS),
                [session_id],
                session_from_row,
            )
            .optional()?;

        Ok(session)
    }

    async fn update_session(&self, session: AgentSession) -> Result<(), StorageError> {
        let id = session.id.ok_or_else(|| missing_id("session"))?;
        let conn = self.lock()?;

        let current: String = conn
            .query_row(
                "SELECT status FROM agent_sessions WHERE id = ?",
                [id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| session_not_found(id))?;
        let current: shared_types::SessionStatus = current
            .parse()
            .map_err(|e: ParseStatusError| StorageError::Other(e.to_string()))?;

        if !current.can_transition_to(session.status) {
            return Err(StorageError::OperationFailed(format!(
                "Session {} cannot move from {} to {}",
                id, current, session.status
            )));
        }

        conn.execute(
            "UPDATE agent_sessions
             SET status = ?, result = ?, error = ?, ended_at = ?
             WHERE id = ?",
            rusqlite::params![
                session.status.as_str(),
                session.result,
                session.error,
                session.ended_at,
                id,
            ],
        )?;

        Ok(())
    }

    async fn list_sessions(&self) -> Result<Vec<AgentSession>, StorageError> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM agent_sessions ORDER BY started_at DESC, id DESC",
            SESSION_COLUMNS
        ))?;

        let sessions = stmt
            .query_map([], session_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(sessions)
    }

    async fn delete_session(&self, session_id: i64) -> Result<(), StorageError> {
        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM agent_sessions WHERE id = ?", [session_id])?;
        if deleted == 0 {
            return Err(session_not_found(session_id));
        }
        Ok(())
    }

    async fn create_message(&self, message: AgentMessage) -> Result<i64, StorageError> {
        let conn = self.lock()?;
        if !session_exists(&conn, message.session_id)? {
            return Err(session_not_found(message.session_id));
        }

        conn.execute(
            "INSERT INTO agent_messages (session_id, role, content, created_at)
             VALUES (?, ?, ?, ?)",
            rusqlite::params![
                message.session_id,
                message.role.as_str(),
                message.content,
                message.created_at,
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    async fn get_messages(&self, session_id: i64) -> Result<Vec<AgentMessage>, StorageError> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            "SELECT id, session_id, role, content, created_at
             FROM agent_messages
             WHERE session_id = ?
             ORDER BY created_at ASC, id ASC",
        )?;

        let messages = stmt
            .query_map([session_id], message_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(messages)
    }

    async fn create_tool_call(&self, tool_call: AgentToolCall) -> Result<i64, StorageError> {
        let conn = self.lock()?;
        if !session_exists(&conn, tool_call.session_id)? {
            return Err(session_not_found(tool_call.session_id));
        }

        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM agent_tool_calls WHERE session_id = ? AND tool_call_id = ?",
                rusqlite::params![tool_call.session_id, tool_call.tool_call_id],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(id) = existing {
            return Ok(id);
        }

        let request = serde_json::to_string(&tool_call.request)?;
        let response = tool_call
            .response
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        conn.execute(
            "INSERT INTO agent_tool_calls
             (session_id, message_id, tool_call_id, tool_name, request, response, status,
              execution_time_ms, created_at, completed_at, error_details)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            rusqlite::params![
                tool_call.session_id,
                tool_call.message_id,
                tool_call.tool_call_id,
                tool_call.tool_name,
                request,
                response,
                tool_call.status.as_str(),
                tool_call.execution_time_ms,
                tool_call.created_at,
                tool_call.completed_at,
                tool_call.error_details,
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    async fn update_tool_call(&self, tool_call: AgentToolCall) -> Result<(), StorageError> {
        let id = tool_call.id.ok_or_else(|| missing_id("tool call"))?;
        let conn = self.lock()?;

        let current: String = conn
            .query_row(
                "SELECT status FROM agent_tool_calls WHERE id = ?",
                [id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| StorageError::NotFound(format!("Tool call {} not found", id)))?;
        let current: ToolCallStatus = current
            .parse()
            .map_err(|e: ParseStatusError| StorageError::Other(e.to_string()))?;

        if current.is_terminal() && current == tool_call.status {
            return Ok(());
        }
        if !current.can_transition_to(tool_call.status) {
            return Err(StorageError::OperationFailed(format!(
                "Tool call {} cannot move from {} to {}",
                id, current, tool_call.status
            )));
        }

        let response = tool_call
            .response
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        conn.execute(
            "UPDATE agent_tool_calls
             SET response = ?, status = ?, execution_time_ms = ?, completed_at = ?, error_details = ?
             WHERE id = ?",
            rusqlite::params![
                response,
                tool_call.status.as_str(),
                tool_call.execution_time_ms,
                tool_call.completed_at,
                tool_call.error_details,
                id,
            ],
        )?;

        Ok(())
    }

    async fn get_tool_calls(&self, session_id: i64) -> Result<Vec<AgentToolCall>, StorageError> {
        let conn = self.lock()?;
        query_tool_calls(&conn, "", session_id)
    }

    async fn get_pending_tool_calls(
        &self,
        session_id: i64,
    ) -> Result<Vec<AgentToolCall>, StorageError> {
        let conn = self.lock()?;
        query_tool_calls(&conn, " AND status IN ('pending', 'executing')", session_id)
    }
}
