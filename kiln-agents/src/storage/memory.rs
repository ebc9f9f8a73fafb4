use super::{missing_id, session_not_found, AgentStorage, StorageError};
use async_trait::async_trait;
use shared_types::{AgentMessage, AgentSession, AgentToolCall};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct Tables {
    sessions: BTreeMap<i64, AgentSession>,
    messages: Vec<AgentMessage>,
    tool_calls: Vec<AgentToolCall>,
    next_session_id: i64,
    next_message_id: i64,
    next_tool_call_id: i64,
}

impl Tables {
    fn require_session(&self, session_id: i64) -> Result<(), StorageError> {
        if self.sessions.contains_key(&session_id) {
            Ok(())
        } else {
            Err(session_not_found(session_id))
        }
    }
}

/// Process-local storage for tests and throwaway runs.
#[derive(Default)]
pub struct InMemoryStorage {
    tables: Mutex<Tables>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StorageError> {
        self.tables
            .lock()
            .map_err(|_| StorageError::OperationFailed("Storage lock poisoned".to_string()))
    }
}

fn sorted<T: Clone>(items: impl Iterator<Item = T>, key: impl Fn(&T) -> (i64, i64)) -> Vec<T> {
    let mut items: Vec<T> = items.collect();
    items.sort_by_key(|item| key(item));
    items
}

fn tool_call_key(call: &AgentToolCall) -> (i64, i64) {
    (call.created_at, call.id.unwrap_or_default())
}

#[async_trait]
impl AgentStorage for InMemoryStorage {
    async fn create_session(&self, mut session: AgentSession) -> Result<i64, StorageError> {
        let mut tables = self.lock()?;
        tables.next_session_id += 1;
        let id = tables.next_session_id;
        session.id = Some(id);
        tables.sessions.insert(id, session);
        Ok(id)
    }

    async fn get_session(&self, session_id: i64) -> Result<Option<AgentSession>, StorageError> {
        Ok(self.lock()?.sessions.get(&session_id).cloned())
    }

    async fn update_session(&self, session: AgentSession) -> Result<(), StorageError> {
        let id = session.id.ok_or_else(|| missing_id("session"))?;
        let mut tables = self.lock()?;
        let stored = tables
            .sessions
            .get_mut(&id)
            .ok_or_else(|| session_not_found(id))?;

        if !stored.status.can_transition_to(session.status) {
            return Err(StorageError::OperationFailed(format!(
                "Session {} cannot move from {} to {}",
                id, stored.status, session.status
            )));
        }

        stored.status = session.status;
        stored.result = session.result;
        stored.error = session.error;
        stored.ended_at = session.ended_at;
        Ok(())
    }

    async fn list_sessions(&self) -> Result<Vec<AgentSession>, StorageError> {
        let tables = self.lock()?;
        let mut sessions: Vec<AgentSession> = tables.sessions.values().cloned().collect();
        sessions.sort_by_key(|s| std::cmp::Reverse((s.started_at, s.id.unwrap_or_default())));
        Ok(sessions)
    }

    async fn delete_session(&self, session_id: i64) -> Result<(), StorageError> {
        let mut tables = self.lock()?;
        if tables.sessions.remove(&session_id).is_none() {
            return Err(session_not_found(session_id));
        }
        tables.messages.retain(|m| m.session_id != session_id);
        tables.tool_calls.retain(|c| c.session_id != session_id);
        Ok(())
    }

    async fn create_message(&self, mut message: AgentMessage) -> Result<i64, StorageError> {
        let mut tables = self.lock()?;
        tables.require_session(message.session_id)?;
        tables.next_message_id += 1;
        let id = tables.next_message_id;
        message.id = Some(id);
        tables.messages.push(message);
        Ok(id)
    }

    async fn get_messages(&self, session_id: i64) -> Result<Vec<AgentMessage>, StorageError> {
        let tables = self.lock()?;
        Ok(sorted(
            tables
                .messages
                .iter()
                .filter(|m| m.session_id == session_id)
                .cloned(),
            |m| (m.created_at, m.id.unwrap_or_default()),
        ))
    }

    async fn create_tool_call(&self, mut tool_call: AgentToolCall) -> Result<i64, StorageError> {
        let mut tables = self.lock()?;
        tables.require_session(tool_call.session_id)?;

        if let Some(existing) = tables.tool_calls.iter().find(|c| {
            c.session_id == tool_call.session_id && c.tool_call_id == tool_call.tool_call_id
        }) {
            return existing.id.ok_or_else(|| missing_id("tool call"));
        }

        tables.next_tool_call_id += 1;
        let id = tables.next_tool_call_id;
        tool_call.id = Some(id);
        tables.tool_calls.push(tool_call);
        Ok(id)
    }

    async fn update_tool_call(&self, tool_call: AgentToolCall) -> Result<(), StorageError> {
        let id = tool_call.id.ok_or_else(|| missing_id("tool call"))?;
        let mut tables = self.lock()?;
        let stored = tables
            .tool_calls
            .iter_mut()
            .find(|c| c.id == Some(id))
            .ok_or_else(|| StorageError::NotFound(format!("Tool call {} not found", id)))?;

        if stored.status.is_terminal() && stored.status == tool_call.status {
            return Ok(());
        }
        if !stored.status.can_transition_to(tool_call.status) {
            return Err(StorageError::OperationFailed(format!(
                "Tool call {} cannot move from {} to {}",
                id, stored.status, tool_call.status
            )));
        }

        stored.status = tool_call.status;
        stored.response = tool_call.response;
        stored.execution_time_ms = tool_call.execution_time_ms;
        stored.completed_at = tool_call.completed_at;
        stored.error_details = tool_call.error_details;
        Ok(())
    }

    async fn get_tool_calls(&self, session_id: i64) -> Result<Vec<AgentToolCall>, StorageError> {
        let tables = self.lock()?;
        Ok(sorted(
            tables
                .tool_calls
                .iter()
                .filter(|c| c.session_id == session_id)
                .cloned(),
            tool_call_key,
        ))
    }

    async fn get_pending_tool_calls(
        &self,
        session_id: i64,
    ) -> Result<Vec<AgentToolCall>, StorageError> {
        let tables = self.lock()?;
        Ok(sorted(
            tables
                .tool_calls
                .iter()
                .filter(|c| c.session_id == session_id && !c.status.is_terminal())
                .cloned(),
            tool_call_key,
        ))
    }
}
