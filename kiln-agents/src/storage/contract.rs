//! Behaviour every `AgentStorage` implementation must share.

use super::{AgentStorage, StorageError};
use shared_types::{
    AgentMessage, AgentSession, AgentToolCall, MessageRole, SessionStatus, ToolCallStatus,
};
use std::sync::Arc;

macro_rules! storage_contract_tests {
    ($storage:expr) => {
        #[tokio::test]
        async fn contract_missing_session() {
            crate::storage::contract::missing_session(&$storage).await;
        }

        #[tokio::test]
        async fn contract_session_state_machine() {
            crate::storage::contract::session_state_machine(&$storage).await;
        }

        #[tokio::test]
        async fn contract_message_order() {
            crate::storage::contract::message_order(&$storage).await;
        }

        #[tokio::test]
        async fn contract_tool_call_idempotent() {
            crate::storage::contract::tool_call_idempotent(&$storage).await;
        }

        #[tokio::test]
        async fn contract_tool_call_monotonic() {
            crate::storage::contract::tool_call_monotonic(&$storage).await;
        }

        #[tokio::test]
        async fn contract_pending_tool_calls() {
            crate::storage::contract::pending_tool_calls(&$storage).await;
        }

        #[tokio::test]
        async fn contract_delete_cascades() {
            crate::storage::contract::delete_cascades(&$storage).await;
        }

        #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
        async fn contract_concurrent_sessions() {
            crate::storage::contract::concurrent_sessions(std::sync::Arc::new($storage)).await;
        }
    };
}

async fn new_session(storage: &dyn AgentStorage, prompt: &str) -> AgentSession {
    let mut session = AgentSession::new(
        "codebase-analysis",
        "anthropic",
        "claude-sonnet",
        Some("You analyze code".to_string()),
        prompt,
        serde_json::json!({}),
    );
    session.id = Some(storage.create_session(session.clone()).await.unwrap());
    session
}

fn tool_call(session_id: i64, call_id: &str, created_at: i64) -> AgentToolCall {
    let mut call = AgentToolCall::pending(
        session_id,
        None,
        call_id,
        "read_file",
        serde_json::json!({"path": "src/lib.rs"}),
    );
    call.created_at = created_at;
    call
}

pub async fn missing_session(storage: &dyn AgentStorage) {
    assert!(storage.get_session(404).await.unwrap().is_none());
    assert!(storage.get_messages(404).await.unwrap().is_empty());
    assert!(storage.get_tool_calls(404).await.unwrap().is_empty());

    assert!(matches!(
        storage
            .create_message(AgentMessage::new(404, MessageRole::User, "hello"))
            .await,
        Err(StorageError::NotFound(_))
    ));
    assert!(matches!(
        storage.create_tool_call(tool_call(404, "call_1", 0)).await,
        Err(StorageError::NotFound(_))
    ));

    let mut ghost = AgentSession::new("a", "p", "m", None, "u", serde_json::Value::Null);
    ghost.id = Some(404);
    assert!(matches!(
        storage.update_session(ghost).await,
        Err(StorageError::NotFound(_))
    ));
    assert!(matches!(
        storage.delete_session(404).await,
        Err(StorageError::NotFound(_))
    ));
}

pub async fn session_state_machine(storage: &dyn AgentStorage) {
    let mut session = new_session(storage, "Ask me things").await;
    let id = session.id.unwrap();

    session.status = SessionStatus::WaitingForUserInput;
    storage.update_session(session.clone()).await.unwrap();
    session.status = SessionStatus::Running;
    storage.update_session(session.clone()).await.unwrap();

    session.complete("All done".to_string());
    storage.update_session(session.clone()).await.unwrap();

    let mut revived = session.clone();
    revived.status = SessionStatus::Running;
    assert!(matches!(
        storage.update_session(revived).await,
        Err(StorageError::OperationFailed(_))
    ));

    let stored = storage.get_session(id).await.unwrap().unwrap();
    assert_eq!(stored.status, SessionStatus::Completed);
    assert_eq!(stored.result.as_deref(), Some("All done"));
    assert!(stored.ended_at.is_some());
    assert_eq!(stored.user_prompt, "Ask me things");

    let other = new_session(storage, "Second").await;
    let listed = storage.list_sessions().await.unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed.iter().any(|s| s.id == other.id));
}

pub async fn message_order(storage: &dyn AgentStorage) {
    let session = new_session(storage, "Order").await;
    let id = session.id.unwrap();

    let roles = [
        MessageRole::User,
        MessageRole::Assistant,
        MessageRole::Tool,
        MessageRole::Assistant,
    ];
    for (index, role) in roles.iter().enumerate() {
        let mut message = AgentMessage::new(id, *role, format!("message {}", index));
        message.created_at = 1_700_000_000;
        storage.create_message(message).await.unwrap();
        assert_eq!(storage.get_messages(id).await.unwrap().len(), index + 1);
    }

    let messages = storage.get_messages(id).await.unwrap();
    let replayed: Vec<MessageRole> = messages.iter().map(|m| m.role).collect();
    assert_eq!(replayed, roles);
    let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["message 0", "message 1", "message 2", "message 3"]);
}

pub async fn tool_call_idempotent(storage: &dyn AgentStorage) {
    let session = new_session(storage, "Tools").await;
    let id = session.id.unwrap();

    let first = storage.create_tool_call(tool_call(id, "call_1", 10)).await.unwrap();
    let mut repeat = tool_call(id, "call_1", 11);
    repeat.tool_name = "grep".to_string();
    let second = storage.create_tool_call(repeat).await.unwrap();

    assert_eq!(first, second);
    let calls = storage.get_tool_calls(id).await.unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].tool_name, "read_file");

    let other = new_session(storage, "Other").await;
    let elsewhere = storage
        .create_tool_call(tool_call(other.id.unwrap(), "call_1", 10))
        .await
        .unwrap();
    assert_ne!(elsewhere, first);
}

pub async fn tool_call_monotonic(storage: &dyn AgentStorage) {
    let session = new_session(storage, "Monotonic").await;
    let id = session.id.unwrap();

    let mut call = tool_call(id, "call_1", 10);
    call.id = Some(storage.create_tool_call(call.clone()).await.unwrap());

    call.start();
    storage.update_tool_call(call.clone()).await.unwrap();

    let mut backwards = call.clone();
    backwards.status = ToolCallStatus::Pending;
    assert!(matches!(
        storage.update_tool_call(backwards).await,
        Err(StorageError::OperationFailed(_))
    ));

    call.complete(serde_json::json!({"content": "fn main() {}"}), 12);
    storage.update_tool_call(call.clone()).await.unwrap();
    let completed = storage.get_tool_calls(id).await.unwrap().remove(0);

    let mut replay = call.clone();
    replay.response = Some(serde_json::json!({"content": "changed"}));
    storage.update_tool_call(replay).await.unwrap();

    let mut flipped = call.clone();
    flipped.fail("late failure".to_string(), 99);
    assert!(matches!(
        storage.update_tool_call(flipped).await,
        Err(StorageError::OperationFailed(_))
    ));

    let reread = storage.get_tool_calls(id).await.unwrap().remove(0);
    assert_eq!(reread, completed);
    assert_eq!(reread.status, ToolCallStatus::Completed);
    assert_eq!(reread.execution_time_ms, Some(12));
    assert_eq!(reread.response, Some(serde_json::json!({"content": "fn main() {}"})));

    let mut never_started = tool_call(id, "call_2", 20);
    never_started.id = Some(storage.create_tool_call(never_started.clone()).await.unwrap());
    never_started.fail("rejected".to_string(), 0);
    storage.update_tool_call(never_started).await.unwrap();
}

pub async fn pending_tool_calls(storage: &dyn AgentStorage) {
    let session = new_session(storage, "Pending").await;
    let id = session.id.unwrap();

    let mut done = tool_call(id, "call_done", 10);
    done.id = Some(storage.create_tool_call(done.clone()).await.unwrap());
    done.start();
    storage.update_tool_call(done.clone()).await.unwrap();
    done.complete(serde_json::json!("ok"), 1);
    storage.update_tool_call(done).await.unwrap();

    let mut running = tool_call(id, "call_running", 20);
    running.id = Some(storage.create_tool_call(running.clone()).await.unwrap());
    running.start();
    storage.update_tool_call(running).await.unwrap();

    storage
        .create_tool_call(tool_call(id, "call_waiting", 30))
        .await
        .unwrap();

    let pending = storage.get_pending_tool_calls(id).await.unwrap();
    let ids: Vec<&str> = pending.iter().map(|c| c.tool_call_id.as_str()).collect();
    assert_eq!(ids, vec!["call_running", "call_waiting"]);
    assert_eq!(pending[0].status, ToolCallStatus::Executing);
    assert_eq!(pending[1].status, ToolCallStatus::Pending);
}

pub async fn delete_cascades(storage: &dyn AgentStorage) {
    let session = new_session(storage, "Delete me").await;
    let id = session.id.unwrap();
    let keep = new_session(storage, "Keep me").await;
    let keep_id = keep.id.unwrap();

    let message_id = storage
        .create_message(AgentMessage::new(id, MessageRole::User, "hi"))
        .await
        .unwrap();
    let mut call = tool_call(id, "call_1", 10);
    call.message_id = Some(message_id);
    storage.create_tool_call(call).await.unwrap();
    storage
        .create_message(AgentMessage::new(keep_id, MessageRole::User, "still here"))
        .await
        .unwrap();

    storage.delete_session(id).await.unwrap();

    assert!(storage.get_session(id).await.unwrap().is_none());
    assert!(storage.get_messages(id).await.unwrap().is_empty());
    assert!(storage.get_tool_calls(id).await.unwrap().is_empty());
    assert_eq!(storage.get_messages(keep_id).await.unwrap().len(), 1);
}

pub async fn concurrent_sessions(storage: Arc<dyn AgentStorage>) {
    const SESSIONS: usize = 4;
    const TURNS: usize = 25;

    let mut ids = Vec::new();
    for index in 0..SESSIONS {
        let session = new_session(storage.as_ref(), &format!("Session {}", index)).await;
        ids.push(session.id.unwrap());
    }

    let mut handles = Vec::new();
    for &id in &ids {
        let storage = storage.clone();
        handles.push(tokio::spawn(async move {
            for turn in 0..TURNS {
                let message_id = storage
                    .create_message(AgentMessage::new(
                        id,
                        MessageRole::Assistant,
                        format!("{} turn {}", id, turn),
                    ))
                    .await
                    .unwrap();

                let mut call = tool_call(id, &format!("call_{}", turn), turn as i64);
                call.message_id = Some(message_id);
                call.id = Some(storage.create_tool_call(call.clone()).await.unwrap());
                call.start();
                storage.update_tool_call(call.clone()).await.unwrap();
                call.complete(serde_json::json!({"turn": turn}), 1);
                storage.update_tool_call(call).await.unwrap();

                storage
                    .create_message(AgentMessage::new(
                        id,
                        MessageRole::Tool,
                        format!("{} result {}", id, turn),
                    ))
                    .await
                    .unwrap();
                tokio::task::yield_now().await;
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    for &id in &ids {
        let messages = storage.get_messages(id).await.unwrap();
        let expected: Vec<String> = (0..TURNS)
            .flat_map(|turn| [format!("{} turn {}", id, turn), format!("{} result {}", id, turn)])
            .collect();
        let contents: Vec<String> = messages.iter().map(|m| m.content.clone()).collect();
        assert_eq!(contents, expected);
        assert!(messages.iter().all(|m| m.session_id == id));

        let calls = storage.get_tool_calls(id).await.unwrap();
        let call_ids: Vec<String> = calls.iter().map(|c| c.tool_call_id.clone()).collect();
        let expected_calls: Vec<String> = (0..TURNS).map(|turn| format!("call_{}", turn)).collect();
        assert_eq!(call_ids, expected_calls);
        assert!(calls
            .iter()
            .all(|c| c.session_id == id && c.status == ToolCallStatus::Completed));
        assert!(storage.get_pending_tool_calls(id).await.unwrap().is_empty());
    }
}
