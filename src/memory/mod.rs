//! Conversation memory.
//!
//! Sessions live in a bounded in-process cache: at most `max_sessions` entries,
//! evicted after `idle_timeout_secs` without access. Nothing is persisted.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{common::MemCache, config::MemoryConfig, llm::Message};

/// One conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
}

impl Session {
    fn new(id: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            messages: vec![],
            created_at: now,
            last_accessed_at: now,
        }
    }
}

/// Listing entry for a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: String,
    pub message_count: usize,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct ConversationStore {
    sessions: Arc<MemCache<String, Session>>,
}

impl ConversationStore {
    pub fn new(config: &MemoryConfig) -> Self {
        Self {
            sessions: Arc::new(MemCache::with_idle_timeout(config.max_sessions, Duration::from_secs(config.idle_timeout_secs))),
        }
    }

    /// Create an empty session with a fresh id.
    pub fn create(&self) -> Session {
        let session = Session::new(uuid::Uuid::new_v4().to_string());
        self.sessions.set(session.id.clone(), session.clone());
        session
    }

    /// Get a session, marking it as accessed.
    pub fn get(
        &self,
        id: &str,
    ) -> Option<Session> {
        self.sessions.update(id.to_string(), |mut session| {
            session.last_accessed_at = Utc::now();
            session
        })
    }

    /// Messages of a session; empty when the session is unknown or expired.
    pub fn history(
        &self,
        id: &str,
    ) -> Vec<Message> {
        self.get(id).map(|s| s.messages).unwrap_or_default()
    }

    /// Append messages to a session, creating it under `id` when missing.
    pub fn append(
        &self,
        id: &str,
        messages: impl IntoIterator<Item = Message>,
    ) {
        self.sessions.upsert(id.to_string(), |session| {
            let mut session = session.unwrap_or_else(|| Session::new(id.to_string()));
            session.messages.extend(messages);
            session.last_accessed_at = Utc::now();
            session
        });
    }

    /// Sessions ordered by most recent access first.
    pub fn list(&self) -> Vec<SessionSummary> {
        self.sessions.sync();
        let mut sessions: Vec<SessionSummary> = self
            .sessions
            .iter()
            .map(|(_, s)| SessionSummary {
                id: s.id.clone(),
                message_count: s.messages.len(),
                created_at: s.created_at,
                last_accessed_at: s.last_accessed_at,
            })
            .collect();
        sessions.sort_by(|a, b| b.last_accessed_at.cmp(&a.last_accessed_at));
        sessions
    }

    /// Delete a session. Returns whether it existed.
    pub fn delete(
        &self,
        id: &str,
    ) -> bool {
        self.sessions.remove(&id.to_string()).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> ConversationStore {
        ConversationStore::new(&MemoryConfig::default())
    }

    #[test]
    fn test_create_and_append() {
        let store = store();
        let session = store.create();
        assert!(store.history(&session.id).is_empty());

        store.append(&session.id, [Message::user("hi"), Message::assistant("hello")]);
        store.append(&session.id, [Message::user("again")]);

        let history = store.history(&session.id);
        assert_eq!(history.len(), 3);
        assert_eq!(history[2].content, "again");
    }

    #[test]
    fn test_append_creates_missing_session() {
        let store = store();
        store.append("custom-id", [Message::user("hi")]);
        let session = store.get("custom-id").unwrap();
        assert_eq!(session.messages.len(), 1);
    }

    #[test]
    fn test_list_and_delete() {
        let store = store();
        let a = store.create();
        let b = store.create();
        store.append(&b.id, [Message::user("x")]);

        let list = store.list();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, b.id);
        assert_eq!(list[0].message_count, 1);

        assert!(store.delete(&a.id));
        assert!(!store.delete(&a.id));
        assert!(store.get(&a.id).is_none());
    }

    #[test]
    fn test_session_cap() {
        let store = ConversationStore::new(&MemoryConfig {
            max_sessions: 5,
            idle_timeout_secs: 3600,
        });
        for _ in 0..20 {
            store.create();
        }
        store.sessions.sync();

        assert!(store.sessions.len() <= 5);
        assert!(store.list().len() <= 5);
    }

    #[test]
    fn test_concurrent_appends_are_kept() {
        let store = store();
        let session = store.create();

        std::thread::scope(|scope| {
            for t in 0..8 {
                let store = &store;
                let id = &session.id;
                scope.spawn(move || {
                    for i in 0..25 {
                        store.append(id, [Message::user(format!("{}-{}", t, i))]);
                        store.get(id);
                    }
                });
            }
        });

        assert_eq!(store.history(&session.id).len(), 200);
    }

    #[test]
    fn test_idle_sessions_expire() {
        let store = ConversationStore::new(&MemoryConfig {
            max_sessions: 10,
            idle_timeout_secs: 0,
        });
        let session = store.create();
        std::thread::sleep(Duration::from_millis(20));
        assert!(store.get(&session.id).is_none());
    }
}
