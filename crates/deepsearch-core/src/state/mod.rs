//! Chat persistence: chat records plus their ordered message lists.

mod memory;
mod sqlite;

pub use memory::MemoryStateStore;
pub use sqlite::SqliteStateStore;

use chrono::{DateTime, Utc};
use deepsearch_protocol::{ChatId, ChatMessage, ChatSummary, UnknownRole};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Persisted chat row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatRecord {
    /// Chat identifier.
    pub id: ChatId,
    /// Owning user.
    pub user_id: String,
    /// Title derived from the first user message.
    pub title: String,
    /// Optimistic concurrency counter, bumped on every message replace.
    pub version: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl ChatRecord {
    /// Create a fresh record at version 0.
    pub fn new(id: impl Into<ChatId>, user_id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            user_id: user_id.into(),
            title: title.into(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Listing view of the record.
    pub fn summary(&self) -> ChatSummary {
        ChatSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Persistent store abstraction for chats and messages.
///
/// Message lists are written whole: position is the index in the slice.
pub trait StateStore: Send + Sync {
    /// Insert a new chat together with its initial messages.
    fn create_chat(&self, chat: &ChatRecord, messages: &[ChatMessage]) -> Result<(), StateError>;
    /// Load a chat row by id.
    fn load_chat(&self, chat_id: &str) -> Result<Option<ChatRecord>, StateError>;
    /// Load a chat's messages in position order.
    fn load_messages(&self, chat_id: &str) -> Result<Vec<ChatMessage>, StateError>;
    /// Atomically replace all messages of a chat if its version still equals
    /// `expected_version`. Returns the new version.
    fn replace_messages(
        &self,
        chat_id: &str,
        expected_version: i64,
        messages: &[ChatMessage],
    ) -> Result<i64, StateError>;
    /// List a user's chats, most recently updated first.
    fn list_chats(&self, user_id: &str) -> Result<Vec<ChatRecord>, StateError>;
    /// Delete a chat and its messages.
    fn delete_chat(&self, chat_id: &str) -> Result<bool, StateError>;
}

/// Errors returned by the state store.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
    #[error("stored message has {0}")]
    InvalidRole(#[from] UnknownRole),
    #[error("chat already exists: {0}")]
    ChatExists(ChatId),
    #[error("chat not found: {0}")]
    ChatMissing(ChatId),
    #[error("version conflict on chat {chat_id} (expected={expected}, actual={actual})")]
    VersionConflict {
        chat_id: ChatId,
        expected: i64,
        actual: i64,
    },
}
