//! In-memory state store for tests and ephemeral deployments.

use super::{ChatRecord, StateError, StateStore};
use chrono::Utc;
use deepsearch_protocol::{ChatId, ChatMessage};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Process-local state store with the same version semantics as SQLite.
#[derive(Default)]
pub struct MemoryStateStore {
    chats: RwLock<HashMap<ChatId, StoredChat>>,
}

struct StoredChat {
    record: ChatRecord,
    messages: Vec<ChatMessage>,
}

impl MemoryStateStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStateStore {
    fn create_chat(&self, chat: &ChatRecord, messages: &[ChatMessage]) -> Result<(), StateError> {
        let mut chats = self.chats.write();
        if chats.contains_key(&chat.id) {
            return Err(StateError::ChatExists(chat.id.clone()));
        }
        chats.insert(
            chat.id.clone(),
            StoredChat {
                record: chat.clone(),
                messages: messages.to_vec(),
            },
        );
        Ok(())
    }

    fn load_chat(&self, chat_id: &str) -> Result<Option<ChatRecord>, StateError> {
        Ok(self
            .chats
            .read()
            .get(chat_id)
            .map(|stored| stored.record.clone()))
    }

    fn load_messages(&self, chat_id: &str) -> Result<Vec<ChatMessage>, StateError> {
        Ok(self
            .chats
            .read()
            .get(chat_id)
            .map(|stored| stored.messages.clone())
            .unwrap_or_default())
    }

    fn replace_messages(
        &self,
        chat_id: &str,
        expected_version: i64,
        messages: &[ChatMessage],
    ) -> Result<i64, StateError> {
        let mut chats = self.chats.write();
        let stored = chats
            .get_mut(chat_id)
            .ok_or_else(|| StateError::ChatMissing(chat_id.to_string()))?;
        if stored.record.version != expected_version {
            return Err(StateError::VersionConflict {
                chat_id: chat_id.to_string(),
                expected: expected_version,
                actual: stored.record.version,
            });
        }
        stored.record.version += 1;
        stored.record.updated_at = Utc::now();
        stored.messages = messages.to_vec();
        Ok(stored.record.version)
    }

    fn list_chats(&self, user_id: &str) -> Result<Vec<ChatRecord>, StateError> {
        let mut records = self
            .chats
            .read()
            .values()
            .filter(|stored| stored.record.user_id == user_id)
            .map(|stored| stored.record.clone())
            .collect::<Vec<_>>();
        records.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(records)
    }

    fn delete_chat(&self, chat_id: &str) -> Result<bool, StateError> {
        Ok(self.chats.write().remove(chat_id).is_some())
    }
}
