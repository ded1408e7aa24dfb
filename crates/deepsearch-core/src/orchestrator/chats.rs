//! Chat resolution, title derivation and history reconciliation.

use crate::error::DeepSearchError;
use crate::state::{ChatRecord, StateError, StateStore};
use deepsearch_protocol::{ChatMessage, ChatSummary, ChatTranscript, Role};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Title used when no user text is available.
pub const DEFAULT_CHAT_TITLE: &str = "New Chat";

/// Derive a chat title from the first user message with text.
pub fn derive_title(messages: &[ChatMessage], max_chars: usize) -> String {
    let Some(text) = messages
        .iter()
        .filter(|message| message.role == Role::User)
        .map(|message| message.text_content().trim().to_string())
        .find(|text| !text.is_empty())
    else {
        return DEFAULT_CHAT_TITLE.to_string();
    };
    if text.chars().count() <= max_chars {
        return text;
    }
    let truncated = text.chars().take(max_chars).collect::<String>();
    format!("{}...", truncated.trim_end())
}

/// Merge a turn's response messages into the incoming history.
///
/// Incoming order comes first, then response order; a response message whose id
/// already exists replaces the earlier entry in place.
pub fn merge_messages(incoming: &[ChatMessage], response: Vec<ChatMessage>) -> Vec<ChatMessage> {
    let mut merged = incoming.to_vec();
    let mut index = merged
        .iter()
        .enumerate()
        .map(|(position, message)| (message.id.clone(), position))
        .collect::<HashMap<_, _>>();
    for message in response {
        match index.get(&message.id) {
            Some(&position) => merged[position] = message,
            None => {
                index.insert(message.id.clone(), merged.len());
                merged.push(message);
            }
        }
    }
    merged
}

/// Outcome of resolving the chat for a turn.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedChat {
    pub(crate) record: ChatRecord,
    pub(crate) created: bool,
}

/// Chat storage facade enforcing ownership on every read and write.
#[derive(Clone)]
pub(crate) struct ChatStore {
    state_store: Arc<dyn StateStore>,
    title_max_chars: usize,
}

impl ChatStore {
    pub(crate) fn new(state_store: Arc<dyn StateStore>, title_max_chars: usize) -> Self {
        Self {
            state_store,
            title_max_chars,
        }
    }

    /// Load an owned chat or create one holding `incoming`.
    pub(crate) fn resolve(
        &self,
        user_id: &str,
        chat_id: Option<&str>,
        incoming: &[ChatMessage],
    ) -> Result<ResolvedChat, DeepSearchError> {
        if let Some(chat_id) = chat_id {
            let record = self.owned_chat(user_id, chat_id)?;
            debug!(
                "resolved existing chat (chat_id={}, version={})",
                record.id, record.version
            );
            return Ok(ResolvedChat {
                record,
                created: false,
            });
        }

        let title = derive_title(incoming, self.title_max_chars);
        let record = ChatRecord::new(Uuid::new_v4().to_string(), user_id, title);
        self.state_store
            .create_chat(&record, incoming)
            .map_err(state_error)?;
        info!(
            "created chat (chat_id={}, user_id={}, title={})",
            record.id, user_id, record.title
        );
        Ok(ResolvedChat {
            record,
            created: true,
        })
    }

    /// Replace the chat's messages, failing if another turn saved first.
    pub(crate) fn save(
        &self,
        record: &ChatRecord,
        messages: &[ChatMessage],
    ) -> Result<i64, DeepSearchError> {
        self.state_store
            .replace_messages(&record.id, record.version, messages)
            .map_err(state_error)
    }

    pub(crate) fn list(&self, user_id: &str) -> Result<Vec<ChatSummary>, DeepSearchError> {
        let records = self.state_store.list_chats(user_id).map_err(state_error)?;
        Ok(records.iter().map(ChatRecord::summary).collect())
    }

    pub(crate) fn transcript(
        &self,
        user_id: &str,
        chat_id: &str,
    ) -> Result<ChatTranscript, DeepSearchError> {
        let record = self.owned_chat(user_id, chat_id)?;
        let messages = self
            .state_store
            .load_messages(chat_id)
            .map_err(state_error)?;
        Ok(ChatTranscript {
            id: record.id,
            title: record.title,
            created_at: record.created_at,
            updated_at: record.updated_at,
            messages,
        })
    }

    pub(crate) fn delete(&self, user_id: &str, chat_id: &str) -> Result<(), DeepSearchError> {
        self.owned_chat(user_id, chat_id)?;
        if !self.state_store.delete_chat(chat_id).map_err(state_error)? {
            return Err(DeepSearchError::ChatNotFound(chat_id.to_string()));
        }
        info!("deleted chat (chat_id={}, user_id={})", chat_id, user_id);
        Ok(())
    }

    /// Missing and foreign chats are indistinguishable to the caller.
    fn owned_chat(&self, user_id: &str, chat_id: &str) -> Result<ChatRecord, DeepSearchError> {
        match self.state_store.load_chat(chat_id).map_err(state_error)? {
            Some(record) if record.user_id == user_id => Ok(record),
            Some(_) => {
                warn!(
                    "rejected access to foreign chat (chat_id={}, user_id={})",
                    chat_id, user_id
                );
                Err(DeepSearchError::ChatNotFound(chat_id.to_string()))
            }
            None => Err(DeepSearchError::ChatNotFound(chat_id.to_string())),
        }
    }
}

fn state_error(err: StateError) -> DeepSearchError {
    match err {
        StateError::VersionConflict {
            chat_id, expected, ..
        } => DeepSearchError::VersionConflict { chat_id, expected },
        StateError::ChatMissing(chat_id) => DeepSearchError::ChatNotFound(chat_id),
        other => DeepSearchError::State(other.to_string()),
    }
}
