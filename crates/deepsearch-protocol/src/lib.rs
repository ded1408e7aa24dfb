//! Wire protocol types for DeepSearch chats, stream events, and tool errors.

mod event;
mod message;
mod tool;

pub use event::{EventSink, StreamEvent};
pub use message::{
    ChatId, ChatMessage, MessagePart, Role, ToolInvocation, ToolInvocationState, UnknownRole,
};
pub use tool::ToolError;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of a chat turn request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Conversation so far, ending with the new user message.
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    /// Existing chat to continue; a new chat is created when absent.
    #[serde(default, rename = "chatId")]
    pub chat_id: Option<ChatId>,
}

/// Chat metadata for listings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatSummary {
    /// Chat id.
    pub id: ChatId,
    /// Derived title.
    pub title: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Chat metadata with its stored messages in position order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatTranscript {
    /// Chat id.
    pub id: ChatId,
    /// Derived title.
    pub title: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Messages in position order.
    pub messages: Vec<ChatMessage>,
}
