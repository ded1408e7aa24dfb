//! Chat message types exchanged with clients and stored per chat.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Opaque chat identifier.
pub type ChatId = String;

/// Speaker role for a message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System-provided instructions.
    System,
    /// User-authored message.
    User,
    /// Assistant-authored message.
    Assistant,
    /// Tool output message.
    Tool,
}

impl Role {
    /// Return the role as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

/// A role string that is not one of `system`, `user`, `assistant`, `tool`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown message role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "system" => Ok(Role::System),
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "tool" => Ok(Role::Tool),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Lifecycle state of a tool invocation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ToolInvocationState {
    /// Arguments are still streaming in.
    PartialCall,
    /// Call issued, no result yet.
    Call,
    /// Call completed with a result.
    Result,
}

/// Record of a single tool call made by the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolInvocation {
    /// Provider-assigned call id used to pair calls with results.
    #[serde(default = "new_tool_call_id")]
    pub tool_call_id: String,
    /// Name of the invoked tool.
    pub tool_name: String,
    /// Invocation state.
    pub state: ToolInvocationState,
    /// Arguments passed to the tool.
    #[serde(default)]
    pub args: Value,
    /// Tool output when `state` is `result`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

/// Structured content segment of a message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MessagePart {
    /// Plain or markdown text.
    Text { text: String },
    /// Tool call with its arguments and optional result.
    ToolInvocation {
        #[serde(rename = "toolInvocation")]
        tool_invocation: ToolInvocation,
    },
}

impl MessagePart {
    /// Build a text part.
    pub fn text(text: impl Into<String>) -> Self {
        MessagePart::Text { text: text.into() }
    }
}

/// A chat message made of ordered parts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", from = "WireMessage")]
pub struct ChatMessage {
    /// Message identifier.
    pub id: String,
    /// Role that produced the message.
    pub role: Role,
    /// Ordered content parts.
    pub parts: Vec<MessagePart>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Create a message with a fresh id and the current timestamp.
    pub fn new(role: Role, parts: Vec<MessagePart>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            parts,
            created_at: Utc::now(),
        }
    }

    /// Create a single-part text message.
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self::new(role, vec![MessagePart::text(text)])
    }

    /// Concatenate all text parts.
    pub fn text_content(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                MessagePart::Text { text } => Some(text.as_str()),
                MessagePart::ToolInvocation { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }

    /// Iterate over tool invocation parts.
    pub fn tool_invocations(&self) -> impl Iterator<Item = &ToolInvocation> {
        self.parts.iter().filter_map(|part| match part {
            MessagePart::ToolInvocation { tool_invocation } => Some(tool_invocation),
            MessagePart::Text { .. } => None,
        })
    }
}

/// Lenient inbound message shape; accepts `content` in place of `parts`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireMessage {
    #[serde(default)]
    id: Option<String>,
    role: Role,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    parts: Vec<MessagePart>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

impl From<WireMessage> for ChatMessage {
    fn from(wire: WireMessage) -> Self {
        let mut parts = wire.parts;
        if parts.is_empty()
            && let Some(content) = wire.content.filter(|content| !content.is_empty())
        {
            parts.push(MessagePart::Text { text: content });
        }
        Self {
            id: wire
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            role: wire.role,
            parts,
            created_at: wire.created_at.unwrap_or_else(Utc::now),
        }
    }
}

fn new_tool_call_id() -> String {
    format!("call_{}", Uuid::new_v4().simple())
}
