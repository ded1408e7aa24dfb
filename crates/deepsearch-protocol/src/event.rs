//! Stream events sent to clients during a turn, and the sink that receives them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Events streamed to the client while a turn runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum StreamEvent {
    /// A chat was created for this turn.
    #[serde(rename = "NEW_CHAT_CREATED", rename_all = "camelCase")]
    NewChatCreated { chat_id: String },
    /// Assistant text produced by a step.
    #[serde(rename = "text-delta")]
    TextDelta { text: String },
    /// The model requested a tool call.
    #[serde(rename = "tool-call", rename_all = "camelCase")]
    ToolCall {
        tool_call_id: String,
        tool_name: String,
        args: Value,
    },
    /// A tool call completed.
    #[serde(rename = "tool-result", rename_all = "camelCase")]
    ToolResult {
        tool_call_id: String,
        tool_name: String,
        result: Value,
    },
    /// A model step completed.
    #[serde(rename = "step-finish")]
    StepFinish { step: usize },
    /// The turn completed and the chat was saved.
    #[serde(rename = "finish", rename_all = "camelCase")]
    Finish {
        chat_id: String,
        message_count: usize,
    },
    /// The turn failed.
    #[serde(rename = "error")]
    Error { message: String },
}

impl StreamEvent {
    /// Wire name of the event type.
    pub fn kind(&self) -> &'static str {
        match self {
            StreamEvent::NewChatCreated { .. } => "NEW_CHAT_CREATED",
            StreamEvent::TextDelta { .. } => "text-delta",
            StreamEvent::ToolCall { .. } => "tool-call",
            StreamEvent::ToolResult { .. } => "tool-result",
            StreamEvent::StepFinish { .. } => "step-finish",
            StreamEvent::Finish { .. } => "finish",
            StreamEvent::Error { .. } => "error",
        }
    }

    /// True for events that end the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Finish { .. } | StreamEvent::Error { .. })
    }
}

/// Sink interface for turn events.
pub trait EventSink: Send + Sync {
    /// Emit an event to downstream listeners.
    fn emit(&self, event: StreamEvent);
}
