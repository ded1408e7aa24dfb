//! Error types for the core chat service.

use deepsearch_protocol::ChatId;
use thiserror::Error;

/// Errors returned by chat and turn operations.
#[derive(Debug, Error)]
pub enum DeepSearchError {
    /// Request failed validation before any work started.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// Chat is missing or owned by another user.
    #[error("chat not found: {0}")]
    ChatNotFound(ChatId),
    /// Model provider failed.
    #[error("model error: {0}")]
    Model(String),
    /// State store error.
    #[error("state error: {0}")]
    State(String),
    /// Another turn saved the chat first.
    #[error("chat {chat_id} was modified concurrently (expected version {expected})")]
    VersionConflict { chat_id: ChatId, expected: i64 },
    /// Turn exceeded its wall-clock budget.
    #[error("turn timed out after {0}s")]
    Timeout(u64),
    /// Configuration or provider wiring error.
    #[error("config error: {0}")]
    Config(String),
    /// Spawned turn task failed.
    #[error("executor error: {0}")]
    Executor(String),
    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
