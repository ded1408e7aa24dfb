//! Core chat service for DeepSearch.
//!
//! This crate owns chat persistence, turn execution over the research tools,
//! and the [`DeepSearch`] facade used by the HTTP server.

pub mod agent;
pub mod cache;
pub mod error;
pub mod orchestrator;
pub mod state;

pub use cache::SqliteCacheStore;
pub use deepsearch_protocol::EventSink;
pub use error::DeepSearchError;
/// Service facade and turn helpers.
pub use orchestrator::{
    DEFAULT_CHAT_TITLE, DeepSearch, DeepSearchBuilder, GENERIC_TURN_ERROR, RunResult, RunStream,
    derive_title, merge_messages,
};
/// Chat persistence.
pub use state::{ChatRecord, MemoryStateStore, SqliteStateStore, StateError, StateStore};
