//! Test helpers shared across DeepSearch crates.

pub mod llm;
pub mod web;

pub use llm::{FailingLLM, FixedChatResponse, GatedLLM, ScriptedLLM, StreamingLLM, tool_call};
pub use web::{CountingScraper, StubSearchProvider};
