//! Model-facing pieces of a turn: provider construction, prompt, history conversion.

pub mod llm;
pub mod messages;
pub mod prompt;

pub use llm::build_llm_provider;
pub use messages::to_llm_messages;
pub use prompt::system_prompt;
