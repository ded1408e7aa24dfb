//! LLM provider construction from config.

use crate::error::DeepSearchError;
use autoagents_llm::LLMProvider;
use autoagents_llm::backends::openai::OpenAI;
use autoagents_llm::builder::LLMBuilder;
use deepsearch_config::ModelConfig;
use log::info;
use std::sync::Arc;

/// Build the configured chat model; the API key is read from `api_key_env`.
pub fn build_llm_provider(config: &ModelConfig) -> Result<Arc<dyn LLMProvider>, DeepSearchError> {
    match config.provider.as_str() {
        "openai" => {
            let api_key = std::env::var(&config.api_key_env).map_err(|_| {
                DeepSearchError::Config(format!("missing {}", config.api_key_env))
            })?;
            info!("building LLM provider (provider=openai, model={})", config.name);
            let llm: Arc<dyn LLMProvider> = LLMBuilder::<OpenAI>::new()
                .api_key(api_key)
                .model(config.name.clone())
                .build()
                .map_err(|err| DeepSearchError::Config(err.to_string()))?;
            Ok(llm)
        }
        other => Err(DeepSearchError::Config(format!(
            "unsupported model provider: {other}"
        ))),
    }
}
