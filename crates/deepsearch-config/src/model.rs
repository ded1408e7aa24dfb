//! Configuration schema for DeepSearch.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Root config for the DeepSearch service.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DeepSearchConfig {
    #[serde(default, rename = "$schema")]
    pub schema: Option<String>,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

impl DeepSearchConfig {
    /// Start building a config programmatically with defaults applied.
    pub fn builder() -> DeepSearchConfigBuilder {
        DeepSearchConfigBuilder::new()
    }
}

/// Builder for assembling a `DeepSearchConfig` in code.
#[derive(Debug, Default, Clone)]
pub struct DeepSearchConfigBuilder {
    config: DeepSearchConfig,
}

impl DeepSearchConfigBuilder {
    /// Create a new builder seeded with default config values.
    pub fn new() -> Self {
        Self {
            config: DeepSearchConfig::default(),
        }
    }

    /// Replace the model configuration.
    pub fn model(mut self, model: ModelConfig) -> Self {
        self.config.model = model;
        self
    }

    /// Replace the agent loop configuration.
    pub fn agent(mut self, agent: AgentConfig) -> Self {
        self.config.agent = agent;
        self
    }

    /// Replace the search provider configuration.
    pub fn search(mut self, search: SearchConfig) -> Self {
        self.config.search = search;
        self
    }

    /// Replace the page scraper configuration.
    pub fn scraper(mut self, scraper: ScraperConfig) -> Self {
        self.config.scraper = scraper;
        self
    }

    /// Replace the scrape cache configuration.
    pub fn cache(mut self, cache: CacheConfig) -> Self {
        self.config.cache = cache;
        self
    }

    /// Replace the global tool configuration.
    pub fn tools(mut self, tools: ToolsConfig) -> Self {
        self.config.tools = tools;
        self
    }

    /// Replace the database configuration.
    pub fn database(mut self, database: DatabaseConfig) -> Self {
        self.config.database = database;
        self
    }

    /// Replace the HTTP server configuration.
    pub fn server(mut self, server: ServerConfig) -> Self {
        self.config.server = server;
        self
    }

    /// Replace the bearer token table.
    pub fn auth(mut self, auth: AuthConfig) -> Self {
        self.config.auth = auth;
        self
    }

    /// Finalize and return the built `DeepSearchConfig`.
    pub fn build(self) -> DeepSearchConfig {
        self.config
    }
}

/// LLM provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_model_provider")]
    pub provider: String,
    #[serde(default = "default_model_name")]
    pub name: String,
    /// Environment variable holding the provider API key.
    #[serde(default = "default_model_api_key_env")]
    pub api_key_env: String,
    /// Replaces the built-in system prompt when set.
    #[serde(default)]
    pub system_prompt: Option<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_model_provider(),
            name: default_model_name(),
            api_key_env: default_model_api_key_env(),
            system_prompt: None,
        }
    }
}

fn default_model_provider() -> String {
    "openai".to_string()
}

fn default_model_name() -> String {
    "gpt-4o-mini".to_string()
}

fn default_model_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

/// Tool-calling loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum model calls per turn.
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    /// Maximum characters kept from the first user message as chat title.
    #[serde(default = "default_title_max_chars")]
    pub title_max_chars: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            title_max_chars: default_title_max_chars(),
        }
    }
}

fn default_max_steps() -> usize {
    10
}

fn default_title_max_chars() -> usize {
    50
}

/// Web search provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_search_provider")]
    pub provider: String,
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,
    /// Environment variable holding the search API key.
    #[serde(default = "default_search_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_num_results")]
    pub num_results: usize,
    #[serde(default = "default_search_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            provider: default_search_provider(),
            endpoint: default_search_endpoint(),
            api_key_env: default_search_api_key_env(),
            num_results: default_num_results(),
            timeout_ms: default_search_timeout_ms(),
        }
    }
}

fn default_search_provider() -> String {
    "serper".to_string()
}

fn default_search_endpoint() -> String {
    "https://google.serper.dev/search".to_string()
}

fn default_search_api_key_env() -> String {
    "SERPER_API_KEY".to_string()
}

fn default_num_results() -> usize {
    10
}

fn default_search_timeout_ms() -> u64 {
    10_000
}

/// Page fetch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    #[serde(default = "default_scrape_timeout_ms")]
    pub timeout_ms: u64,
    /// Maximum characters of extracted text kept per page.
    #[serde(default = "default_scrape_max_chars")]
    pub max_chars: usize,
    /// Maximum response body bytes read per page; the rest is never downloaded.
    #[serde(default = "default_scrape_max_bytes")]
    pub max_bytes: usize,
    /// Maximum URLs accepted per `scrapePages` call.
    #[serde(default = "default_scrape_max_urls")]
    pub max_urls: usize,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_scrape_timeout_ms(),
            max_chars: default_scrape_max_chars(),
            max_bytes: default_scrape_max_bytes(),
            max_urls: default_scrape_max_urls(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_scrape_timeout_ms() -> u64 {
    15_000
}

fn default_scrape_max_chars() -> usize {
    20_000
}

fn default_scrape_max_bytes() -> usize {
    2 * 1024 * 1024
}

fn default_scrape_max_urls() -> usize {
    10
}

fn default_user_agent() -> String {
    concat!("deepsearch/", env!("CARGO_PKG_VERSION")).to_string()
}

/// Scrape result cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    /// Backend: `memory` or `sqlite`.
    #[serde(default = "default_cache_provider")]
    pub provider: String,
    /// Sqlite cache file; defaults next to the chat database.
    #[serde(default)]
    pub path: Option<String>,
    /// Entry lifetime handed to the backend; entries never expire when unset.
    #[serde(default)]
    pub ttl_secs: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            provider: default_cache_provider(),
            path: None,
            ttl_secs: None,
        }
    }
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_provider() -> String {
    "memory".to_string()
}

/// Global tool configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ToolsConfig {
    #[serde(default)]
    pub output_policy: ToolOutputPolicyConfig,
}

/// Truncation limits applied to tool results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutputPolicyConfig {
    #[serde(default = "default_max_string_chars")]
    pub max_string_chars: usize,
    #[serde(default = "default_max_array_len")]
    pub max_array_len: usize,
    #[serde(default = "default_max_object_entries")]
    pub max_object_entries: usize,
    #[serde(default = "default_truncation_marker")]
    pub truncation_marker: String,
}

impl Default for ToolOutputPolicyConfig {
    fn default() -> Self {
        Self {
            max_string_chars: default_max_string_chars(),
            max_array_len: default_max_array_len(),
            max_object_entries: default_max_object_entries(),
            truncation_marker: default_truncation_marker(),
        }
    }
}

fn default_max_string_chars() -> usize {
    24_000
}

fn default_max_array_len() -> usize {
    50
}

fn default_max_object_entries() -> usize {
    64
}

fn default_truncation_marker() -> String {
    "...[truncated]".to_string()
}

/// Chat database settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DatabaseConfig {
    /// Sqlite file path; `~/.deepsearch/deepsearch.db` when unset.
    #[serde(default)]
    pub path: Option<String>,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Wall-clock limit for one streamed turn.
    #[serde(default = "default_max_duration_secs")]
    pub max_duration_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_port(),
            max_duration_secs: default_max_duration_secs(),
        }
    }
}

fn default_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_max_duration_secs() -> u64 {
    60
}

/// Bearer token table.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    /// Token to user id.
    #[serde(default)]
    pub tokens: HashMap<String, String>,
}

impl AuthConfig {
    /// Resolve the user id for a bearer token.
    pub fn user_for_token(&self, token: &str) -> Option<&str> {
        self.tokens.get(token).map(String::as_str)
    }
}
