//! DeepSearch facade: resolves chats, runs streamed turns and saves results.

mod chats;
mod runtime;

pub use chats::{DEFAULT_CHAT_TITLE, derive_title, merge_messages};

use crate::agent::build_llm_provider;
use crate::cache::SqliteCacheStore;
use crate::error::DeepSearchError;
use crate::state::{MemoryStateStore, SqliteStateStore, StateStore};
use autoagents_llm::LLMProvider;
use chats::ChatStore;
use deepsearch_config::{CacheConfig, DatabaseConfig, DeepSearchConfig, default_data_dir};
use deepsearch_protocol::{
    ChatId, ChatMessage, ChatRequest, ChatSummary, ChatTranscript, EventSink, StreamEvent,
};
use deepsearch_tools::{
    CacheStore, CachedPageScraper, HttpPageScraper, MemoryCacheStore, PageScraper,
    SearchProvider, SerperSearchProvider, ToolOutputPolicy, ToolRegistry, builtin_tool_registry,
};
use log::{debug, error, info, warn};
use runtime::{ResearchServices, TurnExecutor, TurnParams};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Message sent to clients when a turn fails; details are only logged.
pub const GENERIC_TURN_ERROR: &str = "An error occurred while generating the response.";
const DEFAULT_DATABASE_FILE: &str = "deepsearch.db";
const DEFAULT_CACHE_FILE: &str = "cache.db";

/// Result payload for a completed turn.
#[derive(Debug, Clone)]
pub struct RunResult {
    /// Chat the turn was saved to.
    pub chat_id: ChatId,
    /// Full stored transcript after the turn.
    pub messages: Vec<ChatMessage>,
    /// Text of the final assistant message.
    pub response: String,
}

/// Streaming handle for a single turn.
pub struct RunStream {
    /// Chat the turn belongs to.
    pub chat_id: ChatId,
    /// True when the chat was created by this turn.
    pub created: bool,
    /// Events in emission order; ends with `finish` or `error`.
    pub events: UnboundedReceiverStream<StreamEvent>,
    handle: JoinHandle<Result<RunResult, DeepSearchError>>,
}

impl RunStream {
    /// Await completion of the turn and return the saved result.
    pub async fn finish(self) -> Result<RunResult, DeepSearchError> {
        self.handle
            .await
            .map_err(|err| DeepSearchError::Executor(err.to_string()))?
    }
}

struct ChannelEventSink {
    sender: mpsc::UnboundedSender<StreamEvent>,
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: StreamEvent) {
        // The receiver is gone when the client disconnected; the turn still saves.
        let _ = self.sender.send(event);
    }
}

/// Deep search chat service.
pub struct DeepSearch {
    config: Arc<DeepSearchConfig>,
    chats: ChatStore,
    executor: Arc<TurnExecutor>,
}

impl DeepSearch {
    /// Start building a service with explicit collaborators.
    pub fn builder(config: DeepSearchConfig) -> DeepSearchBuilder {
        DeepSearchBuilder::new(config)
    }

    /// Build the service with the providers and stores named in config.
    pub fn from_config(config: DeepSearchConfig) -> Result<Self, DeepSearchError> {
        info!("initializing deep search service");
        let llm = build_llm_provider(&config.model)?;
        let search: Option<Arc<dyn SearchProvider>> =
            match SerperSearchProvider::from_config(&config.search) {
                Ok(provider) => Some(Arc::new(provider)),
                Err(err) => {
                    warn!("web search disabled: {}", err);
                    None
                }
            };
        let scraper = HttpPageScraper::from_config(&config.scraper)
            .map_err(|err| DeepSearchError::Config(err.to_string()))?;
        let cache = build_cache_store(&config.cache)?;
        let state_store = open_state_store(&config.database)?;

        let mut builder = DeepSearchBuilder::new(config)
            .llm(llm)
            .scraper(Arc::new(scraper))
            .state_store(state_store);
        if let Some(search) = search {
            builder = builder.search(search);
        }
        if let Some(cache) = cache {
            builder = builder.cache(cache);
        }
        builder.build()
    }

    /// Return the configuration the service was built with.
    pub fn config(&self) -> &DeepSearchConfig {
        &self.config
    }

    /// Start a turn and stream its events.
    ///
    /// Validation, ownership checks and chat creation happen before this
    /// returns; everything after runs in a spawned task that saves the chat even
    /// if the event stream is dropped.
    pub fn run_stream(
        &self,
        user_id: &str,
        request: ChatRequest,
    ) -> Result<RunStream, DeepSearchError> {
        if request.messages.is_empty() {
            return Err(DeepSearchError::InvalidRequest(
                "messages cannot be empty".to_string(),
            ));
        }
        let resolved = self
            .chats
            .resolve(user_id, request.chat_id.as_deref(), &request.messages)?;
        let chat_id = resolved.record.id.clone();

        let (sender, receiver) = mpsc::unbounded_channel();
        let sink: Arc<dyn EventSink> = Arc::new(ChannelEventSink { sender });
        if resolved.created {
            sink.emit(StreamEvent::NewChatCreated {
                chat_id: chat_id.clone(),
            });
        }

        let executor = self.executor.clone();
        let chats = self.chats.clone();
        let max_duration = self.config.server.max_duration_secs;
        let incoming = request.messages;
        let record = resolved.record;
        let params = TurnParams {
            chat_id: chat_id.clone(),
            user_id: user_id.to_string(),
            history: incoming.clone(),
            event_sink: sink.clone(),
        };
        let handle = tokio::spawn(async move {
            let outcome = tokio::time::timeout(
                Duration::from_secs(max_duration),
                executor.run_turn(params),
            )
            .await
            .unwrap_or_else(|_| Err(DeepSearchError::Timeout(max_duration)));

            let result = outcome.and_then(|responses| {
                let response = responses
                    .last()
                    .map(ChatMessage::text_content)
                    .unwrap_or_default();
                let messages = chats::merge_messages(&incoming, responses);
                let version = chats.save(&record, &messages)?;
                debug!(
                    "saved chat (chat_id={}, messages={}, version={})",
                    record.id,
                    messages.len(),
                    version
                );
                Ok(RunResult {
                    chat_id: record.id.clone(),
                    messages,
                    response,
                })
            });

            match &result {
                Ok(run) => sink.emit(StreamEvent::Finish {
                    chat_id: run.chat_id.clone(),
                    message_count: run.messages.len(),
                }),
                Err(err) => {
                    error!("turn failed (chat_id={}): {}", record.id, err);
                    sink.emit(StreamEvent::Error {
                        message: GENERIC_TURN_ERROR.to_string(),
                    });
                }
            }
            result
        });

        Ok(RunStream {
            chat_id,
            created: resolved.created,
            events: UnboundedReceiverStream::new(receiver),
            handle,
        })
    }

    /// Run a turn to completion.
    pub async fn run(
        &self,
        user_id: &str,
        request: ChatRequest,
    ) -> Result<RunResult, DeepSearchError> {
        self.run_stream(user_id, request)?.finish().await
    }

    /// List the user's chats, most recently updated first.
    pub fn list_chats(&self, user_id: &str) -> Result<Vec<ChatSummary>, DeepSearchError> {
        self.chats.list(user_id)
    }

    /// Read an owned chat with its messages.
    pub fn get_chat(&self, user_id: &str, chat_id: &str) -> Result<ChatTranscript, DeepSearchError> {
        self.chats.transcript(user_id, chat_id)
    }

    /// Delete an owned chat.
    pub fn delete_chat(&self, user_id: &str, chat_id: &str) -> Result<(), DeepSearchError> {
        self.chats.delete(user_id, chat_id)
    }
}

/// Builder wiring a [`DeepSearch`] from explicit collaborators.
pub struct DeepSearchBuilder {
    config: DeepSearchConfig,
    llm: Option<Arc<dyn LLMProvider>>,
    tools: Option<ToolRegistry>,
    search: Option<Arc<dyn SearchProvider>>,
    scraper: Option<Arc<dyn PageScraper>>,
    cache: Option<Arc<dyn CacheStore>>,
    state_store: Option<Arc<dyn StateStore>>,
}

impl DeepSearchBuilder {
    /// Create a builder with no collaborators set.
    pub fn new(config: DeepSearchConfig) -> Self {
        Self {
            config,
            llm: None,
            tools: None,
            search: None,
            scraper: None,
            cache: None,
            state_store: None,
        }
    }

    /// Set the chat model.
    pub fn llm(mut self, llm: Arc<dyn LLMProvider>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Replace the built-in tool registry.
    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = Some(tools);
        self
    }

    /// Set the web search backend.
    pub fn search(mut self, search: Arc<dyn SearchProvider>) -> Self {
        self.search = Some(search);
        self
    }

    /// Set the page scraper.
    pub fn scraper(mut self, scraper: Arc<dyn PageScraper>) -> Self {
        self.scraper = Some(scraper);
        self
    }

    /// Cache scrape results in `cache`.
    pub fn cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Set the chat store; defaults to an in-memory store.
    pub fn state_store(mut self, state_store: Arc<dyn StateStore>) -> Self {
        self.state_store = Some(state_store);
        self
    }

    /// Build the service.
    pub fn build(self) -> Result<DeepSearch, DeepSearchError> {
        let config = self.config;
        config
            .validate()
            .map_err(|err| DeepSearchError::Config(err.to_string()))?;
        let llm = self
            .llm
            .ok_or_else(|| DeepSearchError::Config("LLM provider not configured".to_string()))?;
        let tools = self.tools.unwrap_or_else(builtin_tool_registry);
        let state_store = self.state_store.unwrap_or_else(|| {
            warn!("no chat store configured; chats are kept in memory");
            Arc::new(MemoryStateStore::new())
        });

        let ttl = config.cache.ttl_secs.map(Duration::from_secs);
        let scraper = match (self.scraper, self.cache) {
            (Some(scraper), Some(cache)) if config.cache.enabled => {
                Some(Arc::new(CachedPageScraper::new(scraper, cache, ttl)) as Arc<dyn PageScraper>)
            }
            (scraper, _) => scraper,
        };
        let services = ResearchServices {
            search: self.search,
            scraper,
            output_policy: Some(ToolOutputPolicy::from(&config.tools.output_policy)),
            num_results: config.search.num_results,
            max_scrape_urls: config.scraper.max_urls,
        };
        debug!(
            "deep search wired (tools={}, search={}, scraper={})",
            tools.list().len(),
            services.search.is_some(),
            services.scraper.is_some()
        );

        let executor = Arc::new(TurnExecutor::new(
            llm,
            tools,
            services,
            config.model.clone(),
            config.agent.max_steps,
        ));
        let chats = ChatStore::new(state_store, config.agent.title_max_chars);
        Ok(DeepSearch {
            config: Arc::new(config),
            chats,
            executor,
        })
    }
}

/// Build the scrape cache named in config, if enabled.
fn build_cache_store(
    config: &CacheConfig,
) -> Result<Option<Arc<dyn CacheStore>>, DeepSearchError> {
    if !config.enabled {
        info!("scrape cache disabled");
        return Ok(None);
    }
    match config.provider.as_str() {
        "memory" => Ok(Some(Arc::new(MemoryCacheStore::new()))),
        "sqlite" => {
            let path = resolve_data_path(config.path.as_deref(), DEFAULT_CACHE_FILE)?;
            let store = SqliteCacheStore::open(path)
                .map_err(|err| DeepSearchError::Config(err.to_string()))?;
            Ok(Some(Arc::new(store)))
        }
        other => Err(DeepSearchError::Config(format!(
            "unsupported cache provider: {other}"
        ))),
    }
}

/// Open the SQLite chat store named in config.
fn open_state_store(config: &DatabaseConfig) -> Result<Arc<dyn StateStore>, DeepSearchError> {
    let path = resolve_data_path(config.path.as_deref(), DEFAULT_DATABASE_FILE)?;
    let store = SqliteStateStore::open(path).map_err(|err| DeepSearchError::State(err.to_string()))?;
    Ok(Arc::new(store))
}

/// Resolve a configured file path, defaulting to the user data directory.
fn resolve_data_path(path: Option<&str>, file_name: &str) -> Result<PathBuf, DeepSearchError> {
    let cwd = std::env::current_dir()?;
    if let Some(path) = path {
        let path = PathBuf::from(path);
        if path.is_absolute() {
            return Ok(path);
        }
        return Ok(cwd.join(path));
    }
    Ok(default_data_dir()
        .unwrap_or_else(|| cwd.join(".deepsearch"))
        .join(file_name))
}
