//! Tool execution context.

use crate::Tool;
use crate::output_policy::ToolOutputPolicy;
use crate::web::{PageScraper, SearchProvider};
use deepsearch_protocol::{EventSink, StreamEvent, ToolError};
use log::{debug, warn};
use serde_json::{Value, json};
use std::sync::Arc;

/// Default number of search results requested per query.
const DEFAULT_NUM_RESULTS: usize = 10;
/// Default cap on URLs per scrape call.
const DEFAULT_MAX_SCRAPE_URLS: usize = 10;

/// Shared service dependencies for a turn.
pub struct TurnServices {
    /// Web search backend.
    pub search: Option<Arc<dyn SearchProvider>>,
    /// Page scraper, usually wrapped in a cache.
    pub scraper: Option<Arc<dyn PageScraper>>,
    /// Output policy applied to tool results.
    pub output_policy: Option<ToolOutputPolicy>,
    /// Sink receiving tool-call and tool-result events.
    pub event_sink: Option<Arc<dyn EventSink>>,
    /// Organic results requested per search.
    pub num_results: usize,
    /// Maximum URLs accepted by one scrape call.
    pub max_scrape_urls: usize,
}

impl Default for TurnServices {
    fn default() -> Self {
        Self {
            search: None,
            scraper: None,
            output_policy: None,
            event_sink: None,
            num_results: DEFAULT_NUM_RESULTS,
            max_scrape_urls: DEFAULT_MAX_SCRAPE_URLS,
        }
    }
}

/// Context passed to tools during execution.
///
/// Per-invocation identity lives on the context; services are shared behind
/// an `Arc` so cloning per call stays cheap.
#[derive(Clone)]
pub struct ToolContext {
    /// Chat the turn belongs to.
    pub chat_id: String,
    /// Authenticated user running the turn.
    pub user_id: String,
    /// 1-based model step that issued the call.
    pub step: usize,
    /// Provider-assigned id of the current call.
    pub tool_call_id: Option<String>,
    /// Tool name for the current invocation.
    pub tool_name: Option<String>,
    /// Shared turn-scoped services.
    pub services: Arc<TurnServices>,
}

impl ToolContext {
    /// Create a context for a chat turn.
    pub fn new(
        chat_id: impl Into<String>,
        user_id: impl Into<String>,
        services: Arc<TurnServices>,
    ) -> Self {
        Self {
            chat_id: chat_id.into(),
            user_id: user_id.into(),
            step: 0,
            tool_call_id: None,
            tool_name: None,
            services,
        }
    }

    /// Derive the context for one call within a step.
    pub fn for_call(&self, step: usize, tool_call_id: &str, tool_name: &str) -> Self {
        Self {
            step,
            tool_call_id: Some(tool_call_id.to_string()),
            tool_name: Some(tool_name.to_string()),
            ..self.clone()
        }
    }

    /// Apply the configured output policy to a tool result value.
    pub fn apply_output_policy(&self, value: Value) -> Value {
        match self.services.output_policy.as_ref() {
            Some(policy) => policy.apply(value),
            None => value,
        }
    }

    /// Emit a tool-call event for the current invocation.
    pub fn emit_tool_call(&self, args: &Value) {
        let Some(sink) = self.services.event_sink.as_ref() else {
            return;
        };
        sink.emit(StreamEvent::ToolCall {
            tool_call_id: self.tool_call_id.clone().unwrap_or_default(),
            tool_name: self.tool_name.clone().unwrap_or_default(),
            args: args.clone(),
        });
    }

    /// Emit a tool-result event for the current invocation.
    pub fn emit_tool_result(&self, result: &Value) {
        let Some(sink) = self.services.event_sink.as_ref() else {
            return;
        };
        sink.emit(StreamEvent::ToolResult {
            tool_call_id: self.tool_call_id.clone().unwrap_or_default(),
            tool_name: self.tool_name.clone().unwrap_or_default(),
            result: result.clone(),
        });
    }

    /// Run a tool, emitting call/result events and applying the output policy.
    ///
    /// Failures are returned as `Err` after an `{ "error": ... }` result event.
    pub async fn execute_tool(&self, tool: &dyn Tool, args: Value) -> Result<Value, ToolError> {
        let ctx = Self {
            tool_name: Some(tool.name().to_string()),
            ..self.clone()
        };
        debug!(
            "executing tool (chat_id={}, step={}, tool_name={})",
            ctx.chat_id,
            ctx.step,
            tool.name()
        );
        ctx.emit_tool_call(&args);
        match tool.call(&ctx, args).await {
            Ok(result) => {
                let output = ctx.apply_output_policy(result);
                ctx.emit_tool_result(&output);
                Ok(output)
            }
            Err(err) => {
                warn!(
                    "tool failed (chat_id={}, tool_name={}): {}",
                    ctx.chat_id,
                    tool.name(),
                    err
                );
                ctx.emit_tool_result(&tool_error_value(&err));
                Err(err)
            }
        }
    }
}

/// JSON shape handed to the model when a tool fails.
pub fn tool_error_value(err: &ToolError) -> Value {
    json!({ "error": err.to_string() })
}

impl std::fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolContext")
            .field("chat_id", &self.chat_id)
            .field("user_id", &self.user_id)
            .field("step", &self.step)
            .field("tool_call_id", &self.tool_call_id)
            .field("tool_name", &self.tool_name)
            .finish()
    }
}
