//! Step loop for a single chat turn.

use crate::agent::messages::push_assistant;
use crate::agent::{system_prompt, to_llm_messages};
use crate::error::DeepSearchError;
use autoagents_llm::chat::{ChatMessage as LlmMessage, ChatProvider, StreamChunk, Tool as LlmTool};
use autoagents_llm::{FunctionCall, LLMProvider, ToolCall};
use chrono::Utc;
use deepsearch_config::ModelConfig;
use deepsearch_protocol::{
    ChatMessage, EventSink, MessagePart, Role, StreamEvent, ToolError, ToolInvocation,
    ToolInvocationState,
};
use deepsearch_tools::{
    PageScraper, SearchProvider, ToolContext, ToolOutputPolicy, ToolRegistry, TurnServices,
    registry_to_llm_tools, tool_error_value,
};
use futures_util::StreamExt;
use log::{debug, info, warn};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

/// Parameters for a single turn execution.
pub(crate) struct TurnParams {
    pub(crate) chat_id: String,
    pub(crate) user_id: String,
    /// Conversation sent by the client, ending with the new user message.
    pub(crate) history: Vec<ChatMessage>,
    pub(crate) event_sink: Arc<dyn EventSink>,
}

/// Services shared by every turn.
#[derive(Clone, Default)]
pub(crate) struct ResearchServices {
    pub(crate) search: Option<Arc<dyn SearchProvider>>,
    pub(crate) scraper: Option<Arc<dyn PageScraper>>,
    pub(crate) output_policy: Option<ToolOutputPolicy>,
    pub(crate) num_results: usize,
    pub(crate) max_scrape_urls: usize,
}

/// Executes the tool-calling loop for one turn.
pub(crate) struct TurnExecutor {
    llm: Arc<dyn LLMProvider>,
    tools: ToolRegistry,
    services: ResearchServices,
    model: ModelConfig,
    max_steps: usize,
}

impl TurnExecutor {
    pub(crate) fn new(
        llm: Arc<dyn LLMProvider>,
        tools: ToolRegistry,
        services: ResearchServices,
        model: ModelConfig,
        max_steps: usize,
    ) -> Self {
        Self {
            llm,
            tools,
            services,
            model,
            max_steps,
        }
    }

    /// Run up to `max_steps` model calls, executing requested tools between them.
    ///
    /// Returns one assistant message per step.
    pub(crate) async fn run_turn(
        &self,
        params: TurnParams,
    ) -> Result<Vec<ChatMessage>, DeepSearchError> {
        let TurnParams {
            chat_id,
            user_id,
            history,
            event_sink,
        } = params;
        info!(
            "starting turn (chat_id={}, messages={}, max_steps={})",
            chat_id,
            history.len(),
            self.max_steps
        );

        let services = TurnServices {
            search: self.services.search.clone(),
            scraper: self.services.scraper.clone(),
            output_policy: self.services.output_policy.clone(),
            event_sink: Some(event_sink.clone()),
            num_results: self.services.num_results,
            max_scrape_urls: self.services.max_scrape_urls,
        };
        let base_ctx = ToolContext::new(chat_id.clone(), user_id, Arc::new(services));
        let tools = registry_to_llm_tools(&self.tools);
        let prompt = system_prompt(&self.model, Utc::now());
        let mut conversation = to_llm_messages(&prompt, &history);
        let mut responses = Vec::new();

        for step in 1..=self.max_steps {
            let (text, calls) = self.stream_step(&conversation, &tools, &event_sink).await?;
            debug!(
                "model step finished (chat_id={}, step={}, text_len={}, tool_calls={})",
                chat_id,
                step,
                text.len(),
                calls.len()
            );

            let mut parts = Vec::with_capacity(calls.len() + 1);
            if !text.is_empty() {
                parts.push(MessagePart::text(text));
            }
            let finished = calls.is_empty();
            for call in calls {
                let invocation = self.invoke(&base_ctx, step, call).await;
                parts.push(MessagePart::ToolInvocation {
                    tool_invocation: invocation,
                });
            }

            let message = ChatMessage::new(Role::Assistant, parts);
            push_assistant(&mut conversation, &message);
            responses.push(message);
            event_sink.emit(StreamEvent::StepFinish { step });

            if finished {
                info!("turn completed (chat_id={}, steps={})", chat_id, step);
                return Ok(responses);
            }
        }

        warn!(
            "step budget exhausted (chat_id={}, max_steps={})",
            chat_id, self.max_steps
        );
        Ok(responses)
    }

    /// Run one model call, forwarding text chunks to the sink as they arrive.
    ///
    /// Returns the step's full text and the tool calls it requested.
    async fn stream_step(
        &self,
        conversation: &[LlmMessage],
        tools: &[LlmTool],
        event_sink: &Arc<dyn EventSink>,
    ) -> Result<(String, Vec<ToolCall>), DeepSearchError> {
        let mut stream = self
            .llm
            .chat_stream_with_tools(conversation, Some(tools), None)
            .await
            .map_err(|err| DeepSearchError::Model(err.to_string()))?;
        let mut step = StepCollector::default();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|err| DeepSearchError::Model(err.to_string()))?;
            if let Some(text) = step.push(chunk) {
                event_sink.emit(StreamEvent::TextDelta { text });
            }
        }
        Ok(step.finish())
    }

    /// Execute one tool call; failures become `{ "error": ... }` results.
    async fn invoke(&self, base_ctx: &ToolContext, step: usize, call: ToolCall) -> ToolInvocation {
        let tool_call_id = if call.id.is_empty() {
            format!("call_{}", Uuid::new_v4().simple())
        } else {
            call.id
        };
        let tool_name = call.function.name;
        let args = parse_call_arguments(&call.function.arguments);
        let ctx = base_ctx.for_call(step, &tool_call_id, &tool_name);

        let result = match self.tools.get(&tool_name) {
            Some(tool) => match ctx.execute_tool(tool.as_ref(), args.clone()).await {
                Ok(output) => output,
                Err(err) => tool_error_value(&err),
            },
            None => {
                warn!(
                    "model requested unknown tool (chat_id={}, tool_name={})",
                    ctx.chat_id, tool_name
                );
                ctx.emit_tool_call(&args);
                let output = tool_error_value(&ToolError::ToolNotFound(tool_name.clone()));
                ctx.emit_tool_result(&output);
                output
            }
        };

        ToolInvocation {
            tool_call_id,
            tool_name,
            state: ToolInvocationState::Result,
            args,
            result: Some(result),
        }
    }
}

#[derive(Debug, Default)]
struct PartialCall {
    id: String,
    name: String,
    arguments: String,
}

/// Folds the chunks of one streamed model call into text and tool calls.
///
/// Providers either send a finished call per block or only its start and
/// argument deltas; a finished call wins when both arrive for one index.
#[derive(Debug, Default)]
struct StepCollector {
    text: String,
    partial: BTreeMap<usize, PartialCall>,
    completed: BTreeMap<usize, ToolCall>,
}

impl StepCollector {
    /// Returns the text delta to forward, if the chunk carried any.
    fn push(&mut self, chunk: StreamChunk) -> Option<String> {
        match chunk {
            StreamChunk::Text(text) => {
                if text.is_empty() {
                    return None;
                }
                self.text.push_str(&text);
                Some(text)
            }
            StreamChunk::ToolUseStart { index, id, name } => {
                let call = self.partial.entry(index).or_default();
                call.id = id;
                call.name = name;
                None
            }
            StreamChunk::ToolUseInputDelta {
                index,
                partial_json,
            } => {
                self.partial
                    .entry(index)
                    .or_default()
                    .arguments
                    .push_str(&partial_json);
                None
            }
            StreamChunk::ToolUseComplete { index, tool_call } => {
                self.completed.insert(index, tool_call);
                None
            }
            _ => None,
        }
    }

    fn finish(self) -> (String, Vec<ToolCall>) {
        let mut calls = self.completed;
        for (index, partial) in self.partial {
            if partial.name.is_empty() {
                warn!("dropping streamed tool call without a name (index={})", index);
                continue;
            }
            calls.entry(index).or_insert_with(|| ToolCall {
                id: partial.id,
                call_type: "function".to_string(),
                function: FunctionCall {
                    name: partial.name,
                    arguments: partial.arguments,
                },
            });
        }
        (self.text, calls.into_values().collect())
    }
}

/// Arguments arrive as a JSON string; blank means no arguments.
fn parse_call_arguments(raw: &str) -> Value {
    if raw.trim().is_empty() {
        return json!({});
    }
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
