use async_trait::async_trait;
use autoagents_llm::chat::{
    ChatMessage, ChatProvider, ChatResponse, StreamChunk, StructuredOutputFormat, Tool,
};
use autoagents_llm::completion::{CompletionProvider, CompletionRequest, CompletionResponse};
use autoagents_llm::embedding::EmbeddingProvider;
use autoagents_llm::error::LLMError;
use autoagents_llm::models::ModelsProvider;
use autoagents_llm::{FunctionCall, LLMProvider, ToolCall};
use futures_util::Stream;
use futures_util::stream;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Build a provider tool call with JSON arguments.
pub fn tool_call(id: &str, name: &str, args: Value) -> ToolCall {
    ToolCall {
        id: id.to_string(),
        call_type: "function".to_string(),
        function: FunctionCall {
            name: name.to_string(),
            arguments: args.to_string(),
        },
    }
}

#[derive(Debug, Clone)]
pub struct FixedChatResponse {
    text: String,
    tool_calls: Option<Vec<ToolCall>>,
}

impl FixedChatResponse {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tool_calls: None,
        }
    }

    pub fn with_tool_calls(text: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            text: text.into(),
            tool_calls: Some(tool_calls),
        }
    }
}

impl std::fmt::Display for FixedChatResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text)
    }
}

type LlmStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, LLMError>> + Send>>;

impl FixedChatResponse {
    /// Replay the response as one text chunk plus one finished call per tool call.
    fn into_stream(self) -> LlmStream {
        let mut chunks = Vec::new();
        if !self.text.is_empty() {
            chunks.push(Ok(StreamChunk::Text(self.text)));
        }
        for (index, tool_call) in self.tool_calls.unwrap_or_default().into_iter().enumerate() {
            chunks.push(Ok(StreamChunk::ToolUseComplete { index, tool_call }));
        }
        Box::pin(stream::iter(chunks))
    }
}

impl ChatResponse for FixedChatResponse {
    fn text(&self) -> Option<String> {
        Some(self.text.clone())
    }

    fn tool_calls(&self) -> Option<Vec<ToolCall>> {
        self.tool_calls.clone()
    }
}

/// Replays queued responses in order, recording every request.
///
/// Once the script is exhausted every further call answers with `"done"`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedLLM {
    script: Arc<Mutex<VecDeque<FixedChatResponse>>>,
    pub requests: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
    pub seen_tools: Arc<Mutex<Vec<String>>>,
}

impl ScriptedLLM {
    pub fn new(script: Vec<FixedChatResponse>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }

    fn next_response(&self, messages: &[ChatMessage], tools: Option<&[Tool]>) -> FixedChatResponse {
        self.requests.lock().push(messages.to_vec());
        *self.seen_tools.lock() = tools
            .unwrap_or(&[])
            .iter()
            .map(|tool| tool.function.name.clone())
            .collect();
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| FixedChatResponse::new("done"))
    }
}

#[async_trait]
impl ChatProvider for ScriptedLLM {
    async fn chat_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[Tool]>,
        _json_schema: Option<StructuredOutputFormat>,
    ) -> Result<Box<dyn ChatResponse>, LLMError> {
        Ok(Box::new(self.next_response(messages, tools)))
    }

    async fn chat_stream_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[Tool]>,
        _json_schema: Option<StructuredOutputFormat>,
    ) -> Result<LlmStream, LLMError> {
        Ok(self.next_response(messages, tools).into_stream())
    }
}

#[async_trait]
impl CompletionProvider for ScriptedLLM {
    async fn complete(
        &self,
        _req: &CompletionRequest,
        _json_schema: Option<StructuredOutputFormat>,
    ) -> Result<CompletionResponse, LLMError> {
        Err(LLMError::ProviderError("scripted".to_string()))
    }
}

#[async_trait]
impl EmbeddingProvider for ScriptedLLM {
    async fn embed(&self, _input: Vec<String>) -> Result<Vec<Vec<f32>>, LLMError> {
        Err(LLMError::ProviderError("scripted".to_string()))
    }
}

#[async_trait]
impl ModelsProvider for ScriptedLLM {}

impl LLMProvider for ScriptedLLM {}

/// Blocks calls whose last message equals `gated_text` until released.
///
/// Other calls answer immediately with `response`.
#[derive(Debug)]
pub struct GatedLLM {
    gated_text: String,
    response: String,
    gate: Mutex<Option<oneshot::Receiver<()>>>,
}

impl GatedLLM {
    /// Returns the model and the sender that releases the gated call.
    pub fn new(
        gated_text: impl Into<String>,
        response: impl Into<String>,
    ) -> (Self, oneshot::Sender<()>) {
        let (sender, receiver) = oneshot::channel();
        (
            Self {
                gated_text: gated_text.into(),
                response: response.into(),
                gate: Mutex::new(Some(receiver)),
            },
            sender,
        )
    }

    async fn respond(&self, messages: &[ChatMessage]) -> FixedChatResponse {
        let gated = messages
            .last()
            .is_some_and(|message| message.content == self.gated_text);
        if gated {
            let gate = self.gate.lock().take();
            if let Some(gate) = gate {
                let _ = gate.await;
            }
        }
        FixedChatResponse::new(self.response.clone())
    }
}

#[async_trait]
impl ChatProvider for GatedLLM {
    async fn chat_with_tools(
        &self,
        messages: &[ChatMessage],
        _tools: Option<&[Tool]>,
        _json_schema: Option<StructuredOutputFormat>,
    ) -> Result<Box<dyn ChatResponse>, LLMError> {
        Ok(Box::new(self.respond(messages).await))
    }

    async fn chat_stream_with_tools(
        &self,
        messages: &[ChatMessage],
        _tools: Option<&[Tool]>,
        _json_schema: Option<StructuredOutputFormat>,
    ) -> Result<LlmStream, LLMError> {
        Ok(self.respond(messages).await.into_stream())
    }
}

#[async_trait]
impl CompletionProvider for GatedLLM {
    async fn complete(
        &self,
        _req: &CompletionRequest,
        _json_schema: Option<StructuredOutputFormat>,
    ) -> Result<CompletionResponse, LLMError> {
        Err(LLMError::ProviderError("gated".to_string()))
    }
}

#[async_trait]
impl EmbeddingProvider for GatedLLM {
    async fn embed(&self, _input: Vec<String>) -> Result<Vec<Vec<f32>>, LLMError> {
        Err(LLMError::ProviderError("gated".to_string()))
    }
}

#[async_trait]
impl ModelsProvider for GatedLLM {}

impl LLMProvider for GatedLLM {}

#[derive(Debug, Clone)]
pub struct FailingLLM {
    message: String,
}

impl FailingLLM {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl ChatProvider for FailingLLM {
    async fn chat_with_tools(
        &self,
        _messages: &[ChatMessage],
        _tools: Option<&[Tool]>,
        _json_schema: Option<StructuredOutputFormat>,
    ) -> Result<Box<dyn ChatResponse>, LLMError> {
        Err(LLMError::ProviderError(self.message.clone()))
    }

    async fn chat_stream_with_tools(
        &self,
        _messages: &[ChatMessage],
        _tools: Option<&[Tool]>,
        _json_schema: Option<StructuredOutputFormat>,
    ) -> Result<LlmStream, LLMError> {
        Err(LLMError::ProviderError(self.message.clone()))
    }
}

#[async_trait]
impl CompletionProvider for FailingLLM {
    async fn complete(
        &self,
        _req: &CompletionRequest,
        _json_schema: Option<StructuredOutputFormat>,
    ) -> Result<CompletionResponse, LLMError> {
        Err(LLMError::ProviderError(self.message.clone()))
    }
}

#[async_trait]
impl EmbeddingProvider for FailingLLM {
    async fn embed(&self, _input: Vec<String>) -> Result<Vec<Vec<f32>>, LLMError> {
        Err(LLMError::ProviderError(self.message.clone()))
    }
}

#[async_trait]
impl ModelsProvider for FailingLLM {}

impl LLMProvider for FailingLLM {}

/// Streams fixed text chunks and never calls tools.
#[derive(Debug, Clone)]
pub struct StreamingLLM {
    chunks: Vec<String>,
}

impl StreamingLLM {
    pub fn new(chunks: &[&str]) -> Self {
        Self {
            chunks: chunks.iter().map(|chunk| chunk.to_string()).collect(),
        }
    }
}

#[async_trait]
impl ChatProvider for StreamingLLM {
    async fn chat_with_tools(
        &self,
        _messages: &[ChatMessage],
        _tools: Option<&[Tool]>,
        _json_schema: Option<StructuredOutputFormat>,
    ) -> Result<Box<dyn ChatResponse>, LLMError> {
        Ok(Box::new(FixedChatResponse::new(self.chunks.concat())))
    }

    async fn chat_stream_with_tools(
        &self,
        _messages: &[ChatMessage],
        _tools: Option<&[Tool]>,
        _json_schema: Option<StructuredOutputFormat>,
    ) -> Result<LlmStream, LLMError> {
        let chunks = self
            .chunks
            .iter()
            .cloned()
            .map(StreamChunk::Text)
            .map(Ok)
            .collect::<Vec<_>>();
        Ok(Box::pin(stream::iter(chunks)))
    }
}

#[async_trait]
impl CompletionProvider for StreamingLLM {
    async fn complete(
        &self,
        _req: &CompletionRequest,
        _json_schema: Option<StructuredOutputFormat>,
    ) -> Result<CompletionResponse, LLMError> {
        Err(LLMError::ProviderError("streaming".to_string()))
    }
}

#[async_trait]
impl EmbeddingProvider for StreamingLLM {
    async fn embed(&self, _input: Vec<String>) -> Result<Vec<Vec<f32>>, LLMError> {
        Err(LLMError::ProviderError("streaming".to_string()))
    }
}

#[async_trait]
impl ModelsProvider for StreamingLLM {}

impl LLMProvider for StreamingLLM {}
