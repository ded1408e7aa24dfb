//! Conversion from stored chat messages to provider chat messages.

use autoagents_llm::chat::{ChatMessage as LlmMessage, ChatRole, MessageType};
use autoagents_llm::{FunctionCall, ToolCall};
use deepsearch_protocol::{ChatMessage, Role, ToolInvocation, ToolInvocationState};
use log::debug;

/// Result text sent for invocations that never completed.
pub(crate) const TOOL_RESULT_PLACEHOLDER: &str = "[tool output omitted]";

/// Build the provider message list: system prompt first, then history.
///
/// Every assistant tool use is followed by a tool-result message carrying one
/// result per call, so interrupted invocations get a placeholder.
pub fn to_llm_messages(system_prompt: &str, history: &[ChatMessage]) -> Vec<LlmMessage> {
    let mut output = Vec::with_capacity(history.len() + 1);
    output.push(text_message(ChatRole::System, system_prompt.to_string()));
    for message in history {
        match message.role {
            Role::User => {
                let text = message.text_content();
                if !text.is_empty() {
                    output.push(text_message(ChatRole::User, text));
                }
            }
            Role::Assistant => push_assistant(&mut output, message),
            Role::System | Role::Tool => {
                debug!(
                    "skipping client-supplied message (id={}, role={})",
                    message.id,
                    message.role.as_str()
                );
            }
        }
    }
    output
}

pub(crate) fn push_assistant(output: &mut Vec<LlmMessage>, message: &ChatMessage) {
    let text = message.text_content();
    if !text.is_empty() {
        output.push(text_message(ChatRole::Assistant, text));
    }
    let invocations = message.tool_invocations().collect::<Vec<_>>();
    if invocations.is_empty() {
        return;
    }
    let calls = invocations
        .iter()
        .map(|invocation| tool_call(invocation, invocation.args.to_string()))
        .collect();
    let results = invocations
        .iter()
        .map(|invocation| tool_call(invocation, result_text(invocation)))
        .collect();
    output.push(LlmMessage {
        role: ChatRole::Assistant,
        message_type: MessageType::ToolUse(calls),
        content: String::new(),
    });
    output.push(LlmMessage {
        role: ChatRole::Tool,
        message_type: MessageType::ToolResult(results),
        content: String::new(),
    });
}

fn text_message(role: ChatRole, content: String) -> LlmMessage {
    LlmMessage {
        role,
        message_type: MessageType::Text,
        content,
    }
}

fn tool_call(invocation: &ToolInvocation, arguments: String) -> ToolCall {
    ToolCall {
        id: invocation.tool_call_id.clone(),
        call_type: "function".to_string(),
        function: FunctionCall {
            name: invocation.tool_name.clone(),
            arguments,
        },
    }
}

fn result_text(invocation: &ToolInvocation) -> String {
    match (&invocation.state, &invocation.result) {
        (ToolInvocationState::Result, Some(result)) => result.to_string(),
        _ => TOOL_RESULT_PLACEHOLDER.to_string(),
    }
}
