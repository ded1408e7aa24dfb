//! Conversion of tool specs into LLM function-calling definitions.

use crate::{ToolRegistry, ToolSpec};
use autoagents_llm::chat::{FunctionTool, Tool as LlmTool};

/// Describe a tool to the model as a function definition.
pub fn spec_to_llm_tool(spec: &ToolSpec) -> LlmTool {
    LlmTool {
        tool_type: "function".to_string(),
        function: FunctionTool {
            name: spec.name.clone(),
            description: spec.description.clone(),
            parameters: spec.args_schema.clone(),
        },
    }
}

/// Function definitions for every registered tool.
pub fn registry_to_llm_tools(registry: &ToolRegistry) -> Vec<LlmTool> {
    registry.specs().iter().map(spec_to_llm_tool).collect()
}
