//! The `Tool` seam the turn loop dispatches model calls through.

use crate::context::ToolContext;
use async_trait::async_trait;
use deepsearch_protocol::ToolError;
use serde_json::Value;
use std::fmt::Debug;

/// Name, description and argument schema advertised to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON schema object for the call arguments.
    pub args_schema: Value,
}

/// A function the model may call during a turn.
///
/// `call` returns the JSON handed back to the model; errors are rendered as
/// `{ "error": ... }` by [`ToolContext::execute_tool`], so implementations
/// should not swallow them.
#[async_trait]
pub trait Tool: Send + Sync + Debug {
    /// Name the model uses to address the tool, e.g. `searchWeb`.
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn args_schema(&self) -> Value;

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<Value, ToolError>;

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            args_schema: self.args_schema(),
        }
    }
}
