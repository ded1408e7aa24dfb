//! Registry for tool implementations.

use crate::tool::{Tool, ToolSpec};
use log::debug;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Name-keyed registry of tools, iterated in name order.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: Arc<RwLock<BTreeMap<String, Arc<dyn Tool>>>>,
}

impl ToolRegistry {
    /// Create an empty tool registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool by name, replacing any previous tool with that name.
    pub fn register(&self, tool: Arc<dyn Tool>) {
        debug!("registering tool (name={})", tool.name());
        self.tools.write().insert(tool.name().to_string(), tool);
    }

    /// Fetch a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.read().get(name).cloned()
    }

    /// List all registered tool names.
    pub fn list(&self) -> Vec<String> {
        self.tools.read().keys().cloned().collect()
    }

    /// Return tool specs for all registered tools.
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.read().values().map(|tool| tool.spec()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::ToolRegistry;
    use crate::{Tool, ToolContext};
    use async_trait::async_trait;
    use deepsearch_protocol::ToolError;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};
    use std::sync::Arc;

    #[derive(Debug)]
    struct DummyTool {
        name: &'static str,
    }

    #[async_trait]
    impl Tool for DummyTool {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "dummy"
        }

        fn args_schema(&self) -> Value {
            json!({})
        }

        async fn call(&self, _ctx: &ToolContext, _args: Value) -> Result<Value, ToolError> {
            Ok(json!({}))
        }
    }

    #[test]
    fn registry_tracks_tools_and_specs_in_name_order() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(DummyTool { name: "searchWeb" }));
        registry.register(Arc::new(DummyTool { name: "scrapePages" }));

        assert_eq!(registry.list(), vec!["scrapePages", "searchWeb"]);
        let names = registry
            .specs()
            .into_iter()
            .map(|spec| spec.name)
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["scrapePages", "searchWeb"]);
        assert!(registry.get("searchWeb").is_some());
        assert!(registry.get("bash").is_none());
    }
}
