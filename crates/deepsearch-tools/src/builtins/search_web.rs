//! `searchWeb` tool.

use crate::builtins::utils::parse_args;
use crate::{Tool, ToolContext};
use async_trait::async_trait;
use deepsearch_protocol::ToolError;
use log::info;
use serde::Deserialize;
use serde_json::{Value, json};

/// Tool that runs a web search and returns organic results.
#[derive(Debug, Default)]
pub struct SearchWebTool;

#[derive(Debug, Deserialize)]
struct SearchWebArgs {
    query: String,
}

#[async_trait]
impl Tool for SearchWebTool {
    fn name(&self) -> &str {
        "searchWeb"
    }

    fn description(&self) -> &str {
        "Search the web for up-to-date information. Returns a list of results with title, link and snippet."
    }

    fn args_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query."
                }
            },
            "required": ["query"]
        })
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<Value, ToolError> {
        let input: SearchWebArgs = parse_args(args)?;
        let query = input.query.trim();
        if query.is_empty() {
            return Err(ToolError::InvalidArguments(
                "query cannot be empty".to_string(),
            ));
        }
        let provider = ctx.services.search.as_ref().ok_or_else(|| {
            ToolError::NotConfigured("search provider not configured".to_string())
        })?;
        let limit = ctx.services.num_results;
        info!(
            "web search (chat_id={}, provider={}, query_len={}, limit={})",
            ctx.chat_id,
            provider.name(),
            query.len(),
            limit
        );
        let results = provider.search(query, limit).await?;
        serde_json::to_value(results).map_err(|err| ToolError::ExecutionFailed(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::SearchWebTool;
    use crate::{SearchProvider, SearchResult, Tool, ToolContext, TurnServices};
    use async_trait::async_trait;
    use deepsearch_protocol::ToolError;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;

    #[derive(Default)]
    struct RecordingSearch {
        last: Mutex<Option<(String, usize)>>,
    }

    #[async_trait]
    impl SearchProvider for RecordingSearch {
        fn name(&self) -> &str {
            "recording"
        }

        async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>, ToolError> {
            *self.last.lock() = Some((query.to_string(), limit));
            Ok(vec![SearchResult {
                title: "Rust".to_string(),
                link: "https://www.rust-lang.org".to_string(),
                snippet: "A language".to_string(),
            }])
        }
    }

    fn context(search: Option<Arc<dyn SearchProvider>>) -> ToolContext {
        let services = TurnServices {
            search,
            num_results: 7,
            ..TurnServices::default()
        };
        ToolContext::new("chat", "user", Arc::new(services))
    }

    #[tokio::test]
    async fn rejects_empty_query() {
        let err = SearchWebTool
            .call(&context(None), json!({ "query": "  " }))
            .await
            .expect_err("empty query");
        let ToolError::InvalidArguments(message) = err else {
            panic!("expected invalid arguments");
        };
        assert_eq!(message, "query cannot be empty");
    }

    #[tokio::test]
    async fn rejects_missing_query_field() {
        let err = SearchWebTool
            .call(&context(None), json!({ "q": "rust" }))
            .await
            .expect_err("missing field");
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn errors_without_provider() {
        let err = SearchWebTool
            .call(&context(None), json!({ "query": "rust" }))
            .await
            .expect_err("missing provider");
        let ToolError::NotConfigured(message) = err else {
            panic!("expected not configured");
        };
        assert_eq!(message, "search provider not configured");
    }

    #[tokio::test]
    async fn returns_results_as_array_with_configured_limit() {
        let provider = Arc::new(RecordingSearch::default());
        let result = SearchWebTool
            .call(&context(Some(provider.clone())), json!({ "query": " rust " }))
            .await
            .expect("search");

        assert_eq!(
            result,
            json!([{
                "title": "Rust",
                "link": "https://www.rust-lang.org",
                "snippet": "A language"
            }])
        );
        assert_eq!(
            provider.last.lock().clone(),
            Some(("rust".to_string(), 7))
        );
    }
}
