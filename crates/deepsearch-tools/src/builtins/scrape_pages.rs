//! `scrapePages` tool.

use crate::builtins::utils::{dedup_preserving_order, parse_args};
use crate::web::BulkScrapeResult;
use crate::{Tool, ToolContext};
use async_trait::async_trait;
use deepsearch_protocol::ToolError;
use log::info;
use serde::Deserialize;
use serde_json::{Value, json};

/// Tool that fetches several pages and returns their text.
#[derive(Debug, Default)]
pub struct ScrapePagesTool;

#[derive(Debug, Deserialize)]
struct ScrapePagesArgs {
    urls: Vec<String>,
}

#[async_trait]
impl Tool for ScrapePagesTool {
    fn name(&self) -> &str {
        "scrapePages"
    }

    fn description(&self) -> &str {
        "Fetch web pages and return their readable text. Use it on links from searchWeb to read full articles."
    }

    fn args_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "urls": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Absolute http(s) URLs to fetch."
                }
            },
            "required": ["urls"]
        })
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<Value, ToolError> {
        let input: ScrapePagesArgs = parse_args(args)?;
        let urls = dedup_preserving_order(
            input
                .urls
                .into_iter()
                .map(|url| url.trim().to_string())
                .filter(|url| !url.is_empty()),
        );
        if urls.is_empty() {
            return Err(ToolError::InvalidArguments(
                "urls cannot be empty".to_string(),
            ));
        }
        let max_urls = ctx.services.max_scrape_urls;
        if urls.len() > max_urls {
            return Err(ToolError::InvalidArguments(format!(
                "at most {max_urls} urls per call"
            )));
        }
        let scraper = ctx
            .services
            .scraper
            .as_ref()
            .ok_or_else(|| ToolError::NotConfigured("page scraper not configured".to_string()))?;
        info!(
            "scraping pages (chat_id={}, count={})",
            ctx.chat_id,
            urls.len()
        );
        let pages = scraper.scrape(&urls).await?;
        let result = BulkScrapeResult::from_pages(pages);
        serde_json::to_value(result).map_err(|err| ToolError::ExecutionFailed(err.to_string()))
    }
}
