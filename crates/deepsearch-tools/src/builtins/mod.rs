//! Built-in research tools.

mod scrape_pages;
mod search_web;
mod utils;

use crate::ToolRegistry;
use log::info;
use std::sync::Arc;

pub use scrape_pages::ScrapePagesTool;
pub use search_web::SearchWebTool;

/// Register all built-in tools with the provided registry.
pub fn register_builtin_tools(registry: &ToolRegistry) {
    registry.register(Arc::new(SearchWebTool));
    registry.register(Arc::new(ScrapePagesTool));
    info!("registered built-in tools");
}

/// Build a registry pre-populated with built-in tools.
pub fn builtin_tool_registry() -> ToolRegistry {
    let registry = ToolRegistry::new();
    register_builtin_tools(&registry);
    registry
}
