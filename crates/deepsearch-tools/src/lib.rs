//! Tooling interfaces, providers and built-in tools for DeepSearch.

pub mod adaptor;
pub mod builtins;
pub mod cache;
pub mod context;
pub mod output_policy;
pub mod registry;
pub mod scraper;
pub mod serper;
pub mod tool;
pub mod web;

/// LLM function-definition helpers.
pub use adaptor::{registry_to_llm_tools, spec_to_llm_tool};
/// Built-in tool registry and registration helper.
pub use builtins::{ScrapePagesTool, SearchWebTool, builtin_tool_registry, register_builtin_tools};
/// Cache seam and caching scraper.
pub use cache::{CacheStore, CachedPageScraper, MemoryCacheStore, scrape_cache_key};
/// Tool context types.
pub use context::{ToolContext, TurnServices, tool_error_value};
/// Tool output policy.
pub use output_policy::ToolOutputPolicy;
/// Tool registry type.
pub use registry::ToolRegistry;
/// HTTP page scraper.
pub use scraper::HttpPageScraper;
/// Serper search provider.
pub use serper::SerperSearchProvider;
/// Tool trait and spec type.
pub use tool::{Tool, ToolSpec};
/// Search and scrape provider types.
pub use web::{BulkScrapeResult, PageScrape, PageScraper, SearchProvider, SearchResult};
