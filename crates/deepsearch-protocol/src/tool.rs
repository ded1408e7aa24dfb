/// Errors returned by tools and tool providers.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Tool name was not found in registry.
    #[error("tool not found: {0}")]
    ToolNotFound(String),
    /// Tool received invalid arguments.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    /// Tool execution failed.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),
    /// A backing provider (search, scraper, cache) is missing.
    #[error("not configured: {0}")]
    NotConfigured(String),
    /// Cache backend failed.
    #[error("cache error: {0}")]
    Cache(String),
}
