//! System prompt assembly.

use chrono::{DateTime, Utc};
use deepsearch_config::ModelConfig;

const DEFAULT_INSTRUCTIONS: &str = "\
You are a research assistant with access to web search and page scraping tools.

- Use searchWeb to find sources for any question that depends on current or factual information.
- Use scrapePages on the most relevant links when snippets are not enough to answer well.
- Prefer several targeted searches over one broad one.
- Cite every claim taken from a source with an inline markdown link, e.g. [Example](https://example.com).
- If the sources disagree or are missing, say so instead of guessing.";

/// Build the system prompt for a turn; a configured prompt replaces the default
/// instructions and the current date is always appended.
pub fn system_prompt(config: &ModelConfig, now: DateTime<Utc>) -> String {
    let instructions = config
        .system_prompt
        .as_deref()
        .map(str::trim)
        .filter(|prompt| !prompt.is_empty())
        .unwrap_or(DEFAULT_INSTRUCTIONS);
    format!(
        "{instructions}\n\nThe current date is {}.",
        now.format("%Y-%m-%d")
    )
}
