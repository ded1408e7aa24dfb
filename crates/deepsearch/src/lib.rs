//! Public SDK surface for DeepSearch.
//!
//! This crate re-exports the workspace building blocks and provides a small
//! initialization helper to keep consumer setup consistent.

/// Re-export for convenience.
pub use deepsearch_config as config;
pub use deepsearch_core as core;
/// Re-export for convenience.
pub use deepsearch_protocol as protocol;
/// Re-export for convenience.
pub use deepsearch_server as server;
pub use deepsearch_tools as tools;

#[inline]
/// Initialize logging using env_logger if the "logging" feature is enabled.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging() {
    #[cfg(feature = "logging")]
    {
        let _ = env_logger::builder()
            .format_timestamp_millis()
            .parse_default_env()
            .try_init();
    }
}
