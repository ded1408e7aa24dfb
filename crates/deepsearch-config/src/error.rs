//! Config errors.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors returned while loading or validating config.
///
/// Every variant names the file or layer it came from so startup failures
/// point at the offending source.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {label} as JSON5: {source}")]
    Parse {
        label: String,
        #[source]
        source: json5::Error,
    },
    #[error("{label} does not match the config shape: {source}")]
    Decode {
        label: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config at {path}: {message}")]
    InvalidField { path: String, message: String },
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub(crate) fn read(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }
}
