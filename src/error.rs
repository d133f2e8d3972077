//! Error types for the storage and configuration layers.
//!
//! Analysis never fails: degenerate input produces a flat trend instead of
//! an error, so there is no analysis error type.

use thiserror::Error;

/// A stored dataset payload could not be understood.
///
/// Recovered inside `DurableStore::load` by treating the slot as empty.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("payload is not valid json: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("payload has no version tag")]
    MissingVersion,

    #[error("unsupported payload version '{0}'")]
    UnsupportedVersion(String),

    #[error("payload records field is not a sequence")]
    RecordsNotSequence,
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("could not determine data directory: {0}")]
    DataDir(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode value: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("seen index could not be read; refusing to overwrite it")]
    IndexUnreadable,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("dataset of {size} bytes exceeds the storage ceiling of {ceiling} bytes")]
    QuotaExceeded { size: u64, ceiling: u64 },

    #[error("failed to encode dataset: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid novelty window '{value}': {source}")]
    InvalidWindow {
        value: String,
        #[source]
        source: humantime::DurationError,
    },

    #[error("novelty window '{0}' is too large")]
    WindowOutOfRange(String),
}
