//! Configuration surface for the proxy core: file model, validation, and
//! the reloadable store handed to long-running components.

pub mod model;
pub mod store;

pub use model::{load, Configuration};
pub use store::ConfigStore;

/// Default sliding TTL for remembered remote failures.
pub const DEFAULT_FAILURE_CACHE_TTL_SECS: u64 = 3600;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read configuration {path}: {source}")]
    Io {
        path: camino::Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse configuration {path}: {source}")]
    Parse {
        path: camino::Utf8PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("duplicate repository id: {0}")]
    DuplicateId(String),
    #[error("connector references unknown repository {0}")]
    UnknownReference(String),
    #[error("invalid filter pattern {pattern}: {reason}")]
    InvalidPattern { pattern: String, reason: String },
    #[error("invalid configuration value: {0}")]
    InvalidValue(String),
}
