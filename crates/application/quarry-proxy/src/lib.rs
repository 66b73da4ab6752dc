use camino::Utf8PathBuf;
use quarry_storage::StorageError;
use quarry_transport::TransportError;

pub mod audit;
pub mod events;
pub mod failure_cache;
pub mod policy;
pub mod proxy;

pub use audit::{AuditAction, AuditEvent, AuditLog, TracingAuditLog};
pub use events::{ListenerRegistry, LoggingListener, RepositoryListener};
pub use failure_cache::UrlFailureCache;
pub use proxy::RepositoryProxy;

/// Identity of the caller on whose behalf a request runs; flows into the
/// audit trail.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub user: String,
    pub remote_addr: Option<String>,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self {
            user: "anonymous".into(),
            remote_addr: None,
        }
    }
}

/// Outcome of a successful resolution: the local file, plus the remote
/// it was fetched from when this request caused a download.
#[derive(Debug, Clone)]
pub struct ResolvedArtifact {
    pub path: Utf8PathBuf,
    pub fetched_from: Option<String>,
}

/// Terminal errors of the resolution API. Connector-local failures are
/// absorbed and retried against the next connector; what surfaces here
/// is the end of the line.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("resource does not exist: {path}")]
    NotFound { path: String },
    #[error("invalid repository path: {path}")]
    InvalidPath { path: String },
    #[error("remote {remote} failed: {source}")]
    Remote {
        remote: String,
        #[source]
        source: TransportError,
    },
    #[error("storage commit failed: {0}")]
    Transaction(#[from] StorageError),
}
