use camino::Utf8PathBuf;

/// Transport failures, split the way the resolution loop needs them:
/// not-found lets the next connector run silently, auth and generic
/// transport errors are subject to the connector's error policy.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("resource not found: {url}")]
    NotFound { url: String },
    #[error("authorization failed for {url} (status {status})")]
    Auth { url: String, status: u16 },
    #[error("timed out fetching {url}")]
    Timeout { url: String },
    #[error("remote returned status {status} for {url}")]
    Status { url: String, status: u16 },
    #[error("transfer failed for {url}: {reason}")]
    Transfer { url: String, reason: String },
    #[error("unsupported or invalid remote url {url}: {reason}")]
    InvalidRemote { url: String, reason: String },
    #[error("io error on {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TransportError {
    /// True when the remote definitively does not have the resource, as
    /// opposed to failing to answer.
    pub fn is_not_found(&self) -> bool {
        matches!(self, TransportError::NotFound { .. })
    }
}
