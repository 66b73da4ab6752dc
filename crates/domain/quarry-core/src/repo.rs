use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

/// Locally-hosted artifact storage controlled by this server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedRepository {
    pub id: String,
    pub root: Utf8PathBuf,
}

impl ManagedRepository {
    pub fn new(id: impl Into<String>, root: impl AsRef<Utf8Path>) -> Self {
        Self {
            id: id.into(),
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Absolute on-disk location for a normalized relative path.
    pub fn storage_path(&self, rel_path: &str) -> Utf8PathBuf {
        self.root.join(rel_path)
    }

    /// Scratch area for in-flight downloads, inside the same filesystem
    /// as the destination so the final rename stays atomic.
    pub fn work_dir(&self) -> Utf8PathBuf {
        self.root.join(".quarry-tmp")
    }
}

/// Basic-auth credentials for an upstream repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteAuth {
    pub username: String,
    pub password: String,
}

/// Outbound proxy server used to reach an upstream repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxySettings {
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Upstream repository descriptor. Read-only during proxy operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteRepository {
    pub id: String,
    pub url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default)]
    pub auth: Option<RemoteAuth>,
    #[serde(default)]
    pub proxy: Option<ProxySettings>,
}

impl RemoteRepository {
    /// Full remote URL for a relative artifact path. Used for logging and
    /// as the failure-cache key, so it must be stable for a given path.
    pub fn url_of(&self, rel_path: &str) -> String {
        let base = self.url.trim_end_matches('/');
        format!("{base}/{rel_path}")
    }
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_connect_timeout_secs() -> u64 {
    10
}
