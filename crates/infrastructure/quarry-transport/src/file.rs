use crate::error::TransportError;
use crate::Transport;
use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};

/// Transport for `file://` remotes, typically a mounted mirror.
#[derive(Debug)]
pub struct FileTransport {
    base: Utf8PathBuf,
}

impl FileTransport {
    pub fn new(base: Utf8PathBuf) -> Self {
        Self { base }
    }
}

#[async_trait]
impl Transport for FileTransport {
    async fn fetch(&self, remote_path: &str, dest: &Utf8Path) -> Result<u64, TransportError> {
        let source = self.base.join(remote_path);
        let url = format!("file://{source}");
        if !source.is_file() {
            return Err(TransportError::NotFound { url });
        }
        tokio::fs::copy(source.as_std_path(), dest.as_std_path())
            .await
            .map_err(|e| TransportError::Io {
                path: dest.to_path_buf(),
                source: e,
            })
    }
}
