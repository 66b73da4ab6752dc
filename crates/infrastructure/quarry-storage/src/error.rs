use camino::Utf8PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("io error on {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("checksum file {path} is malformed")]
    MalformedDigestFile { path: Utf8PathBuf },
    #[error("copy source missing: {path}")]
    SourceMissing { path: Utf8PathBuf },
}

impl StorageError {
    pub fn io(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
