use async_trait::async_trait;
use camino::Utf8Path;

pub mod error;
pub mod factory;
pub mod file;
pub mod http;

pub use error::TransportError;
pub use factory::TransportFactory;
pub use file::FileTransport;
pub use http::HttpTransport;

/// A protocol client bound to one remote repository. Handles are
/// single-caller: the factory hands out a fresh one per request so
/// concurrent downloads never share mutable connection state.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Download `remote_path` (relative to the remote's base) into
    /// `dest`, returning the number of bytes transferred. `dest` is
    /// expected to be a scratch location owned by the caller; on failure
    /// any partial write is removed.
    async fn fetch(&self, remote_path: &str, dest: &Utf8Path) -> Result<u64, TransportError>;
}

/// Source of transport handles, the seam the resolution loop is built
/// against so tests can substitute scripted remotes.
pub trait TransportProvider: Send + Sync {
    fn connect(
        &self,
        remote: &quarry_core::RemoteRepository,
    ) -> Result<Box<dyn Transport>, TransportError>;
}

impl TransportProvider for TransportFactory {
    fn connect(
        &self,
        remote: &quarry_core::RemoteRepository,
    ) -> Result<Box<dyn Transport>, TransportError> {
        TransportFactory::connect(self, remote)
    }
}
