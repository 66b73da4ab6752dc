use quarry_core::ManagedRepository;
use std::sync::Arc;
use tracing::{info, warn};

/// Observer of artifact lifecycle changes in managed storage. Listeners
/// run synchronously after a successful commit and see already-durable
/// state; their failures never affect the committed file.
pub trait RepositoryListener: Send + Sync {
    fn artifact_added(&self, repository: &ManagedRepository, path: &str) -> Result<(), String>;
    fn artifact_removed(&self, repository: &ManagedRepository, path: &str) -> Result<(), String>;
}

/// Explicit listener registry, keyed by a stable id and populated once
/// at startup from configuration.
#[derive(Default)]
pub struct ListenerRegistry {
    entries: Vec<(String, Arc<dyn RepositoryListener>)>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, id: impl Into<String>, listener: Arc<dyn RepositoryListener>) {
        self.entries.push((id.into(), listener));
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(id, _)| id.as_str())
    }

    pub fn notify_added(&self, repository: &ManagedRepository, path: &str) {
        for (id, listener) in &self.entries {
            if let Err(e) = listener.artifact_added(repository, path) {
                warn!("listener {id} failed on add of {path}: {e}");
            }
        }
    }

    pub fn notify_removed(&self, repository: &ManagedRepository, path: &str) {
        for (id, listener) in &self.entries {
            if let Err(e) = listener.artifact_removed(repository, path) {
                warn!("listener {id} failed on remove of {path}: {e}");
            }
        }
    }
}

/// Built-in listener that records artifact lifecycle changes in the log.
#[derive(Debug, Default)]
pub struct LoggingListener;

impl RepositoryListener for LoggingListener {
    fn artifact_added(&self, repository: &ManagedRepository, path: &str) -> Result<(), String> {
        info!("artifact added to {}: {path}", repository.id);
        Ok(())
    }

    fn artifact_removed(&self, repository: &ManagedRepository, path: &str) -> Result<(), String> {
        info!("artifact removed from {}: {path}", repository.id);
        Ok(())
    }
}
