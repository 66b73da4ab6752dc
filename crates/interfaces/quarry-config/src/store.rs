use crate::model::{load, Configuration};
use crate::ConfigError;
use camino::Utf8Path;
use std::sync::{Arc, RwLock};

/// Read-mostly holder for the active configuration. Components keep the
/// store and take a snapshot per request; `reload_from` swaps the whole
/// configuration atomically on an explicit change notification.
pub struct ConfigStore {
    inner: RwLock<Arc<Configuration>>,
}

impl ConfigStore {
    pub fn new(config: Configuration) -> Self {
        Self {
            inner: RwLock::new(Arc::new(config)),
        }
    }

    pub fn current(&self) -> Arc<Configuration> {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn replace(&self, config: Configuration) {
        let next = Arc::new(config);
        match self.inner.write() {
            Ok(mut guard) => *guard = next,
            Err(mut poisoned) => **poisoned.get_mut() = next,
        }
    }

    pub fn reload_from(&self, path: &Utf8Path) -> Result<(), ConfigError> {
        let config = load(path)?;
        self.replace(config);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_swaps_snapshot() {
        let store = ConfigStore::new(Configuration::default());
        let before = store.current();
        assert!(before.managed_repositories.is_empty());

        let mut next = Configuration::default();
        next.failure_cache_ttl_secs = 42;
        store.replace(next);

        assert_eq!(store.current().failure_cache_ttl_secs, 42);
        // Old snapshots stay valid for in-flight requests.
        assert_eq!(before.failure_cache_ttl_secs, crate::DEFAULT_FAILURE_CACHE_TTL_SECS);
    }
}
