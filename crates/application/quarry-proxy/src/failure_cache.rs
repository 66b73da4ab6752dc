use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Remembers remote URLs that recently failed so connectors can skip
/// repeated futile requests. Expiry is a sliding window: consulting a
/// live entry refreshes its timestamp, and an expired entry is forgotten
/// on the next lookup. Safe for concurrent in-flight requests; nothing
/// is persisted across restarts.
pub struct UrlFailureCache {
    ttl: Duration,
    entries: DashMap<String, Instant>,
}

impl UrlFailureCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
        }
    }

    pub fn cache_failure(&self, url: &str) {
        self.entries.insert(url.to_string(), Instant::now());
    }

    /// True when a non-expired failure is on record for `url`; refreshes
    /// the expiry window as a side effect.
    pub fn has_failed_before(&self, url: &str) -> bool {
        if let Some(mut entry) = self.entries.get_mut(url) {
            if entry.elapsed() < self.ttl {
                *entry = Instant::now();
                return true;
            }
        }
        self.entries.remove(url);
        false
    }
}
