use crate::{ConfigError, DEFAULT_FAILURE_CACHE_TTL_SECS};
use camino::Utf8Path;
use quarry_core::{ManagedRepository, RemoteRepository, RepositoryConnector, UpdateSetting};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Configuration {
    pub managed_repositories: Vec<ManagedRepository>,
    pub remote_repositories: Vec<RemoteRepository>,
    pub connectors: Vec<RepositoryConnector>,
    pub failure_cache_ttl_secs: u64,
    /// Listener ids to activate from the registry at startup.
    pub listeners: Vec<String>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            managed_repositories: Vec::new(),
            remote_repositories: Vec::new(),
            connectors: Vec::new(),
            failure_cache_ttl_secs: DEFAULT_FAILURE_CACHE_TTL_SECS,
            listeners: Vec::new(),
        }
    }
}

impl Configuration {
    pub fn managed(&self, id: &str) -> Option<&ManagedRepository> {
        self.managed_repositories.iter().find(|r| r.id == id)
    }

    pub fn remote(&self, id: &str) -> Option<&RemoteRepository> {
        self.remote_repositories.iter().find(|r| r.id == id)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut managed_ids = HashSet::new();
        for repo in &self.managed_repositories {
            if repo.id.is_empty() || repo.root.as_str().is_empty() {
                return Err(ConfigError::InvalidValue(format!(
                    "managed repository {:?} needs an id and a root",
                    repo.id
                )));
            }
            if !managed_ids.insert(repo.id.as_str()) {
                return Err(ConfigError::DuplicateId(repo.id.clone()));
            }
        }

        let mut remote_ids = HashSet::new();
        for repo in &self.remote_repositories {
            if !remote_ids.insert(repo.id.as_str()) {
                return Err(ConfigError::DuplicateId(repo.id.clone()));
            }
        }

        for connector in &self.connectors {
            if !managed_ids.contains(connector.managed_id.as_str()) {
                return Err(ConfigError::UnknownReference(connector.managed_id.clone()));
            }
            if !remote_ids.contains(connector.remote_id.as_str()) {
                return Err(ConfigError::UnknownReference(connector.remote_id.clone()));
            }
            for pattern in connector.blacklist.iter().chain(connector.whitelist.iter()) {
                glob::Pattern::new(pattern).map_err(|e| ConfigError::InvalidPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })?;
            }
            for setting in [connector.policies.releases, connector.policies.snapshots] {
                if let UpdateSetting::Interval { minutes: 0 } = setting {
                    return Err(ConfigError::InvalidValue(
                        "interval update policy needs minutes > 0".into(),
                    ));
                }
            }
        }

        if self.failure_cache_ttl_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "failureCacheTtlSecs must be > 0".into(),
            ));
        }

        Ok(())
    }
}

/// Read and validate a configuration file.
pub fn load(path: &Utf8Path) -> Result<Configuration, ConfigError> {
    let data = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let config: Configuration = serde_json::from_str(&data).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;
    config.validate()?;
    Ok(config)
}
