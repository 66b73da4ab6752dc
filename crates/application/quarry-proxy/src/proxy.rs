use crate::audit::{AuditAction, AuditEvent, AuditLog};
use crate::events::ListenerRegistry;
use crate::failure_cache::UrlFailureCache;
use crate::policy::{apply_checksum_policy, update_decision, ChecksumOutcome, PolicyDecision};
use crate::{ProxyError, RequestContext, ResolvedArtifact};
use camino::{Utf8Path, Utf8PathBuf};
use chrono::Utc;
use dashmap::DashMap;
use quarry_core::path_utils::RepoPath;
use quarry_core::{
    sorted_connectors, ChecksumSetting, ErrorSetting, ManagedRepository, RemoteRepository,
    RepositoryConnector, RepositoryLayout,
};
use quarry_storage::{read_digest_file, Algorithm, FsTransaction, StorageError};
use quarry_transport::{Transport, TransportError, TransportProvider};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::SystemTime;
use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Connector wiring currently in force, swapped wholesale on
/// configuration reload.
#[derive(Default)]
struct Bindings {
    remotes: HashMap<String, RemoteRepository>,
    connectors: Vec<RepositoryConnector>,
}

/// The resolution coordinator. Given a requested path and a managed
/// repository it walks the repository's enabled connectors in priority
/// order, applies each connector's policies, downloads through the
/// transport layer, and commits the result into managed storage before
/// the caller sees it.
pub struct RepositoryProxy {
    layout: Arc<dyn RepositoryLayout>,
    transports: Box<dyn TransportProvider>,
    failure_cache: Arc<UrlFailureCache>,
    listeners: ListenerRegistry,
    audit: Arc<dyn AuditLog>,
    bindings: RwLock<Arc<Bindings>>,
    // One lock per destination path keeps concurrent requests for the
    // same artifact from racing on fetch+commit; unrelated paths stay
    // parallel.
    locks: DashMap<Utf8PathBuf, Arc<Mutex<()>>>,
}

impl RepositoryProxy {
    pub fn new(
        layout: Arc<dyn RepositoryLayout>,
        transports: Box<dyn TransportProvider>,
        failure_cache: Arc<UrlFailureCache>,
        listeners: ListenerRegistry,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        Self {
            layout,
            transports,
            failure_cache,
            listeners,
            audit,
            bindings: RwLock::new(Arc::new(Bindings::default())),
            locks: DashMap::new(),
        }
    }

    /// Install a new set of remotes and connectors. In-flight requests
    /// finish against the bindings they started with.
    pub fn reconfigure(
        &self,
        remotes: Vec<RemoteRepository>,
        connectors: Vec<RepositoryConnector>,
    ) {
        let next = Arc::new(Bindings {
            remotes: remotes.into_iter().map(|r| (r.id.clone(), r)).collect(),
            connectors,
        });
        match self.bindings.write() {
            Ok(mut guard) => *guard = next,
            Err(mut poisoned) => **poisoned.get_mut() = next,
        }
    }

    fn bindings(&self) -> Arc<Bindings> {
        match self.bindings.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn lock_for(&self, dest: &Utf8Path) -> Arc<Mutex<()>> {
        self.locks
            .entry(dest.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Resolve a path, honoring each connector's staleness policy. A
    /// cached copy that every connector considers fresh is returned
    /// without touching the network.
    pub async fn get(
        &self,
        repo: &ManagedRepository,
        path: &str,
        ctx: &RequestContext,
    ) -> Result<ResolvedArtifact, ProxyError> {
        self.resolve(repo, path, ctx, false).await
    }

    /// Resolve a path, forcing a remote check across all connectors
    /// regardless of staleness policies. Writes through to the same
    /// local cache path as `get`.
    pub async fn get_always(
        &self,
        repo: &ManagedRepository,
        path: &str,
        ctx: &RequestContext,
    ) -> Result<ResolvedArtifact, ProxyError> {
        self.resolve(repo, path, ctx, true).await
    }

    /// Transactionally remove an artifact and its checksum companions
    /// from managed storage, with audit and listener dispatch.
    pub async fn remove(
        &self,
        repo: &ManagedRepository,
        path: &str,
        ctx: &RequestContext,
    ) -> Result<(), ProxyError> {
        let rel = self.checked_path(path)?;
        let dest = repo.storage_path(&rel);
        let lock = self.lock_for(&dest);
        let _guard = lock.lock().await;

        if !dest.is_file() {
            return Err(ProxyError::NotFound { path: rel });
        }

        let mut txn = FsTransaction::new();
        txn.delete_file(dest.clone());
        for algo in Algorithm::ALL {
            txn.delete_file(algo.companion_path(&dest));
        }
        txn.commit()?;

        self.audit.record(&AuditEvent {
            repository_id: repo.id.clone(),
            user: ctx.user.clone(),
            remote_addr: ctx.remote_addr.clone(),
            resource: rel.clone(),
            action: AuditAction::RemoveFile,
            timestamp: Utc::now(),
        });
        self.listeners.notify_removed(repo, &rel);
        Ok(())
    }

    fn checked_path(&self, path: &str) -> Result<String, ProxyError> {
        let rel = RepoPath::normalize(path);
        if rel.is_empty() || !RepoPath::verify_safe(&rel) {
            return Err(ProxyError::InvalidPath {
                path: path.to_string(),
            });
        }
        Ok(rel)
    }

    async fn resolve(
        &self,
        repo: &ManagedRepository,
        path: &str,
        ctx: &RequestContext,
        force: bool,
    ) -> Result<ResolvedArtifact, ProxyError> {
        let rel = self.checked_path(path)?;

        // Checksum companions ride along with their artifact: resolving
        // the artifact writes verified companions locally, so answer
        // companion requests from those instead of proxying them raw.
        let (base, companion) = RepoPath::split_companion(&rel);
        if companion.is_some() {
            let base = base.to_string();
            let fetched_from = match self.resolve_path(repo, &base, ctx, force).await {
                Ok(resolved) => resolved.fetched_from,
                Err(ProxyError::NotFound { .. }) => None,
                Err(e) => return Err(e),
            };
            let dest = repo.storage_path(&rel);
            if dest.is_file() {
                return Ok(ResolvedArtifact {
                    path: dest,
                    fetched_from,
                });
            }
            return Err(ProxyError::NotFound { path: rel });
        }

        self.resolve_path(repo, &rel, ctx, force).await
    }

    async fn resolve_path(
        &self,
        repo: &ManagedRepository,
        rel: &str,
        ctx: &RequestContext,
        force: bool,
    ) -> Result<ResolvedArtifact, ProxyError> {
        let dest = repo.storage_path(rel);
        let bindings = self.bindings();
        let connectors = sorted_connectors(
            bindings
                .connectors
                .iter()
                .filter(|c| c.managed_id == repo.id && c.is_enabled()),
        );

        let is_snapshot = self
            .layout
            .parse(rel)
            .map(|a| a.is_snapshot())
            .unwrap_or(false);

        let lock = self.lock_for(&dest);
        let _guard = lock.lock().await;
        let local_exists = dest.is_file();

        for connector in connectors {
            if connector.is_path_blocked(rel) {
                debug!("connector {} blocks {rel}", connector.remote_id);
                continue;
            }

            if !force {
                let setting = if is_snapshot {
                    connector.policies.snapshots
                } else {
                    connector.policies.releases
                };
                let last_check = if local_exists { file_mtime(&dest) } else { None };
                if update_decision(setting, last_check, SystemTime::now()) == PolicyDecision::Skip
                {
                    debug!("connector {} considers {rel} fresh", connector.remote_id);
                    continue;
                }
            }

            let Some(remote) = bindings.remotes.get(&connector.remote_id) else {
                warn!("connector references unknown remote {}", connector.remote_id);
                continue;
            };

            let url = remote.url_of(rel);
            if connector.policies.cache_failures && self.failure_cache.has_failed_before(&url) {
                debug!("skipping {url}: recent failure on record");
                continue;
            }

            match self
                .fetch_via(repo, remote, connector, rel, &dest, ctx, local_exists)
                .await
            {
                Ok(resolved) => return Ok(resolved),
                Err(ConnectorOutcome::NotFound) => {
                    debug!("{url} not found, trying next connector");
                }
                Err(ConnectorOutcome::Rejected) => {
                    debug!("{url} rejected by checksum policy, trying next connector");
                }
                Err(ConnectorOutcome::Transport(e)) => {
                    if connector.policies.cache_failures {
                        self.failure_cache.cache_failure(&url);
                    }
                    match connector.policies.on_error {
                        ErrorSetting::Stop => {
                            return Err(ProxyError::Remote {
                                remote: remote.id.clone(),
                                source: e,
                            });
                        }
                        ErrorSetting::Continue => {
                            warn!("remote {} failed for {rel}: {e}, continuing", remote.id);
                        }
                    }
                }
                Err(ConnectorOutcome::Fatal(e)) => return Err(e),
            }
        }

        if dest.is_file() {
            return Ok(ResolvedArtifact {
                path: dest,
                fetched_from: None,
            });
        }
        Err(ProxyError::NotFound {
            path: rel.to_string(),
        })
    }

    /// One connector's attempt: download to scratch, verify against the
    /// remote's checksum companions, commit transactionally, then fan
    /// out audit and listener notifications.
    #[allow(clippy::too_many_arguments)]
    async fn fetch_via(
        &self,
        repo: &ManagedRepository,
        remote: &RemoteRepository,
        connector: &RepositoryConnector,
        rel: &str,
        dest: &Utf8Path,
        ctx: &RequestContext,
        local_exists: bool,
    ) -> Result<ResolvedArtifact, ConnectorOutcome> {
        let work_dir = repo.work_dir();
        tokio::fs::create_dir_all(work_dir.as_std_path())
            .await
            .map_err(|e| fatal_io(&work_dir, e))?;

        let transport = self
            .transports
            .connect(remote)
            .map_err(ConnectorOutcome::Transport)?;

        let (_scratch, scratch_path) =
            scratch_file(&work_dir).map_err(ConnectorOutcome::Fatal)?;
        let bytes = match transport.fetch(rel, &scratch_path).await {
            Ok(n) => n,
            Err(e) if e.is_not_found() => return Err(ConnectorOutcome::NotFound),
            Err(e) => return Err(ConnectorOutcome::Transport(e)),
        };
        debug!("downloaded {bytes} bytes from {}", remote.url_of(rel));

        let mut expected = Vec::new();
        if connector.policies.checksum != ChecksumSetting::Ignore {
            for algo in Algorithm::ALL {
                let companion_rel = format!("{rel}.{}", algo.extension());
                let (_ctmp, ctmp_path) =
                    scratch_file(&work_dir).map_err(ConnectorOutcome::Fatal)?;
                match transport.fetch(&companion_rel, &ctmp_path).await {
                    Ok(_) => match read_digest_file(algo, &ctmp_path) {
                        Ok(digest) => expected.push((algo, digest)),
                        Err(e) => warn!("unusable {algo} companion for {rel}: {e}"),
                    },
                    Err(e) if e.is_not_found() => {
                        debug!("no {algo} companion for {rel} on {}", remote.id);
                    }
                    Err(e) => warn!("failed to fetch {algo} companion for {rel}: {e}"),
                }
            }
        }

        match apply_checksum_policy(connector.policies.checksum, &scratch_path, &expected) {
            Ok(ChecksumOutcome::Accepted) => {}
            Ok(ChecksumOutcome::Rejected) => return Err(ConnectorOutcome::Rejected),
            Err(e) => return Err(ConnectorOutcome::Fatal(ProxyError::Transaction(e))),
        }

        let mut txn = FsTransaction::new();
        txn.copy_file(scratch_path.clone(), dest.to_path_buf(), &Algorithm::ALL);
        txn.commit()
            .map_err(|e| ConnectorOutcome::Fatal(ProxyError::Transaction(e)))?;

        // Stamp the artifact so update policies can tell when the remote
        // was last consulted.
        let now = filetime::FileTime::from_system_time(SystemTime::now());
        if let Err(e) = filetime::set_file_mtime(dest.as_std_path(), now) {
            warn!("could not stamp {dest}: {e}");
        }

        let action = if local_exists {
            AuditAction::ModifyFile
        } else {
            AuditAction::CreateFile
        };
        self.audit.record(&AuditEvent {
            repository_id: repo.id.clone(),
            user: ctx.user.clone(),
            remote_addr: ctx.remote_addr.clone(),
            resource: rel.to_string(),
            action,
            timestamp: Utc::now(),
        });
        self.listeners.notify_added(repo, rel);

        info!("proxied {rel} into {} from {}", repo.id, remote.id);
        Ok(ResolvedArtifact {
            path: dest.to_path_buf(),
            fetched_from: Some(remote.id.clone()),
        })
    }
}

/// Why a single connector's attempt ended without a resolved artifact.
enum ConnectorOutcome {
    /// The remote definitively does not have the resource.
    NotFound,
    /// Checksum policy refused the download.
    Rejected,
    /// The remote failed to answer; error policy decides what happens.
    Transport(TransportError),
    /// Local storage failure; always surfaced immediately.
    Fatal(ProxyError),
}

fn fatal_io(path: &Utf8Path, source: std::io::Error) -> ConnectorOutcome {
    ConnectorOutcome::Fatal(ProxyError::Transaction(StorageError::io(path, source)))
}

fn scratch_file(work_dir: &Utf8Path) -> Result<(NamedTempFile, Utf8PathBuf), ProxyError> {
    let tmp = tempfile::Builder::new()
        .prefix("incoming-")
        .tempfile_in(work_dir.as_std_path())
        .map_err(|e| ProxyError::Transaction(StorageError::io(work_dir, e)))?;
    let path = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).map_err(|p| {
        ProxyError::Transaction(StorageError::io(
            work_dir,
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("non-utf8 scratch path {}", p.display()),
            ),
        ))
    })?;
    Ok((tmp, path))
}

fn file_mtime(path: &Utf8Path) -> Option<SystemTime> {
    std::fs::metadata(path.as_std_path())
        .and_then(|m| m.modified())
        .ok()
}
