use anyhow::{anyhow, Context, Result};
use camino::Utf8PathBuf;
use quarry_config::{ConfigStore, Configuration};
use quarry_core::{ManagedRepository, Maven2Layout};
use quarry_proxy::{
    ListenerRegistry, LoggingListener, RepositoryProxy, RequestContext, TracingAuditLog,
    UrlFailureCache,
};
use quarry_transport::TransportFactory;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Explicit composition root: every collaborator is constructed here and
/// handed to the proxy by reference.
fn build_proxy(config: &Configuration) -> RepositoryProxy {
    let failure_cache = Arc::new(UrlFailureCache::new(Duration::from_secs(
        config.failure_cache_ttl_secs,
    )));

    let mut listeners = ListenerRegistry::new();
    for id in &config.listeners {
        match id.as_str() {
            "artifact-log" => listeners.register(id.clone(), Arc::new(LoggingListener)),
            other => warn!("no listener registered under id {other}, skipping"),
        }
    }

    let proxy = RepositoryProxy::new(
        Arc::new(Maven2Layout),
        Box::new(TransportFactory::new()),
        failure_cache,
        listeners,
        Arc::new(TracingAuditLog),
    );
    proxy.reconfigure(
        config.remote_repositories.clone(),
        config.connectors.clone(),
    );
    proxy
}

fn load_store(path: &Utf8PathBuf) -> Result<ConfigStore> {
    let config = quarry_config::load(path)
        .with_context(|| format!("failed to load configuration {path}"))?;
    Ok(ConfigStore::new(config))
}

fn managed_repo(config: &Configuration, id: &str) -> Result<ManagedRepository> {
    config
        .managed(id)
        .cloned()
        .ok_or_else(|| anyhow!("unknown managed repository {id}"))
}

pub async fn cmd_resolve(
    config_path: Utf8PathBuf,
    repo_id: String,
    paths: Vec<String>,
    force: bool,
    user: String,
) -> Result<()> {
    let store = load_store(&config_path)?;
    let config = store.current();
    let repo = managed_repo(&config, &repo_id)?;
    let proxy = build_proxy(&config);

    let ctx = RequestContext {
        user,
        remote_addr: None,
    };

    let mut failures = 0usize;
    for path in &paths {
        let result = if force {
            proxy.get_always(&repo, path, &ctx).await
        } else {
            proxy.get(&repo, path, &ctx).await
        };
        match result {
            Ok(resolved) => {
                let origin = match &resolved.fetched_from {
                    Some(remote) => format!("fetched from {remote}"),
                    None => "cached".to_string(),
                };
                println!(":: {path} -> {} ({origin})", resolved.path);
            }
            Err(e) => {
                failures += 1;
                println!("!! {path}: {e}");
            }
        }
    }

    if failures > 0 {
        return Err(anyhow!("{failures} of {} paths failed to resolve", paths.len()));
    }
    Ok(())
}

pub async fn cmd_remove(
    config_path: Utf8PathBuf,
    repo_id: String,
    paths: Vec<String>,
    user: String,
) -> Result<()> {
    let store = load_store(&config_path)?;
    let config = store.current();
    let repo = managed_repo(&config, &repo_id)?;
    let proxy = build_proxy(&config);

    let ctx = RequestContext {
        user,
        remote_addr: None,
    };

    for path in &paths {
        proxy
            .remove(&repo, path, &ctx)
            .await
            .with_context(|| format!("failed to remove {path}"))?;
        println!(":: Removed {path} from {repo_id}");
    }
    Ok(())
}

pub fn cmd_check_config(config_path: Utf8PathBuf) -> Result<()> {
    let store = load_store(&config_path)?;
    let config = store.current();
    println!(":: Configuration OK");
    println!("   Managed repositories: {}", config.managed_repositories.len());
    println!("   Remote repositories:  {}", config.remote_repositories.len());
    println!("   Connectors:           {}", config.connectors.len());
    println!("   Failure cache TTL:    {}s", config.failure_cache_ttl_secs);
    Ok(())
}
