use crate::error::TransportError;
use crate::file::FileTransport;
use crate::http::HttpTransport;
use crate::Transport;
use camino::Utf8PathBuf;
use quarry_core::RemoteRepository;
use reqwest::Url;
use std::time::Duration;

/// Produces a transport handle for a remote repository's protocol. Every
/// call returns an independent handle configured with that remote's
/// timeouts, proxy, and credentials.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransportFactory;

impl TransportFactory {
    pub fn new() -> Self {
        Self
    }

    pub fn connect(&self, remote: &RemoteRepository) -> Result<Box<dyn Transport>, TransportError> {
        let url = Url::parse(&remote.url).map_err(|e| TransportError::InvalidRemote {
            url: remote.url.clone(),
            reason: e.to_string(),
        })?;

        match url.scheme() {
            "http" | "https" => {
                let client = build_client(remote)?;
                Ok(Box::new(HttpTransport::new(client, url, remote.auth.clone())))
            }
            "file" => {
                let path = url
                    .to_file_path()
                    .ok()
                    .and_then(|p| Utf8PathBuf::from_path_buf(p).ok())
                    .ok_or_else(|| TransportError::InvalidRemote {
                        url: remote.url.clone(),
                        reason: "file url is not a usable local path".into(),
                    })?;
                Ok(Box::new(FileTransport::new(path)))
            }
            other => Err(TransportError::InvalidRemote {
                url: remote.url.clone(),
                reason: format!("unsupported protocol {other}"),
            }),
        }
    }
}

fn build_client(remote: &RemoteRepository) -> Result<reqwest::Client, TransportError> {
    let mut builder = reqwest::Client::builder()
        .timeout(Duration::from_secs(remote.timeout_secs))
        .connect_timeout(Duration::from_secs(remote.connect_timeout_secs));

    if let Some(proxy_cfg) = &remote.proxy {
        let mut proxy =
            reqwest::Proxy::all(&proxy_cfg.url).map_err(|e| TransportError::InvalidRemote {
                url: proxy_cfg.url.clone(),
                reason: e.to_string(),
            })?;
        if let (Some(user), Some(pass)) = (&proxy_cfg.username, &proxy_cfg.password) {
            proxy = proxy.basic_auth(user, pass);
        }
        builder = builder.proxy(proxy);
    }

    builder.build().map_err(|e| TransportError::InvalidRemote {
        url: remote.url.clone(),
        reason: e.to_string(),
    })
}
