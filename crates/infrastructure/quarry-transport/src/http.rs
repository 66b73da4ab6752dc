use crate::error::TransportError;
use crate::Transport;
use async_trait::async_trait;
use camino::Utf8Path;
use futures::StreamExt;
use quarry_core::RemoteAuth;
use reqwest::{Client, StatusCode, Url};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

/// HTTP(S) transport handle for one remote repository.
#[derive(Debug)]
pub struct HttpTransport {
    client: Client,
    base: Url,
    auth: Option<RemoteAuth>,
}

impl HttpTransport {
    pub fn new(client: Client, base: Url, auth: Option<RemoteAuth>) -> Self {
        Self { client, base, auth }
    }

    fn resource_url(&self, remote_path: &str) -> Result<Url, TransportError> {
        let mut url = self.base.clone();
        {
            let mut segments =
                url.path_segments_mut()
                    .map_err(|()| TransportError::InvalidRemote {
                        url: self.base.to_string(),
                        reason: "cannot-be-a-base url".into(),
                    })?;
            segments.pop_if_empty();
            for part in remote_path.split('/').filter(|p| !p.is_empty()) {
                segments.push(part);
            }
        }
        Ok(url)
    }
}

fn classify_request_error(url: &Url, err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout {
            url: url.to_string(),
        }
    } else {
        TransportError::Transfer {
            url: url.to_string(),
            reason: err.to_string(),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, remote_path: &str, dest: &Utf8Path) -> Result<u64, TransportError> {
        let url = self.resource_url(remote_path)?;

        let mut request = self.client.get(url.clone());
        if let Some(auth) = &self.auth {
            request = request.basic_auth(&auth.username, Some(&auth.password));
        }
        let response = request
            .send()
            .await
            .map_err(|e| classify_request_error(&url, e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(TransportError::NotFound {
                url: url.to_string(),
            });
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(TransportError::Auth {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let mut file = File::create(dest.as_std_path())
            .await
            .map_err(|e| TransportError::Io {
                path: dest.to_path_buf(),
                source: e,
            })?;

        let mut total = 0u64;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let result = match chunk {
                Ok(bytes) => match file.write_all(&bytes).await {
                    Ok(()) => {
                        total += bytes.len() as u64;
                        Ok(())
                    }
                    Err(e) => Err(TransportError::Io {
                        path: dest.to_path_buf(),
                        source: e,
                    }),
                },
                Err(e) => Err(classify_request_error(&url, e)),
            };
            if let Err(e) = result {
                drop(file);
                let _ = tokio::fs::remove_file(dest.as_std_path()).await;
                return Err(e);
            }
        }

        file.flush().await.map_err(|e| TransportError::Io {
            path: dest.to_path_buf(),
            source: e,
        })?;

        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_url_joins_segments() {
        let t = HttpTransport::new(
            Client::new(),
            Url::parse("https://repo.example.org/maven2/").unwrap(),
            None,
        );
        let url = t.resource_url("org/example/widget/1.0/widget-1.0.jar").unwrap();
        assert_eq!(
            url.as_str(),
            "https://repo.example.org/maven2/org/example/widget/1.0/widget-1.0.jar"
        );
    }

    #[test]
    fn resource_url_tolerates_missing_trailing_slash() {
        let t = HttpTransport::new(
            Client::new(),
            Url::parse("https://repo.example.org/maven2").unwrap(),
            None,
        );
        let url = t.resource_url("a/b.jar").unwrap();
        assert_eq!(url.as_str(), "https://repo.example.org/maven2/a/b.jar");
    }
}
