//! Docker Engine API driver.
//!
//! # Responsibilities
//! - Talk HTTP/1.1 to the Docker daemon over its unix socket
//! - Inspect, stop, start a container and read its logs
//!
//! # Design Decisions
//! - A fresh connection per request; the console issues a handful per action
//! - Socket connect failure means "runtime unavailable", distinct from a
//!   missing container, so callers can fall back to the CLI
//! - Every request has a deadline; stop gets its grace period on top

use async_trait::async_trait;
use http_body_util::{BodyExt, Empty};
use hyper::body::Bytes;
use hyper::client::conn::http1;
use hyper::{Method, Request, StatusCode};
use hyper_util::rt::TokioIo;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tokio::net::UnixStream;

use crate::config::settings::ConsoleSettings;
use crate::lifecycle::types::{ContainerInfo, ContainerRuntime, LifecycleError, LifecycleResult};
use crate::resilience::with_deadline;

/// Docker Engine API client over a unix socket.
#[derive(Debug, Clone)]
pub struct DockerEngine {
    socket: PathBuf,
    request_timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    message: String,
}

impl DockerEngine {
    pub fn new(socket: impl Into<PathBuf>, request_timeout: Duration) -> Self {
        Self {
            socket: socket.into(),
            request_timeout,
        }
    }

    pub fn from_settings(settings: &ConsoleSettings) -> Self {
        Self::new(settings.docker_socket.clone(), settings.timeouts.docker_api())
    }

    fn unavailable(&self, reason: impl ToString) -> LifecycleError {
        LifecycleError::RuntimeUnavailable {
            socket: self.socket.clone(),
            reason: reason.to_string(),
        }
    }

    async fn request(&self, method: Method, path: &str, timeout: Duration) -> LifecycleResult<(StatusCode, Bytes)> {
        let operation = format!("{} {}", method, path);
        let secs = timeout.as_secs();
        with_deadline(timeout, self.send(method, path), || LifecycleError::Timeout { operation, secs }).await
    }

    async fn send(&self, method: Method, path: &str) -> LifecycleResult<(StatusCode, Bytes)> {
        let stream = UnixStream::connect(&self.socket)
            .await
            .map_err(|e| self.unavailable(e))?;

        let (mut sender, conn) = http1::handshake(TokioIo::new(stream))
            .await
            .map_err(|e| self.unavailable(e))?;
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                tracing::debug!(error = %e, "Docker API connection closed with error");
            }
        });

        let request = Request::builder()
            .method(method)
            .uri(path)
            .header(hyper::header::HOST, "docker")
            .body(Empty::<Bytes>::new())
            .map_err(|e| LifecycleError::Api { status: 0, message: e.to_string() })?;

        let response = sender
            .send_request(request)
            .await
            .map_err(|e| self.unavailable(e))?;
        let status = response.status();
        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| LifecycleError::Api { status: status.as_u16(), message: e.to_string() })?
            .to_bytes();

        Ok((status, body))
    }

    fn api_error(status: StatusCode, body: &[u8]) -> LifecycleError {
        let message = serde_json::from_slice::<ApiMessage>(body)
            .map(|m| m.message)
            .unwrap_or_else(|_| String::from_utf8_lossy(body).trim().to_string());
        LifecycleError::Api { status: status.as_u16(), message }
    }
}

#[async_trait]
impl ContainerRuntime for DockerEngine {
    async fn ping(&self) -> LifecycleResult<()> {
        // A daemon that accepts but never answers counts as unreachable
        let (status, body) = self
            .request(Method::GET, "/_ping", self.request_timeout)
            .await
            .map_err(|e| match e {
                LifecycleError::Timeout { .. } => self.unavailable(e),
                other => other,
            })?;
        if status.is_success() {
            Ok(())
        } else {
            Err(Self::api_error(status, &body))
        }
    }

    async fn inspect(&self, name: &str) -> LifecycleResult<ContainerInfo> {
        let path = format!("/containers/{}/json", name);
        let (status, body) = self.request(Method::GET, &path, self.request_timeout).await?;
        match status {
            StatusCode::OK => serde_json::from_slice(&body).map_err(|e| LifecycleError::Api {
                status: status.as_u16(),
                message: format!("unexpected inspect payload: {}", e),
            }),
            StatusCode::NOT_FOUND => Err(LifecycleError::ContainerNotFound { candidates: vec![name.to_string()] }),
            _ => Err(Self::api_error(status, &body)),
        }
    }

    async fn stop(&self, container: &ContainerInfo, grace: Duration) -> LifecycleResult<()> {
        let path = format!("/containers/{}/stop?t={}", container.id, grace.as_secs());
        // The daemon holds the request open for up to the grace period
        let (status, body) = self.request(Method::POST, &path, self.request_timeout + grace).await?;
        match status {
            // 304: already stopped
            StatusCode::NO_CONTENT | StatusCode::NOT_MODIFIED => Ok(()),
            StatusCode::NOT_FOUND => Err(LifecycleError::ContainerNotFound {
                candidates: vec![container.display_name().to_string()],
            }),
            _ => Err(Self::api_error(status, &body)),
        }
    }

    async fn start(&self, container: &ContainerInfo) -> LifecycleResult<()> {
        let path = format!("/containers/{}/start", container.id);
        let (status, body) = self.request(Method::POST, &path, self.request_timeout).await?;
        match status {
            // 304: already running
            StatusCode::NO_CONTENT | StatusCode::NOT_MODIFIED => Ok(()),
            StatusCode::NOT_FOUND => Err(LifecycleError::ContainerNotFound {
                candidates: vec![container.display_name().to_string()],
            }),
            _ => Err(Self::api_error(status, &body)),
        }
    }

    async fn logs(&self, container: &ContainerInfo, tail: u32) -> LifecycleResult<String> {
        let path = format!(
            "/containers/{}/logs?stdout=true&stderr=true&timestamps=true&tail={}",
            container.id, tail
        );
        let (status, body) = self.request(Method::GET, &path, self.request_timeout).await?;
        if !status.is_success() {
            return Err(Self::api_error(status, &body));
        }
        Ok(if container.config.tty {
            String::from_utf8_lossy(&body).into_owned()
        } else {
            demux_log_stream(&body)
        })
    }
}

/// Decode Docker's multiplexed log stream.
///
/// Without a TTY each chunk carries an 8-byte header: stream type (0, 1 or
/// 2), three zero bytes, and the big-endian payload length. Anything that
/// does not look like a header is passed through as-is.
pub fn demux_log_stream(raw: &[u8]) -> String {
    let mut out = Vec::with_capacity(raw.len());
    let mut rest = raw;

    while rest.len() >= 8 && rest[0] <= 2 && rest[1..4] == [0, 0, 0] {
        let len = u32::from_be_bytes([rest[4], rest[5], rest[6], rest[7]]) as usize;
        let end = 8usize.saturating_add(len).min(rest.len());
        out.extend_from_slice(&rest[8..end]);
        rest = &rest[end..];
    }
    out.extend_from_slice(rest);

    String::from_utf8_lossy(&out).into_owned()
}
