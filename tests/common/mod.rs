//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, UnixListener};

use relay_console::config::{ConsoleSettings, EnvironmentMode};

/// Request line of a received request, e.g. `POST /reload-config`.
pub type RequestLine = String;

/// Start a programmable HTTP backend on an ephemeral port. `f` receives the
/// method and path (with query) and returns status and body.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(RequestLine) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move { respond(socket, f).await });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Start a fake Docker daemon on a unix socket. Every request line is
/// recorded; `f` returns status and raw body bytes.
pub async fn start_fake_docker<F>(socket: &Path, f: F) -> Arc<Mutex<Vec<RequestLine>>>
where
    F: Fn(&str) -> (u16, Vec<u8>) + Send + Sync + 'static,
{
    let listener = UnixListener::bind(socket).unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = seen.clone();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    let recorder = recorder.clone();
                    tokio::spawn(async move {
                        let line = read_request_line(&mut socket).await;
                        recorder.lock().unwrap().push(line.clone());
                        let (status, body) = f(&line);
                        write_response(&mut socket, status, &body).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    seen
}

async fn respond<S, F, Fut>(mut socket: S, f: Arc<F>)
where
    S: AsyncRead + AsyncWrite + Unpin,
    F: Fn(RequestLine) -> Fut,
    Fut: Future<Output = (u16, String)>,
{
    let line = read_request_line(&mut socket).await;
    let (status, body) = f(line).await;
    write_response(&mut socket, status, body.as_bytes()).await;
}

/// Read the request head and return `METHOD PATH`.
async fn read_request_line<S: AsyncRead + Unpin>(socket: &mut S) -> RequestLine {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => head.extend_from_slice(&buf[..n]),
        }
    }
    let head = String::from_utf8_lossy(&head);
    let mut parts = head.lines().next().unwrap_or_default().split_whitespace();
    format!("{} {}", parts.next().unwrap_or_default(), parts.next().unwrap_or_default())
}

async fn write_response<S: AsyncWrite + Unpin>(socket: &mut S, status: u16, body: &[u8]) {
    let status_text = match status {
        200 => "200 OK",
        204 => "204 No Content",
        304 => "304 Not Modified",
        404 => "404 Not Found",
        500 => "500 Internal Server Error",
        503 => "503 Service Unavailable",
        _ => "200 OK",
    };
    let content_type = if body.first() == Some(&b'{') { "application/json" } else { "text/plain" };
    let head = if status == 204 || status == 304 {
        format!("HTTP/1.1 {}\r\nConnection: close\r\n\r\n", status_text)
    } else {
        format!(
            "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            status_text,
            content_type,
            body.len()
        )
    };
    let _ = socket.write_all(head.as_bytes()).await;
    if status != 204 && status != 304 {
        let _ = socket.write_all(body).await;
    }
    let _ = socket.shutdown().await;
    tokio::time::sleep(Duration::from_millis(10)).await;
}

/// Settings rooted in `dir`: no real socket, no real CLI, relay at `relay`.
pub fn settings_in(dir: &Path, mode: EnvironmentMode, relay: Option<SocketAddr>) -> ConsoleSettings {
    let (host, port) = match relay {
        Some(addr) => (addr.ip().to_string(), addr.port()),
        // Nothing listens on port 1
        None => ("127.0.0.1".to_string(), 1),
    };
    ConsoleSettings {
        mode,
        relay_service: host,
        relay_port: port,
        document_path: dir.join("app/config/config.toml"),
        env_read_paths: vec![dir.join("app/.env"), dir.join("app/config/.env")],
        env_write_paths: vec![dir.join("app/config/.env"), dir.join("app/.env")],
        container_names: vec!["pump-discover-relay".to_string(), "relay".to_string()],
        docker_socket: dir.join("docker.sock"),
        compose_binaries: vec![],
        compose_files: vec![dir.join("docker-compose.yml"), dir.join("app/docker-compose.yml")],
        ..ConsoleSettings::default()
    }
}

/// Write a fake compose CLI script into `dir` and register it (run through
/// `sh`) as the only compose binary. `body` sees the CLI arguments as `$@`.
pub fn install_fake_compose(settings: &mut ConsoleSettings, dir: &Path, body: &str) -> PathBuf {
    let script = dir.join("fake-compose");
    std::fs::write(&script, format!("{}\n", body)).unwrap();
    settings.compose_binaries = vec![vec!["sh".to_string(), script.display().to_string()]];
    script
}

/// Multiplexed Docker log frame.
pub fn docker_frame(stream: u8, payload: &str) -> Vec<u8> {
    let mut out = vec![stream, 0, 0, 0];
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(payload.as_bytes());
    out
}
