//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use hello_server::config::ServerConfig;
use hello_server::observability::logging::dispatch_with_writer;
use hello_server::ServerLifecycle;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Notify;
use tracing::Dispatch;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// Default configuration bound to an ephemeral loopback port.
pub fn test_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.listener.host = "127.0.0.1".to_string();
    config.listener.port = "0".to_string();
    config
}

/// In-memory log sink collecting the JSON records a server emits.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    pub fn dispatch(&self) -> Dispatch {
        dispatch_with_writer(EnvFilter::new("info"), self.clone())
    }

    /// Every record written so far, one JSON object per line.
    pub fn records(&self) -> Vec<serde_json::Value> {
        let bytes = self.0.lock().unwrap().clone();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    /// First record with the given message.
    pub fn find(&self, message: &str) -> Option<serde_json::Value> {
        self.records()
            .into_iter()
            .find(|record| record["message"] == message)
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Start a greeting server; returns it with its address and captured logs.
pub async fn start_server(config: ServerConfig) -> (ServerLifecycle, SocketAddr, LogCapture) {
    let logs = LogCapture::default();
    let mut server = ServerLifecycle::new(config, logs.dispatch());
    let addr = server.start().await.unwrap();
    (server, addr, logs)
}

/// Start a server dispatching to `router`.
pub async fn start_with_router(
    config: ServerConfig,
    router: Router,
) -> (ServerLifecycle, SocketAddr, LogCapture) {
    let logs = LogCapture::default();
    let mut server = ServerLifecycle::with_router(config, logs.dispatch(), router);
    let addr = server.start().await.unwrap();
    (server, addr, logs)
}

/// Router whose handler signals `started`, then answers "done" after `delay`.
pub fn slow_router(started: Arc<Notify>, delay: Duration) -> Router {
    Router::new().fallback(move || {
        let started = started.clone();
        async move {
            started.notify_one();
            tokio::time::sleep(delay).await;
            "done"
        }
    })
}

pub fn url(addr: SocketAddr, path: &str) -> String {
    format!("http://{addr}{path}")
}

/// Client that opens a fresh connection per request.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .build()
        .unwrap()
}

/// Read from `stream` until the buffer contains `needle` or the peer closes.
pub async fn read_until(stream: &mut TcpStream, needle: &str) -> String {
    let mut received = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        if String::from_utf8_lossy(&received).contains(needle) {
            break;
        }
        let n = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut chunk))
            .await
            .expect("response timed out")
            .unwrap();
        if n == 0 {
            break;
        }
        received.extend_from_slice(&chunk[..n]);
    }
    String::from_utf8(received).unwrap()
}

/// Wait for the peer to close `stream`, discarding anything it sends.
pub async fn closed_by_peer(stream: &mut TcpStream, within: Duration) -> bool {
    let mut chunk = [0u8; 1024];
    tokio::time::timeout(within, async {
        loop {
            match stream.read(&mut chunk).await {
                Ok(0) | Err(_) => return,
                Ok(_) => {}
            }
        }
    })
    .await
    .is_ok()
}

/// Send a raw GET request over `stream`.
pub async fn send_get(stream: &mut TcpStream, path: &str) {
    let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();
}
