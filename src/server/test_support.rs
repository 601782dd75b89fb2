//! Shared helpers for server tests

use super::http::{HttpServer, ServerError, ServerHandle};
use super::router;
use crate::config::ServerConfig;
use crate::flags::StaticFlags;
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Server config with test-friendly defaults
pub fn test_config() -> ServerConfig {
    ServerConfig::new(0)
}

/// Flag router plus `/slow`, which signals `started` and then sleeps for `delay`
pub fn test_router(enabled: bool, delay: Duration, started: Arc<Notify>) -> Router {
    router(Arc::new(StaticFlags::new().with("user-metadata", enabled))).route(
        "/slow",
        get(move || {
            let started = started.clone();
            async move {
                started.notify_one();
                tokio::time::sleep(delay).await;
                "done"
            }
        }),
    )
}

pub async fn bind_local() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Failed to read listener address");
    (listener, addr)
}

/// Start `app` on an ephemeral port
pub async fn spawn_server(
    config: ServerConfig,
    app: Router,
) -> (
    SocketAddr,
    ServerHandle,
    JoinHandle<Result<(), ServerError>>,
) {
    let (listener, addr) = bind_local().await;
    let server = HttpServer::new(config, app);
    let handle = server.handle();
    let task = tokio::spawn(server.serve(listener));
    (addr, handle, task)
}

/// Fire a request to `/slow` in the background and wait until the handler runs
pub async fn start_slow_request(
    addr: SocketAddr,
    started: &Notify,
) -> JoinHandle<Result<reqwest::Response, reqwest::Error>> {
    let request = tokio::spawn(async move {
        reqwest::Client::new()
            .get(format!("http://{}/slow", addr))
            .send()
            .await
    });
    tokio::time::timeout(Duration::from_secs(5), started.notified())
        .await
        .expect("slow handler never started");
    request
}

/// Wait until connecting to `addr` is refused
pub async fn connection_refused(addr: SocketAddr, within: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + within;
    while tokio::time::Instant::now() < deadline {
        if tokio::net::TcpStream::connect(addr).await.is_err() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
