//! HTTP server lifecycle
//!
//! Owns the listening socket and the accept loop. Connections are served with
//! hyper's HTTP/1 implementation and each timeout in `ServerConfig` maps onto
//! a concrete mechanism:
//! - read timeout: per-connection watchdog, counted from accept for the first
//!   request and from the first byte of every later request until its
//!   headers are parsed
//! - write timeout: per-request timeout layer (408 when exceeded)
//! - idle timeout: the same watchdog, closing keep-alive connections that
//!   have nothing in flight and nothing being read
//!
//! Stopping is split in two: the accept loop exits as soon as stop is
//! requested (`serve` returns `Ok`), while `ServerHandle::stop` keeps
//! waiting until every accepted connection has finished.

use crate::config::{ServerConfig, MIN_HEADER_BYTES};
use crate::server::shutdown::{shutdown_channel, ShutdownController, ShutdownPhase};
use axum::Router;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::TokioIo;
use hyper_util::server::graceful::GracefulShutdown;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::time::Instant;
use tower::ServiceExt;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{debug, info, warn};

/// Longest pause between retries after a failed accept
const MAX_ACCEPT_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read listener address: {0}")]
    LocalAddr(#[source] std::io::Error),

    #[error("connections still open after {0:?}")]
    DeadlineExceeded(Duration),
}

/// HTTP server with graceful stop support
pub struct HttpServer {
    config: ServerConfig,
    app: Router,
    stop: Arc<ShutdownController>,
    drained: watch::Sender<bool>,
}

/// Cloneable handle used to stop a running `HttpServer`
#[derive(Clone)]
pub struct ServerHandle {
    stop: Arc<ShutdownController>,
    drained: watch::Receiver<bool>,
}

impl HttpServer {
    /// Wrap `app` with request tracing and the write timeout
    #[allow(deprecated)]
    pub fn new(config: ServerConfig, app: Router) -> Self {
        let app = app
            .layer(TimeoutLayer::new(config.write_timeout))
            .layer(TraceLayer::new_for_http());

        let (stop, _) = shutdown_channel();
        let (drained, _) = watch::channel(false);

        Self {
            config,
            app,
            stop: Arc::new(stop),
            drained,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            stop: self.stop.clone(),
            drained: self.drained.subscribe(),
        }
    }

    /// Bind `addr` and serve until stopped
    ///
    /// Returns `Ok(())` once stopped through a `ServerHandle`. Bind failures
    /// are returned before any connection is accepted.
    pub async fn start(self, addr: SocketAddr) -> Result<(), ServerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        self.serve(listener).await
    }

    /// Serve connections from an already bound listener until stopped
    pub async fn serve(self, listener: TcpListener) -> Result<(), ServerError> {
        let addr = listener.local_addr().map_err(ServerError::LocalAddr)?;
        // Log after successful bind - server is actually listening
        info!(address = %addr, "HTTP server listening");

        let http = http1_builder(&self.config);
        let timeouts = ConnectionTimeouts {
            read: self.config.read_timeout,
            idle: self.config.idle_timeout,
        };
        let graceful = GracefulShutdown::new();
        let mut stop = self.stop.subscribe();
        let mut backoff = Duration::from_millis(5);

        loop {
            tokio::select! {
                biased;
                _ = stop.wait() => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        backoff = Duration::from_millis(5);
                        debug!(peer = %peer, "Accepted connection");

                        let activity = Arc::new(ConnectionActivity::new());
                        let service = {
                            let app = self.app.clone();
                            let activity = activity.clone();
                            service_fn(move |request: Request<Incoming>| {
                                let app = app.clone();
                                let guard = activity.begin_request();
                                async move {
                                    let response = app.oneshot(request).await;
                                    drop(guard);
                                    response
                                }
                            })
                        };
                        let io = TokioIo::new(ActivityIo {
                            stream,
                            activity: activity.clone(),
                        });
                        let conn = graceful.watch(http.serve_connection(io, service));
                        tokio::spawn(watch_connection(conn, peer, activity, timeouts));
                    }
                    Err(e) => {
                        // Accept errors (fd exhaustion, aborted handshakes) are
                        // not fatal to the listener
                        warn!(error = %e, retry_in_ms = backoff.as_millis() as u64, "Accept failed");
                        tokio::time::sleep(backoff).await;
                        backoff = std::cmp::min(backoff * 2, MAX_ACCEPT_BACKOFF);
                    }
                },
            }
        }

        drop(listener);
        info!(address = %addr, "HTTP server stopped accepting connections");

        let drained = self.drained;
        tokio::spawn(async move {
            graceful.shutdown().await;
            info!("All connections drained");
            drained.send_replace(true);
        });

        Ok(())
    }
}

impl ServerHandle {
    /// Whether stop has been requested
    pub fn is_stopping(&self) -> bool {
        self.stop.phase() != ShutdownPhase::Running
    }

    /// Stop accepting connections and wait for in-flight requests to finish
    pub async fn shutdown(&self) {
        self.stop.shutdown();
        let mut drained = self.drained.clone();
        // Err means the server was dropped without serving: nothing to drain
        let _ = drained.wait_for(|done| *done).await;
    }

    /// Like `shutdown`, bounded by `deadline`
    ///
    /// Stop stays in effect when the deadline elapses; connections that
    /// are still open keep running.
    pub async fn stop(&self, deadline: Duration) -> Result<(), ServerError> {
        tokio::time::timeout(deadline, self.shutdown())
            .await
            .map_err(|_| ServerError::DeadlineExceeded(deadline))
    }
}

fn http1_builder(config: &ServerConfig) -> http1::Builder {
    let mut builder = http1::Builder::new();
    // Header reads are bounded by the connection watchdog
    builder.header_read_timeout(None).keep_alive(true);
    if let Some(max) = config.max_header_bytes {
        builder.max_buf_size(max.max(MIN_HEADER_BYTES));
    }
    builder
}

/// Drive one connection until it finishes or the watchdog expires
///
/// Dropping `conn` on expiry closes the socket.
async fn watch_connection<C>(
    conn: C,
    peer: SocketAddr,
    activity: Arc<ConnectionActivity>,
    timeouts: ConnectionTimeouts,
) where
    C: Future<Output = Result<(), hyper::Error>>,
{
    tokio::select! {
        result = conn => {
            if let Err(e) = result {
                debug!(peer = %peer, error = %e, "Connection closed with error");
            }
        }
        expiry = activity.expired(timeouts) => match expiry {
            Expiry::Read => debug!(peer = %peer, "Closing connection with unread request"),
            Expiry::Idle => debug!(peer = %peer, "Closing idle connection"),
        },
    }
}

#[derive(Debug, Clone, Copy)]
struct ConnectionTimeouts {
    read: Duration,
    idle: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expiry {
    Read,
    Idle,
}

#[derive(Debug, Clone, Copy)]
struct ActivityState {
    in_flight: usize,
    idle_since: Instant,
    /// Set while a request head is being read
    reading_since: Option<Instant>,
}

/// Tracks reads and requests in flight on one connection
struct ConnectionActivity {
    state: watch::Sender<ActivityState>,
}

impl ConnectionActivity {
    fn new() -> Self {
        let now = Instant::now();
        let (state, _) = watch::channel(ActivityState {
            in_flight: 0,
            idle_since: now,
            reading_since: Some(now),
        });
        Self { state }
    }

    /// Bytes arrived from the peer
    fn bytes_read(&self) {
        self.state.send_if_modified(|s| {
            if s.in_flight == 0 && s.reading_since.is_none() {
                s.reading_since = Some(Instant::now());
                true
            } else {
                false
            }
        });
    }

    fn begin_request(self: &Arc<Self>) -> RequestGuard {
        self.state.send_modify(|s| {
            s.in_flight += 1;
            s.reading_since = None;
        });
        RequestGuard(self.clone())
    }

    /// Resolves once a request head has taken longer than the read timeout,
    /// or nothing has happened on the connection for the idle timeout
    async fn expired(&self, timeouts: ConnectionTimeouts) -> Expiry {
        let mut changes = self.state.subscribe();
        loop {
            let state = *changes.borrow_and_update();
            let deadline = match state.reading_since {
                Some(started) => Some((started + timeouts.read, Expiry::Read)),
                None if state.in_flight == 0 => {
                    Some((state.idle_since + timeouts.idle, Expiry::Idle))
                }
                None => None,
            };
            match deadline {
                Some((at, expiry)) => tokio::select! {
                    _ = tokio::time::sleep_until(at) => return expiry,
                    _ = changes.changed() => {}
                },
                // The sender lives as long as `self`, so this cannot fail
                None => {
                    let _ = changes.changed().await;
                }
            }
        }
    }
}

struct RequestGuard(Arc<ConnectionActivity>);

impl Drop for RequestGuard {
    fn drop(&mut self) {
        self.0.state.send_modify(|s| {
            s.in_flight = s.in_flight.saturating_sub(1);
            if s.in_flight == 0 {
                s.idle_since = Instant::now();
            }
        });
    }
}

/// TCP stream that reports incoming bytes to its `ConnectionActivity`
struct ActivityIo {
    stream: TcpStream,
    activity: Arc<ConnectionActivity>,
}

impl AsyncRead for ActivityIo {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let before = buf.filled().len();
        let poll = Pin::new(&mut self.stream).poll_read(cx, buf);
        if buf.filled().len() > before {
            self.activity.bytes_read();
        }
        poll
    }
}

impl AsyncWrite for ActivityIo {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.stream).poll_write(cx, buf)
    }

    fn poll_write_vectored(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.stream).poll_write_vectored(cx, bufs)
    }

    fn is_write_vectored(&self) -> bool {
        self.stream.is_write_vectored()
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_shutdown(cx)
    }
}
