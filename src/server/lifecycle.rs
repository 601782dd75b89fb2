//! Serve-until-shutdown orchestration and exit statuses
//!
//! ```text
//! bind ──fail──▶ ListenFailed (100)
//!  │
//!  ▼
//! accept loop ◀── signal ── coordinator ──drained──▶ Graceful (0)
//!                               │
//!                               └──grace period──▶ Forced (99)
//! ```

use crate::server::http::{HttpServer, ServerError};
use crate::server::shutdown::{ShutdownCoordinator, ShutdownOutcome, TerminationSignal};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// How the serving process ended
///
/// Each variant maps to a distinct process exit status so operators can
/// tell causes apart from the status alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// Drain finished within the grace period
    Graceful,
    /// Grace period elapsed with requests still in flight
    Forced,
    /// Listening failed for a reason unrelated to shutdown
    ListenFailed,
}

impl ExitStatus {
    pub fn code(self) -> i32 {
        match self {
            ExitStatus::Graceful => 0,
            ExitStatus::Forced => 99,
            ExitStatus::ListenFailed => 100,
        }
    }
}

impl From<ShutdownOutcome> for ExitStatus {
    fn from(outcome: ShutdownOutcome) -> Self {
        match outcome {
            ShutdownOutcome::Graceful => ExitStatus::Graceful,
            ShutdownOutcome::Forced => ExitStatus::Forced,
        }
    }
}

/// Bind `addr`, serve, and return once a signal-triggered shutdown ends
pub async fn run_until_shutdown(
    server: HttpServer,
    addr: SocketAddr,
    coordinator: ShutdownCoordinator,
    signals: mpsc::Receiver<TerminationSignal>,
) -> ExitStatus {
    let drain = tokio::spawn(coordinator.run(signals, server.handle()));
    let served = server.start(addr).await;
    finish(served, drain).await
}

/// Same as `run_until_shutdown` with an already bound listener
pub async fn run_listener_until_shutdown(
    server: HttpServer,
    listener: TcpListener,
    coordinator: ShutdownCoordinator,
    signals: mpsc::Receiver<TerminationSignal>,
) -> ExitStatus {
    let drain = tokio::spawn(coordinator.run(signals, server.handle()));
    let served = server.serve(listener).await;
    finish(served, drain).await
}

/// The accept loop has returned; wait for the coordinator's verdict
async fn finish(
    served: Result<(), ServerError>,
    drain: JoinHandle<ShutdownOutcome>,
) -> ExitStatus {
    if let Err(e) = served {
        error!(error = %e, "Error during server listen and serve");
        drain.abort();
        return ExitStatus::ListenFailed;
    }

    match drain.await {
        Ok(outcome) => {
            let status = ExitStatus::from(outcome);
            info!(exit_code = status.code(), "Server shutdown finished");
            status
        }
        Err(e) => {
            error!(error = %e, "Shutdown coordinator failed");
            ExitStatus::Forced
        }
    }
}
