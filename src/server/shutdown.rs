//! Graceful shutdown handling for flagserve
//!
//! Handles SIGHUP, SIGINT, SIGTERM and SIGQUIT for clean shutdown:
//! - Stops accepting new connections
//! - Waits for in-flight requests to complete, up to a grace period
//! - Reports whether the drain finished (graceful) or timed out (forced)
//!
//! ```text
//! Running ──signal──▶ Draining ──drained──▶ Stopped(Graceful)
//!                         │
//!                         └──grace period──▶ Stopped(Forced)
//! ```

use crate::server::http::ServerHandle;
use std::fmt;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

/// Lifecycle phase shared by everything that watches for shutdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownPhase {
    Running,
    Draining,
    Stopped(ShutdownOutcome),
}

/// How a shutdown sequence ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Every in-flight request finished inside the grace period
    Graceful,
    /// The grace period elapsed first
    Forced,
}

/// Shutdown signal receiver
///
/// Cloned and handed to every component that must stop when shutdown starts.
#[derive(Clone)]
pub struct ShutdownSignal {
    receiver: watch::Receiver<ShutdownPhase>,
}

impl ShutdownSignal {
    /// Wait for shutdown signal
    pub async fn wait(&mut self) {
        // Wait until the phase leaves Running
        while *self.receiver.borrow() == ShutdownPhase::Running {
            if self.receiver.changed().await.is_err() {
                // Sender dropped, treat as shutdown
                break;
            }
        }
    }

    /// Wait until the shutdown sequence has finished
    ///
    /// Returns `None` if the controller was dropped before finishing.
    pub async fn stopped(&mut self) -> Option<ShutdownOutcome> {
        loop {
            if let ShutdownPhase::Stopped(outcome) = *self.receiver.borrow() {
                return Some(outcome);
            }
            if self.receiver.changed().await.is_err() {
                return None;
            }
        }
    }

    /// Check if shutdown was signaled (non-blocking)
    pub fn is_shutdown(&self) -> bool {
        *self.receiver.borrow() != ShutdownPhase::Running
    }

    pub fn phase(&self) -> ShutdownPhase {
        *self.receiver.borrow()
    }
}

/// Controller for triggering shutdown
pub struct ShutdownController {
    sender: watch::Sender<ShutdownPhase>,
}

impl ShutdownController {
    /// Trigger shutdown
    ///
    /// Returns `true` only for the call that moved the phase out of
    /// `Running`; later calls are no-ops.
    pub fn shutdown(&self) -> bool {
        let triggered = self.sender.send_if_modified(|phase| {
            if *phase == ShutdownPhase::Running {
                *phase = ShutdownPhase::Draining;
                true
            } else {
                false
            }
        });
        if triggered {
            debug!("Shutdown signal sent");
        }
        triggered
    }

    /// Record the final outcome of the shutdown sequence
    pub fn finish(&self, outcome: ShutdownOutcome) {
        self.sender.send_replace(ShutdownPhase::Stopped(outcome));
    }

    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn phase(&self) -> ShutdownPhase {
        *self.sender.borrow()
    }
}

/// Create a new shutdown signal pair
///
/// Returns (controller, signal) where:
/// - controller: Used to trigger shutdown
/// - signal: Cloned and passed to components that need to listen
pub fn shutdown_channel() -> (ShutdownController, ShutdownSignal) {
    let (sender, receiver) = watch::channel(ShutdownPhase::Running);
    (ShutdownController { sender }, ShutdownSignal { receiver })
}

/// Process signals that start a graceful shutdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationSignal {
    Hangup,
    Interrupt,
    Terminate,
    Quit,
}

impl fmt::Display for TerminationSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TerminationSignal::Hangup => "SIGHUP",
            TerminationSignal::Interrupt => "SIGINT",
            TerminationSignal::Terminate => "SIGTERM",
            TerminationSignal::Quit => "SIGQUIT",
        };
        f.write_str(name)
    }
}

/// Forward termination signals into a channel
///
/// Registers the handlers up front and spawns a single task that forwards
/// every arrival. Once registered, these signals no longer terminate the
/// process by default.
#[cfg(unix)]
pub fn listen_for_signals() -> std::io::Result<mpsc::Receiver<TerminationSignal>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = signal(SignalKind::hangup())?;
    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let mut quit = signal(SignalKind::quit())?;

    let (tx, rx) = mpsc::channel(4);
    tokio::spawn(async move {
        loop {
            let received = tokio::select! {
                Some(()) = hangup.recv() => TerminationSignal::Hangup,
                Some(()) = interrupt.recv() => TerminationSignal::Interrupt,
                Some(()) = terminate.recv() => TerminationSignal::Terminate,
                Some(()) = quit.recv() => TerminationSignal::Quit,
                else => break,
            };
            info!(signal = %received, "Received termination signal");
            if tx.send(received).await.is_err() {
                break;
            }
        }
    });
    Ok(rx)
}

/// Forward Ctrl+C into a channel (Windows)
#[cfg(not(unix))]
pub fn listen_for_signals() -> std::io::Result<mpsc::Receiver<TerminationSignal>> {
    let (tx, rx) = mpsc::channel(4);
    tokio::spawn(async move {
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to wait for Ctrl+C");
                break;
            }
            info!("Received Ctrl+C");
            if tx.send(TerminationSignal::Interrupt).await.is_err() {
                break;
            }
        }
    });
    Ok(rx)
}

/// Drives the server from `Running` to `Stopped` on the first termination signal
///
/// Only the first signal starts a drain; later signals are logged and ignored.
pub struct ShutdownCoordinator {
    controller: ShutdownController,
    grace_period: Duration,
}

impl ShutdownCoordinator {
    pub fn new(grace_period: Duration) -> Self {
        let (controller, _) = shutdown_channel();
        Self {
            controller,
            grace_period,
        }
    }

    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    /// Observe the coordinator's phase (the process root context)
    pub fn subscribe(&self) -> ShutdownSignal {
        self.controller.subscribe()
    }

    /// Move `Running → Draining`
    ///
    /// Returns `false` if a shutdown sequence already started.
    pub fn begin_drain(&self, signal: TerminationSignal) -> bool {
        if self.controller.shutdown() {
            info!(
                signal = %signal,
                grace_period_secs = self.grace_period.as_secs_f64(),
                "Initializing server shutdown"
            );
            true
        } else {
            debug!(signal = %signal, "Shutdown already in progress, ignoring signal");
            false
        }
    }

    /// Wait for a termination signal, then drain `server` within the grace period
    ///
    /// Returns as soon as the drain completes or the grace period elapses,
    /// whichever comes first. If the signal channel closes before any
    /// signal arrives, this never returns.
    pub async fn run(
        self,
        mut signals: mpsc::Receiver<TerminationSignal>,
        server: ServerHandle,
    ) -> ShutdownOutcome {
        loop {
            match signals.recv().await {
                Some(signal) => {
                    if self.begin_drain(signal) {
                        break;
                    }
                }
                None => {
                    warn!("Signal channel closed, shutdown can no longer be triggered");
                    std::future::pending::<()>().await;
                }
            }
        }

        let deadline = tokio::time::sleep(self.grace_period);
        tokio::pin!(deadline);
        let drain = server.shutdown();
        tokio::pin!(drain);

        let outcome = loop {
            tokio::select! {
                biased;
                _ = &mut drain => break ShutdownOutcome::Graceful,
                _ = &mut deadline => break ShutdownOutcome::Forced,
                Some(signal) = signals.recv() => {
                    self.begin_drain(signal);
                }
            }
        };

        match outcome {
            ShutdownOutcome::Graceful => info!("Server drained"),
            ShutdownOutcome::Forced => error!(
                grace_period_secs = self.grace_period.as_secs_f64(),
                "Graceful server shutdown timeout - forcing an exit"
            ),
        }
        self.controller.finish(outcome);
        outcome
    }
}
