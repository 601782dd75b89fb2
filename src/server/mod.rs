//! HTTP server for the flag endpoint
//!
//! - `handler` - the `/` route returning evaluated flags as JSON
//! - `http` - listener ownership, timeouts, accept loop, drain
//! - `shutdown` - signal handling and the graceful shutdown coordinator
//! - `lifecycle` - wiring the above together and mapping outcomes to exit statuses

pub mod handler;
pub mod http;
pub mod lifecycle;
pub mod shutdown;

pub use handler::router;
pub use http::{HttpServer, ServerError, ServerHandle};
pub use lifecycle::{run_listener_until_shutdown, run_until_shutdown, ExitStatus};
pub use shutdown::{
    listen_for_signals, shutdown_channel, ShutdownController, ShutdownCoordinator,
    ShutdownOutcome, ShutdownPhase, ShutdownSignal, TerminationSignal,
};

#[cfg(test)]
mod test_support;

#[cfg(test)]
#[path = "handler_test.rs"]
mod handler_tests;

#[cfg(test)]
#[path = "http_test.rs"]
mod http_tests;

#[cfg(test)]
#[path = "shutdown_test.rs"]
mod shutdown_tests;

#[cfg(test)]
#[path = "lifecycle_test.rs"]
mod lifecycle_tests;
