//! flagserve - exposes feature flag evaluations over HTTP
//!
//! ```text
//! control plane ◀──poll── UnleashClient ──is_enabled──▶ handler ──JSON──▶ GET /
//!                                                           ▲
//!                 signals ──▶ ShutdownCoordinator ──stop──▶ HttpServer
//! ```

pub mod config;
pub mod flags;
pub mod server;
