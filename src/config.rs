//! Runtime configuration for flagserve
//!
//! Configuration comes from environment variables:
//! - FLAGSERVE_PORT: listen port (default: 3000)
//! - UNLEASH_URL: control-plane API base URL (required)
//! - UNLEASH_INSTANCE_ID: client instance identifier (required)
//! - UNLEASH_APP_NAME: application/environment name (default: Production)
//! - UNLEASH_REFRESH_SECS: toggle refresh interval (default: 15)
//! - UNLEASH_DISABLE_METRICS: "true" to skip registration and usage metrics (default: true)
//! - UNLEASH_METRICS_SECS: usage metrics interval (default: 60)
//! - UNLEASH_READY_TIMEOUT_SECS: how long initialization may wait for the first fetch (default: 30)
//!
//! Server timeouts and the shutdown grace period are fixed.

use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Default listen port
pub const DEFAULT_PORT: u16 = 3000;

/// Bounded time allowed for in-flight requests after a termination signal
pub const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(30);

/// Smallest read buffer hyper accepts for HTTP/1 connections
pub const MIN_HEADER_BYTES: usize = 8192;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value:?} ({reason})")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// HTTP server settings, fixed at construction
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub port: u16,
    /// Time allowed for a client to send the request headers
    pub read_timeout: Duration,
    /// Time allowed to produce a response once the request is read
    pub write_timeout: Duration,
    /// Time a keep-alive connection may sit without a request before it is closed
    pub idle_timeout: Duration,
    /// `None` keeps the HTTP library default
    pub max_header_bytes: Option<usize>,
}

impl ServerConfig {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            read_timeout: Duration::from_secs(15),
            write_timeout: Duration::from_secs(60),
            idle_timeout: Duration::from_secs(30),
            max_header_bytes: None,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PORT)
    }
}

/// Feature-flag control plane settings
#[derive(Debug, Clone, PartialEq)]
pub struct UnleashConfig {
    pub url: String,
    pub instance_id: String,
    pub app_name: String,
    pub refresh_interval: Duration,
    pub disable_metrics: bool,
    pub metrics_interval: Duration,
    pub ready_timeout: Duration,
}

impl UnleashConfig {
    pub fn new(url: impl Into<String>, instance_id: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            instance_id: instance_id.into(),
            app_name: "Production".to_string(),
            refresh_interval: Duration::from_secs(15),
            disable_metrics: true,
            metrics_interval: Duration::from_secs(60),
            ready_timeout: Duration::from_secs(30),
        }
    }
}

/// Complete process configuration
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub unleash: UnleashConfig,
    pub grace_period: Duration,
}

impl AppConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(std::env::vars().collect())
    }

    /// Load configuration from an explicit variable map
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |name: &str| vars.get(name).map(|v| v.trim()).filter(|v| !v.is_empty());

        let port = match get("FLAGSERVE_PORT") {
            Some(v) => parse_number::<u16>("FLAGSERVE_PORT", v)?,
            None => DEFAULT_PORT,
        };

        let url = get("UNLEASH_URL").ok_or(ConfigError::Missing("UNLEASH_URL"))?;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                name: "UNLEASH_URL",
                value: url.to_string(),
                reason: "expected an http:// or https:// URL".to_string(),
            });
        }
        let instance_id =
            get("UNLEASH_INSTANCE_ID").ok_or(ConfigError::Missing("UNLEASH_INSTANCE_ID"))?;

        let mut unleash = UnleashConfig::new(url.trim_end_matches('/'), instance_id);
        if let Some(v) = get("UNLEASH_APP_NAME") {
            unleash.app_name = v.to_string();
        }
        if let Some(v) = get("UNLEASH_REFRESH_SECS") {
            unleash.refresh_interval = parse_seconds("UNLEASH_REFRESH_SECS", v)?;
        }
        if let Some(v) = get("UNLEASH_DISABLE_METRICS") {
            unleash.disable_metrics = parse_bool("UNLEASH_DISABLE_METRICS", v)?;
        }
        if let Some(v) = get("UNLEASH_METRICS_SECS") {
            unleash.metrics_interval = parse_seconds("UNLEASH_METRICS_SECS", v)?;
        }
        if let Some(v) = get("UNLEASH_READY_TIMEOUT_SECS") {
            unleash.ready_timeout = parse_seconds("UNLEASH_READY_TIMEOUT_SECS", v)?;
        }

        Ok(Self {
            server: ServerConfig::new(port),
            unleash,
            grace_period: SHUTDOWN_GRACE_PERIOD,
        })
    }
}

fn parse_number<T>(name: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.parse::<T>().map_err(|e| ConfigError::Invalid {
        name,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

/// Intervals must be positive; a zero refresh interval would spin
fn parse_seconds(name: &'static str, value: &str) -> Result<Duration, ConfigError> {
    match parse_number::<u64>(name, value)? {
        0 => Err(ConfigError::Invalid {
            name,
            value: value.to_string(),
            reason: "must be greater than zero".to_string(),
        }),
        secs => Ok(Duration::from_secs(secs)),
    }
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(ConfigError::Invalid {
            name,
            value: value.to_string(),
            reason: "expected true/false or 1/0".to_string(),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
