//! Feature flag evaluation
//!
//! - `FlagProvider` is the evaluation capability the HTTP handler depends on
//! - `UnleashClient` is the production provider (polls an Unleash-compatible control plane)
//! - `build_snapshot` maps the published flags into the nested response shape

mod snapshot;
pub mod unleash;

pub use snapshot::{build_snapshot, to_json_pretty, FlagSnapshot, PUBLISHED_FLAGS};
pub use unleash::{ProviderError, UnleashClient};

/// Trait for evaluating a named flag
///
/// Evaluation is total: unknown flags and any uncertainty inside the
/// provider resolve to `false`.
pub trait FlagProvider: Send + Sync {
    fn is_enabled(&self, name: &str) -> bool;
}

/// In-memory provider for tests
#[cfg(test)]
#[derive(Default)]
pub struct StaticFlags {
    flags: std::sync::Mutex<std::collections::HashMap<String, bool>>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
impl StaticFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, name: &str, enabled: bool) -> Self {
        self.set(name, enabled);
        self
    }

    pub fn set(&self, name: &str, enabled: bool) {
        self.flags.lock().unwrap().insert(name.to_string(), enabled);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
impl FlagProvider for StaticFlags {
    fn is_enabled(&self, name: &str) -> bool {
        self.flags.lock().unwrap().get(name).copied().unwrap_or(false)
    }
}

#[cfg(test)]
#[path = "snapshot_test.rs"]
mod snapshot_tests;

#[cfg(test)]
#[path = "unleash_test.rs"]
mod unleash_tests;
