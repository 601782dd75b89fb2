//! Flag snapshot construction

use super::FlagProvider;
use serde::Serialize;
use std::collections::BTreeMap;

/// Flags exposed over HTTP: (provider flag name, category, key)
pub const PUBLISHED_FLAGS: &[(&str, &str, &str)] = &[("user-metadata", "user", "metadata")];

/// Evaluated flags grouped by category, e.g. `{"user": {"metadata": true}}`
///
/// Built fresh per request. `BTreeMap` keeps serialized key order stable.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct FlagSnapshot(BTreeMap<String, BTreeMap<String, bool>>);

impl FlagSnapshot {
    /// Look up one evaluated flag by category and key
    pub fn get(&self, category: &str, key: &str) -> Option<bool> {
        self.0.get(category).and_then(|flags| flags.get(key)).copied()
    }

    pub fn to_json_pretty(&self) -> Result<Vec<u8>, serde_json::Error> {
        to_json_pretty(self)
    }
}

/// Serialize as JSON indented with four spaces
pub fn to_json_pretty<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut out = Vec::with_capacity(64);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut serializer)?;
    Ok(out)
}

/// Evaluate every published flag once against the provider
pub fn build_snapshot(provider: &dyn FlagProvider) -> FlagSnapshot {
    let mut categories: BTreeMap<String, BTreeMap<String, bool>> = BTreeMap::new();
    for (name, category, key) in PUBLISHED_FLAGS {
        categories
            .entry(category.to_string())
            .or_default()
            .insert(key.to_string(), provider.is_enabled(name));
    }
    FlagSnapshot(categories)
}
