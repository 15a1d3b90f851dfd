//! Layered TOML merging with per-field source tracking.

use std::collections::BTreeMap;
use std::fmt;

/// Where a configuration value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigLayer {
    /// Embedded `defaults.toml`.
    Defaults,
    /// User-level config file.
    User,
    /// File passed explicitly by the caller.
    Explicit,
    /// `CONSENT_*` environment variable fallback.
    Environment,
}

impl fmt::Display for ConfigLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Defaults => "defaults",
            Self::User => "user",
            Self::Explicit => "explicit",
            Self::Environment => "env",
        };
        f.write_str(name)
    }
}

/// Dotted field path to the layer that last set it.
pub type FieldSources = BTreeMap<String, ConfigLayer>;

/// Deep-merge `overlay` into `base`, recording which layer set each leaf.
pub fn deep_merge_tracking(
    base: &mut toml::Value,
    overlay: &toml::Value,
    prefix: &str,
    layer: &ConfigLayer,
    sources: &mut FieldSources,
) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let path = join_path(prefix, key);
                if let Some(base_val) = base_table.get_mut(key) {
                    if overlay_val.is_table() {
                        deep_merge_tracking(base_val, overlay_val, &path, layer, sources);
                    } else {
                        *base_val = overlay_val.clone();
                        sources.insert(path, layer.clone());
                    }
                } else {
                    base_table.insert(key.clone(), overlay_val.clone());
                    record_leaves(overlay_val, &path, layer, sources);
                }
            }
        },
        (base, overlay) => {
            *base = overlay.clone();
            sources.insert(prefix.to_owned(), layer.clone());
        },
    }
}

/// Record every leaf under `value` as coming from `layer`.
pub fn record_leaves(
    value: &toml::Value,
    prefix: &str,
    layer: &ConfigLayer,
    sources: &mut FieldSources,
) {
    if let toml::Value::Table(table) = value {
        for (key, child) in table {
            record_leaves(child, &join_path(prefix, key), layer, sources);
        }
    } else {
        sources.insert(prefix.to_owned(), layer.clone());
    }
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_owned()
    } else {
        format!("{prefix}.{key}")
    }
}
