//! Environment variable fallbacks.
//!
//! Env vars are **fallback**, not override: they only apply to fields that
//! no config file set (embedded defaults do not count as "set").

use std::collections::HashMap;

use tracing::debug;

use crate::merge::{ConfigLayer, FieldSources};

struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
}

const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "CONSENT_PINATA_JWT",
        field_path: "blob_store.jwt",
    },
    // Name used by the hosted dashboard deployment.
    EnvMapping {
        var_name: "PINATA_JWT",
        field_path: "blob_store.jwt",
    },
    EnvMapping {
        var_name: "CONSENT_BLOB_API_URL",
        field_path: "blob_store.api_url",
    },
    EnvMapping {
        var_name: "CONSENT_CONTRACT_ADDRESS",
        field_path: "ledger.contract_address",
    },
    EnvMapping {
        var_name: "CONSENT_DEPLOYMENT_TX",
        field_path: "ledger.deployment_tx",
    },
    EnvMapping {
        var_name: "CONSENT_SYNTHETIC_FALLBACK",
        field_path: "ledger.synthetic_fallback",
    },
    EnvMapping {
        var_name: "CONSENT_LOG_LEVEL",
        field_path: "logging.level",
    },
];

/// Snapshot the `CONSENT_*` / `PINATA_*` environment.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars()
        .filter(|(k, _)| k.starts_with("CONSENT_") || k.starts_with("PINATA_"))
        .collect()
}

/// Apply env var fallbacks to fields not set by any file layer.
///
/// Returns the number of env vars applied.
pub fn apply_env_fallbacks<S: ::std::hash::BuildHasher>(
    merged: &mut toml::Value,
    sources: &mut FieldSources,
    env_vars: &HashMap<String, String, S>,
) -> usize {
    let mut count: usize = 0;

    for mapping in ENV_MAPPINGS {
        let set_by_file = sources
            .get(mapping.field_path)
            .is_some_and(|layer| *layer != ConfigLayer::Defaults);
        if set_by_file {
            continue;
        }

        if let Some(val) = env_vars.get(mapping.var_name) {
            debug!(
                var = mapping.var_name,
                field = mapping.field_path,
                "applying env var fallback"
            );
            set_field_from_string(merged, mapping.field_path, val);
            sources.insert(mapping.field_path.to_owned(), ConfigLayer::Environment);
            count = count.saturating_add(1);
        }
    }

    count
}

fn set_field_from_string(root: &mut toml::Value, path: &str, val: &str) {
    let Some((section, leaf)) = path.split_once('.') else {
        return;
    };
    let Some(table) = root.as_table_mut() else {
        return;
    };
    let section = table
        .entry(section.to_owned())
        .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    if let Some(section) = section.as_table_mut() {
        section.insert(leaf.to_owned(), coerce_to_toml_value(path, val));
    }
}

fn coerce_to_toml_value(path: &str, val: &str) -> toml::Value {
    if path == "ledger.synthetic_fallback" {
        match val.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => return toml::Value::Boolean(true),
            "0" | "false" | "no" | "off" => return toml::Value::Boolean(false),
            _ => {},
        }
    }
    toml::Value::String(val.to_owned())
}
