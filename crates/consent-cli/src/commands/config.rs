//! Config command - inspect the resolved configuration.

use consent_config::{ConfigLayer, ResolvedConfig, loader};

use super::OutputFormat;
use crate::theme::Theme;

/// Print the resolved configuration. Secrets are never printed.
pub(crate) fn show(resolved: &ResolvedConfig, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            let mut value = serde_json::to_value(&resolved.config)?;
            value["sources"] = serde_json::to_value(
                resolved
                    .field_sources
                    .iter()
                    .map(|(field, layer)| (field.clone(), layer.to_string()))
                    .collect::<std::collections::BTreeMap<_, _>>(),
            )?;
            println!("{}", serde_json::to_string_pretty(&value)?);
        },
        OutputFormat::Pretty => {
            println!("{}", toml::to_string_pretty(&resolved.config)?);
            let jwt = if resolved.config.blob_store.jwt.is_some() {
                "set"
            } else {
                "unset"
            };
            println!("{}", Theme::dimmed(&format!("# blob_store.jwt: {jwt}")));

            let overridden: Vec<_> = resolved
                .field_sources
                .iter()
                .filter(|(_, layer)| !matches!(layer, ConfigLayer::Defaults))
                .collect();
            if !overridden.is_empty() {
                println!("\n{}", Theme::header("Overrides"));
                for (field, layer) in overridden {
                    println!("{}", Theme::field(field, &layer.to_string()));
                }
            }
        },
    }
    Ok(())
}

/// Print the files consulted.
pub(crate) fn paths(resolved: &ResolvedConfig) {
    match loader::user_config_path() {
        Some(path) => println!("{}", Theme::field("user", &path.display().to_string())),
        None => println!("{}", Theme::field("user", "(no home directory)")),
    }
    if resolved.loaded_files.is_empty() {
        println!("{}", Theme::info("No config files loaded; using defaults"));
    }
    for file in &resolved.loaded_files {
        println!("{}", Theme::success(file));
    }
}
