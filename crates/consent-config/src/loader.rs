//! Config file discovery and layered loading.
//!
//! 1. Parse `defaults.toml` → base
//! 2. Merge the user file (`<config dir>/consent-ledger/config.toml`)
//! 3. Merge an explicitly requested file
//! 4. Apply `CONSENT_*` env var fallbacks for fields no file set
//! 5. Deserialize and validate

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::env::{apply_env_fallbacks, collect_env_vars};
use crate::error::{ConfigError, ConfigResult};
use crate::merge::{ConfigLayer, FieldSources, deep_merge_tracking, record_leaves};
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Maximum allowed config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: usize = 1_048_576;

/// A loaded configuration plus provenance.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The final configuration.
    pub config: Config,
    /// Which layer set each field.
    pub field_sources: FieldSources,
    /// Files that contributed, in merge order.
    pub loaded_files: Vec<String>,
}

/// Load configuration with the full precedence chain.
///
/// `explicit` is a file the caller asked for by name; unlike the user file
/// it must exist. `user_dir` overrides the platform config directory.
///
/// # Errors
///
/// Returns a [`ConfigError`] if any file is unreadable or malformed, or if
/// the merged configuration fails validation.
pub fn load(explicit: Option<&Path>, user_dir: Option<&Path>) -> ConfigResult<ResolvedConfig> {
    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;

    let mut field_sources = FieldSources::new();
    let mut loaded_files = Vec::new();
    record_leaves(&merged, "", &ConfigLayer::Defaults, &mut field_sources);

    let user_path = user_dir
        .map(Path::to_path_buf)
        .or_else(default_user_dir)
        .map(|dir| dir.join("config.toml"));
    if let Some(path) = user_path
        && let Some(overlay) = try_load_file(&path)?
    {
        deep_merge_tracking(&mut merged, &overlay, "", &ConfigLayer::User, &mut field_sources);
        loaded_files.push(path.display().to_string());
        info!(path = %path.display(), "loaded user config");
    }

    if let Some(path) = explicit {
        let overlay = try_load_file(path)?.ok_or_else(|| ConfigError::ReadError {
            path: path.display().to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        })?;
        deep_merge_tracking(
            &mut merged,
            &overlay,
            "",
            &ConfigLayer::Explicit,
            &mut field_sources,
        );
        loaded_files.push(path.display().to_string());
        info!(path = %path.display(), "loaded config file");
    }

    let env_count = apply_env_fallbacks(&mut merged, &mut field_sources, &collect_env_vars());
    if env_count > 0 {
        debug!(count = env_count, "applied environment variable fallbacks");
    }

    let config: Config = merged
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::ParseError {
            path: "<merged config>".to_owned(),
            source: e,
        })?;

    validate::validate(&config)?;

    Ok(ResolvedConfig {
        config,
        field_sources,
        loaded_files,
    })
}

fn default_user_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "consent-ledger").map(|d| d.config_dir().to_path_buf())
}

/// Path of the platform user config file, if a home directory is known.
#[must_use]
pub fn user_config_path() -> Option<PathBuf> {
    default_user_dir().map(|dir| dir.join("config.toml"))
}

/// Try to load a file, returning `None` if it does not exist.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.display().to_string(),
                source: e,
            });
        },
    };

    if content.len() > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {} bytes, exceeding the {MAX_CONFIG_FILE_SIZE} byte limit",
                content.len()
            ),
        });
    }

    let value: toml::Value = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_defaults_with_empty_user_dir() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = load(None, Some(dir.path())).unwrap();
        assert_eq!(resolved.config.blob_store.api_url, "https://api.pinata.cloud");
        assert!(resolved.loaded_files.is_empty());
        assert_eq!(
            resolved.field_sources["ledger.confirmation_timeout_secs"],
            ConfigLayer::Defaults
        );
    }

    #[test]
    fn explicit_file_overrides_user_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.toml"),
            "[ledger]\nfallback_scan_floor = 10\nconfirmation_timeout_secs = 60\n",
        )
        .unwrap();
        let explicit = dir.path().join("explicit.toml");
        std::fs::write(&explicit, "[ledger]\nfallback_scan_floor = 20\n").unwrap();

        let resolved = load(Some(&explicit), Some(dir.path())).unwrap();
        assert_eq!(resolved.config.ledger.fallback_scan_floor, 20);
        assert_eq!(resolved.config.ledger.confirmation_timeout_secs, 60);
        assert_eq!(resolved.loaded_files.len(), 2);
        assert_eq!(
            resolved.field_sources["ledger.fallback_scan_floor"],
            ConfigLayer::Explicit
        );
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(Some(&dir.path().join("nope.toml")), Some(dir.path())).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.toml"), "[ledger\n").unwrap();
        assert!(matches!(
            load(None, Some(dir.path())),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn invalid_values_fail_validation() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.toml"),
            "[logging]\nformat = \"xml\"\n",
        )
        .unwrap();
        assert!(matches!(
            load(None, Some(dir.path())),
            Err(ConfigError::ValidationError { .. })
        ));
    }
}
