//! Post-merge configuration validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Upper bound for any timeout knob (one hour).
const MAX_TIMEOUT_SECS: u64 = 3600;

/// Validate a fully-merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_blob_store(config)?;
    validate_ledger(config)?;
    validate_logging(config)?;
    Ok(())
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_owned(),
        message: message.into(),
    }
}

fn validate_http_url(field: &str, raw: &str) -> ConfigResult<()> {
    let parsed = url::Url::parse(raw).map_err(|e| invalid(field, format!("'{raw}': {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid(field, format!("'{raw}' must use http or https")));
    }
    Ok(())
}

fn validate_timeout(field: &str, secs: u64) -> ConfigResult<()> {
    if secs == 0 || secs > MAX_TIMEOUT_SECS {
        return Err(invalid(
            field,
            format!("must be between 1 and {MAX_TIMEOUT_SECS} seconds"),
        ));
    }
    Ok(())
}

fn is_prefixed_hex(raw: &str, digits: usize) -> bool {
    raw.strip_prefix("0x")
        .is_some_and(|h| h.len() == digits && h.chars().all(|c| c.is_ascii_hexdigit()))
}

fn validate_blob_store(config: &Config) -> ConfigResult<()> {
    let b = &config.blob_store;
    validate_http_url("blob_store.api_url", &b.api_url)?;
    validate_http_url("blob_store.gateway_url", &b.gateway_url)?;
    validate_timeout("blob_store.upload_timeout_secs", b.upload_timeout_secs)
}

fn validate_ledger(config: &Config) -> ConfigResult<()> {
    let l = &config.ledger;
    if !is_prefixed_hex(&l.contract_address, 40) {
        return Err(invalid(
            "ledger.contract_address",
            "expected 0x followed by 40 hex digits",
        ));
    }
    if let Some(tx) = &l.deployment_tx
        && !is_prefixed_hex(tx, 64)
    {
        return Err(invalid(
            "ledger.deployment_tx",
            "expected 0x followed by 64 hex digits",
        ));
    }
    validate_timeout(
        "ledger.confirmation_timeout_secs",
        l.confirmation_timeout_secs,
    )
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let log = &config.logging;
    if !matches!(
        log.level.as_str(),
        "error" | "warn" | "info" | "debug" | "trace"
    ) {
        return Err(invalid(
            "logging.level",
            format!("unsupported level '{}'", log.level),
        ));
    }
    if !matches!(log.format.as_str(), "pretty" | "compact" | "json") {
        return Err(invalid(
            "logging.format",
            format!(
                "unsupported format '{}'; expected one of: pretty, compact, json",
                log.format
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        validate(&Config::default()).unwrap();
    }

    #[test]
    fn rejects_bad_contract_address() {
        let mut config = Config::default();
        config.ledger.contract_address = "0x1234".to_owned();
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("ledger.contract_address"));
    }

    #[test]
    fn rejects_bad_deployment_tx() {
        let mut config = Config::default();
        config.ledger.deployment_tx = Some("deadbeef".to_owned());
        assert!(validate(&config).is_err());
    }

    #[test]
    fn rejects_zero_timeout() {
        let mut config = Config::default();
        config.blob_store.upload_timeout_secs = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn rejects_non_http_url() {
        let mut config = Config::default();
        config.blob_store.api_url = "ftp://example.com".to_owned();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn rejects_unknown_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_owned();
        assert!(validate(&config).is_err());
    }
}
