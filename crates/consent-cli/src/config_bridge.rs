//! Bridge from `consent_config::Config` to domain types.

use anyhow::Context;
use consent_blobstore::BlobStoreConfig;
use consent_config::Config;
use consent_crypto::{Address, TxId};
use consent_ledger::{QueryConfig, SyntheticFallback};
use consent_telemetry::{LogConfig, LogFormat};
use std::time::Duration;

/// Logging configuration from the `[logging]` section.
pub(crate) fn to_log_config(cfg: &Config) -> LogConfig {
    let format = cfg
        .logging
        .format
        .parse::<LogFormat>()
        .unwrap_or_default();
    cfg.logging
        .directives
        .iter()
        .fold(
            LogConfig::new(cfg.logging.level.clone()).with_format(format),
            |lc, directive| lc.with_directive(directive.clone()),
        )
}

/// Blob store settings from the `[blob_store]` section.
pub(crate) fn to_blob_config(cfg: &Config) -> BlobStoreConfig {
    BlobStoreConfig {
        api_url: cfg.blob_store.api_url.clone(),
        gateway_url: cfg.blob_store.gateway_url.clone(),
        jwt: cfg.blob_store.jwt.clone(),
        upload_timeout: Duration::from_secs(cfg.blob_store.upload_timeout_secs),
    }
}

/// The configured contract address.
pub(crate) fn contract_address(cfg: &Config) -> anyhow::Result<Address> {
    cfg.ledger
        .contract_address
        .parse()
        .with_context(|| format!("invalid contract address {}", cfg.ledger.contract_address))
}

/// Query settings from the `[ledger]` section.
pub(crate) fn to_query_config(cfg: &Config) -> anyhow::Result<QueryConfig> {
    let deployment_tx = cfg
        .ledger
        .deployment_tx
        .as_deref()
        .map(TxId::from_hex)
        .transpose()
        .context("invalid deployment transaction hash")?;
    Ok(QueryConfig {
        contract: contract_address(cfg)?,
        deployment_tx,
        fallback_scan_floor: cfg.ledger.fallback_scan_floor,
        synthetic_fallback: SyntheticFallback::from(cfg.ledger.synthetic_fallback),
    })
}

/// How long a write waits for confirmation.
pub(crate) fn confirmation_timeout(cfg: &Config) -> Duration {
    Duration::from_secs(cfg.ledger.confirmation_timeout_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_bridge() {
        let cfg = Config::default();
        let log = to_log_config(&cfg);
        assert_eq!(log.level, "info");
        assert_eq!(log.format, LogFormat::Compact);

        let query = to_query_config(&cfg).unwrap();
        assert!(query.contract.is_zero());
        assert_eq!(query.deployment_tx, None);
        assert_eq!(query.synthetic_fallback, SyntheticFallback::Enabled);

        assert_eq!(to_blob_config(&cfg).upload_timeout, Duration::from_secs(30));
        assert_eq!(confirmation_timeout(&cfg), Duration::from_secs(120));
    }

    #[test]
    fn test_directives_and_fallback() {
        let mut cfg = Config::default();
        cfg.logging.directives = vec!["consent_ledger=debug".to_string()];
        cfg.logging.format = "json".to_string();
        cfg.ledger.synthetic_fallback = false;

        let log = to_log_config(&cfg);
        assert_eq!(log.directives, vec!["consent_ledger=debug"]);
        assert_eq!(log.format, LogFormat::Json);
        assert_eq!(
            to_query_config(&cfg).unwrap().synthetic_fallback,
            SyntheticFallback::Disabled
        );
    }

    #[test]
    fn test_bad_deployment_tx() {
        let mut cfg = Config::default();
        cfg.ledger.deployment_tx = Some("0x1234".to_string());
        assert!(to_query_config(&cfg).is_err());
    }
}
