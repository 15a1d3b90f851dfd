//! Wiring of configuration into a ready-to-use recorder.

use consent_blobstore::BlobStoreClient;
use consent_config::Config;
use consent_ledger::{EventQuery, LedgerEndpoint, LedgerWriter, MemoryLedger};
use consent_recorder::ConsentRecorder;
use consent_session::SessionManager;
use std::sync::Arc;
use tracing::debug;

use crate::config_bridge;
use crate::wallet::LocalWallet;

/// Recorder backed by an in-process ledger with the consent contract
/// deployed at the configured address.
pub(crate) struct App {
    pub(crate) recorder: ConsentRecorder,
}

impl App {
    /// Build the offline stack. Must run inside a tokio runtime.
    pub(crate) fn offline(config: &Config) -> anyhow::Result<Self> {
        let contract = config_bridge::contract_address(config)?;
        let ledger = MemoryLedger::new();
        let deployment = ledger.deploy(contract)?;
        debug!(%contract, %deployment, "local ledger ready");

        // The configured deployment transaction belongs to a remote ledger.
        let mut query_config = config_bridge::to_query_config(config)?;
        query_config.deployment_tx = Some(deployment);

        let endpoint: Arc<dyn LedgerEndpoint> = Arc::new(ledger.clone());
        let session = SessionManager::start(LocalWallet::new(ledger));
        let writer = LedgerWriter::new(Arc::clone(&endpoint), contract)
            .with_confirmation_timeout(config_bridge::confirmation_timeout(config));
        let query = EventQuery::new(endpoint, query_config);
        let blob_store = BlobStoreClient::from_config(&config_bridge::to_blob_config(config))?;

        Ok(Self {
            recorder: ConsentRecorder::new(blob_store, session, writer, query),
        })
    }

    /// Connect the local wallet.
    pub(crate) async fn connect(&self) -> bool {
        self.recorder.session().connect().await
    }
}
