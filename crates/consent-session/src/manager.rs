//! Session manager: the single owner of the signer binding.

use consent_crypto::Address;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{SessionError, SessionResult};
use crate::provider::{ProviderNotification, SessionProvider, TransactionSigner};

/// Default capacity of the session event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// An established binding to one account.
#[derive(Clone)]
pub struct ConnectedSession {
    /// Active account.
    pub address: Address,
    /// Chain the account was connected on.
    pub chain_id: u64,
    signer: Arc<dyn TransactionSigner>,
}

impl ConnectedSession {
    /// Shared handle to the signer for this account.
    #[must_use]
    pub fn signer(&self) -> Arc<dyn TransactionSigner> {
        Arc::clone(&self.signer)
    }
}

impl fmt::Debug for ConnectedSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectedSession")
            .field("address", &self.address)
            .field("chain_id", &self.chain_id)
            .finish_non_exhaustive()
    }
}

/// Session lifecycle state.
#[derive(Debug, Clone, Default)]
pub enum SessionState {
    /// No signer bound.
    #[default]
    Disconnected,
    /// Waiting on the provider to grant account access.
    Connecting,
    /// Signer bound to an account.
    Connected(ConnectedSession),
}

impl SessionState {
    /// Whether a signer is bound.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected(_))
    }
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisconnectReason {
    /// The caller asked for it.
    Requested,
    /// The provider reported an empty account list.
    AccountsCleared,
    /// The provider switched to a different account.
    AccountSwitched,
    /// The provider switched chains; the old signer is stale.
    ChainChanged,
}

/// Lifecycle events observable by callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A session was established.
    Connected {
        /// Active account.
        address: Address,
        /// Chain id at connect time.
        chain_id: u64,
    },
    /// An established session ended.
    Disconnected {
        /// Why it ended.
        reason: DisconnectReason,
    },
    /// The provider changed chains. Callers must reconnect before writing.
    ChainChanged {
        /// New chain id.
        chain_id: u64,
    },
}

/// Owns the [`SessionState`] and reacts to provider notifications.
///
/// Share it as `Arc<SessionManager>`; writers borrow it to obtain the current
/// signer and never mutate it. Notification handling runs on one listener
/// task, so notifications are processed strictly one at a time.
///
/// A disconnect does not cancel writes already in flight: they hold their
/// own clone of the signer and complete (or fail) against it.
pub struct SessionManager {
    provider: Arc<dyn SessionProvider>,
    state: watch::Sender<SessionState>,
    events: broadcast::Sender<SessionEvent>,
    connect_lock: Mutex<()>,
    /// Bumped on every reset; a connect started under an older value is void.
    generation: AtomicU64,
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Create a manager in the `Disconnected` state.
    #[must_use]
    pub fn new(provider: Arc<dyn SessionProvider>) -> Arc<Self> {
        let (state, _) = watch::channel(SessionState::Disconnected);
        let (events, _) = broadcast::channel(DEFAULT_EVENT_CAPACITY);
        Arc::new(Self {
            provider,
            state,
            events,
            connect_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
        })
    }

    /// Create a manager and subscribe to provider notifications.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn start(provider: Arc<dyn SessionProvider>) -> Arc<Self> {
        let manager = Self::new(provider);
        // The listener exits on its own once the manager or the provider
        // channel goes away.
        drop(manager.spawn_listener());
        manager
    }

    /// Spawn the notification listener.
    ///
    /// The task holds only a weak reference to the manager.
    pub fn spawn_listener(self: &Arc<Self>) -> JoinHandle<()> {
        let mut notifications = self.provider.subscribe();
        let manager = Arc::downgrade(self);

        tokio::spawn(async move {
            loop {
                match notifications.recv().await {
                    Ok(notification) => {
                        let Some(manager) = manager.upgrade() else {
                            break;
                        };
                        manager.handle_notification(notification).await;
                    },
                    Err(broadcast::error::RecvError::Lagged(count)) => {
                        warn!(skipped = count, "session notifications dropped");
                    },
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            debug!("session notification listener stopped");
        })
    }

    /// Establish a session, or confirm the existing one.
    ///
    /// Returns `true` if connected afterwards. An existing session
    /// short-circuits without contacting the provider. Failures are logged
    /// and reported as `false`; they are never retried here.
    pub async fn connect(&self) -> bool {
        if self.is_connected() {
            return true;
        }

        let _guard = self.connect_lock.lock().await;
        // Another caller may have connected while we waited.
        if self.is_connected() {
            return true;
        }

        if !self.provider.is_available() {
            warn!("no signing environment available");
            return false;
        }

        let generation = self.generation.load(Ordering::SeqCst);
        self.state.send_replace(SessionState::Connecting);
        match self.establish().await {
            Ok(session) => {
                let (address, chain_id) = (session.address, session.chain_id);
                let stored = self.state.send_if_modified(|state| {
                    if self.generation.load(Ordering::SeqCst) != generation {
                        return false;
                    }
                    *state = SessionState::Connected(session);
                    self.publish(SessionEvent::Connected { address, chain_id });
                    true
                });
                if stored {
                    info!(%address, chain_id, "session connected");
                } else {
                    warn!(%address, "session reset while connecting, discarding");
                }
                stored
            },
            Err(e) => {
                warn!(error = %e, "session connect failed");
                self.state.send_if_modified(|state| {
                    if self.generation.load(Ordering::SeqCst) != generation {
                        return false;
                    }
                    *state = SessionState::Disconnected;
                    true
                });
                false
            },
        }
    }

    async fn establish(&self) -> SessionResult<ConnectedSession> {
        let accounts = self.provider.request_accounts().await?;
        let address = accounts
            .first()
            .copied()
            .ok_or_else(|| SessionError::Denied("no accounts exposed".to_string()))?;
        let chain_id = self.provider.chain_id().await?;
        let signer = self.provider.signer(&address)?;
        Ok(ConnectedSession {
            address,
            chain_id,
            signer,
        })
    }

    /// Drop the current session, if any.
    pub fn disconnect(&self) {
        self.reset(DisconnectReason::Requested);
    }

    fn reset(&self, reason: DisconnectReason) {
        self.state.send_modify(|state| {
            self.generation.fetch_add(1, Ordering::SeqCst);
            let previous = std::mem::take(state);
            if previous.is_connected() {
                info!(?reason, "session disconnected");
                self.publish(SessionEvent::Disconnected { reason });
            }
        });
    }

    fn publish(&self, event: SessionEvent) {
        // No receivers is fine.
        let _ = self.events.send(event);
    }

    /// Apply one provider notification.
    pub async fn handle_notification(&self, notification: ProviderNotification) {
        match notification {
            ProviderNotification::AccountsChanged { accounts } => {
                let Some(first) = accounts.first().copied() else {
                    self.reset(DisconnectReason::AccountsCleared);
                    return;
                };
                if self.current_address() == Some(first) {
                    debug!(address = %first, "active account unchanged");
                    return;
                }
                self.reset(DisconnectReason::AccountSwitched);
                self.connect().await;
            },
            ProviderNotification::ChainChanged { chain_id } => {
                info!(chain_id, "chain changed, dropping session");
                self.reset(DisconnectReason::ChainChanged);
                self.publish(SessionEvent::ChainChanged { chain_id });
            },
        }
    }

    /// Whether a signer is bound. No I/O.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state.borrow().is_connected()
    }

    /// Snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Active account, if connected.
    #[must_use]
    pub fn current_address(&self) -> Option<Address> {
        match &*self.state.borrow() {
            SessionState::Connected(session) => Some(session.address),
            _ => None,
        }
    }

    /// Signer for the active account, if connected.
    #[must_use]
    pub fn current_signer(&self) -> Option<Arc<dyn TransactionSigner>> {
        match &*self.state.borrow() {
            SessionState::Connected(session) => Some(session.signer()),
            _ => None,
        }
    }

    /// Native balance of the active account, or `None` when disconnected.
    ///
    /// # Errors
    ///
    /// Returns the provider's error if the balance lookup fails.
    pub async fn balance(&self) -> SessionResult<Option<u128>> {
        let Some(address) = self.current_address() else {
            return Ok(None);
        };
        self.provider.balance(&address).await.map(Some)
    }

    /// Watch state transitions.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Subscribe to lifecycle events.
    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}
