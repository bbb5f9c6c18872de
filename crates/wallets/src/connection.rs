//! Ownership of the single active connector.

use crate::{
    connector::{Connector, SessionInfo, Subscription},
    error::{ConnectionError, DeactivationError, SwitchError},
    host::{LogReload, NameResolver, Reload},
    registry::ConnectorRegistry,
    store::{ConnectorStore, MemoryConnectorStore},
};
use alloy_primitives::{Address, ChainId, TxHash};
use alloy_rpc_types::TransactionRequest;
use futures::channel::mpsc::UnboundedReceiver;
use parking_lot::{Mutex, RwLock};
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use walletdeck_common::{Listeners, MisusePolicy};

/// Where the connection currently stands.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    /// Activation of the named connector is in flight.
    Connecting(String),
    Connected,
}

/// Snapshot of the wallet connection.
///
/// Only [`ConnectionManager`] creates non-default values, which keeps the invariants: a
/// connected state always carries an account, and the active connector is always registered.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConnectionState {
    status: ConnectionStatus,
    active_connector: Option<String>,
    account: Option<Address>,
    resolved_name: Option<String>,
    chain_id: Option<ChainId>,
}

impl ConnectionState {
    fn connecting(connector_id: &str) -> Self {
        Self { status: ConnectionStatus::Connecting(connector_id.to_string()), ..Default::default() }
    }

    fn connected(connector_id: &str, session: SessionInfo, resolved_name: Option<String>) -> Self {
        Self {
            status: ConnectionStatus::Connected,
            active_connector: Some(connector_id.to_string()),
            account: Some(session.account),
            resolved_name,
            chain_id: Some(session.chain_id),
        }
    }

    pub fn status(&self) -> &ConnectionStatus {
        &self.status
    }

    /// Returns `true` if a wallet session is established.
    pub fn is_active(&self) -> bool {
        self.status == ConnectionStatus::Connected
    }

    /// The connector whose activation is in flight, if any.
    pub fn connecting_to(&self) -> Option<&str> {
        match &self.status {
            ConnectionStatus::Connecting(id) => Some(id),
            _ => None,
        }
    }

    pub fn active_connector(&self) -> Option<&str> {
        self.active_connector.as_deref()
    }

    pub fn account(&self) -> Option<Address> {
        self.account
    }

    pub fn resolved_name(&self) -> Option<&str> {
        self.resolved_name.as_deref()
    }

    pub fn chain_id(&self) -> Option<ChainId> {
        self.chain_id
    }

    /// The active session, if connected.
    pub fn session(&self) -> Option<SessionInfo> {
        match (self.is_active(), self.account, self.chain_id) {
            (true, Some(account), Some(chain_id)) => Some(SessionInfo { account, chain_id }),
            _ => None,
        }
    }

    /// The resolved name, or the account shortened to `0x1234...abcd`.
    pub fn display_name(&self) -> Option<String> {
        if let Some(name) = &self.resolved_name {
            return Some(name.clone());
        }
        self.account.map(|account| {
            let checksummed = account.to_checksum(None);
            format!("{}...{}", &checksummed[..6], &checksummed[checksummed.len() - 4..])
        })
    }
}

/// Outcome of [`ConnectionManager::deactivate`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Deactivation {
    /// The provider ended the session and the state was cleared.
    Disconnected,
    /// The connector cannot disconnect programmatically; the user has to disconnect from the
    /// wallet itself. Nothing was changed.
    WalletSideOnly,
    /// An in-flight activation was abandoned. Its eventual success is still applied unless a
    /// newer activation settled first or targets another connector.
    Abandoned,
    /// Nothing was connected.
    NotConnected,
}

/// Drives activation and deactivation of connectors and owns the [`ConnectionState`].
///
/// Cheap to clone; all clones share the same state.
#[derive(Clone, Debug)]
pub struct ConnectionManager {
    inner: Arc<ManagerInner>,
}

#[derive(Debug)]
struct ManagerInner {
    registry: ConnectorRegistry,
    state: RwLock<ConnectionState>,
    /// Number of the latest activation attempt. Only changed while `state` is write locked.
    attempts: AtomicU64,
    /// Chain-changed subscription of the connected connector.
    chain_subscription: Mutex<Option<Subscription>>,
    store: Arc<dyn ConnectorStore>,
    reload: Arc<dyn Reload>,
    resolver: Option<Arc<dyn NameResolver>>,
    misuse: MisusePolicy,
    listeners: Listeners<ConnectionState>,
}

/// Helper type to construct a [`ConnectionManager`].
#[derive(Debug)]
pub struct ConnectionManagerBuilder {
    registry: ConnectorRegistry,
    store: Arc<dyn ConnectorStore>,
    reload: Arc<dyn Reload>,
    resolver: Option<Arc<dyn NameResolver>>,
    misuse: MisusePolicy,
}

impl ConnectionManagerBuilder {
    /// Where the last active connector is remembered. Defaults to memory only.
    pub fn store(mut self, store: Arc<dyn ConnectorStore>) -> Self {
        self.store = store;
        self
    }

    /// What to do when the wallet changes chains. Defaults to [`LogReload`].
    pub fn reload(mut self, reload: Arc<dyn Reload>) -> Self {
        self.reload = reload;
        self
    }

    /// Resolves connected accounts to names.
    pub fn resolver(mut self, resolver: Arc<dyn NameResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// How connectors that misreport their capabilities are handled.
    pub fn misuse(mut self, misuse: MisusePolicy) -> Self {
        self.misuse = misuse;
        self
    }

    pub fn build(self) -> ConnectionManager {
        let Self { registry, store, reload, resolver, misuse } = self;
        ConnectionManager {
            inner: Arc::new(ManagerInner {
                registry,
                state: RwLock::new(ConnectionState::default()),
                attempts: AtomicU64::new(0),
                chain_subscription: Mutex::new(None),
                store,
                reload,
                resolver,
                misuse,
                listeners: Listeners::new(),
            }),
        }
    }
}

// === impl ConnectionManager ===

impl ConnectionManager {
    pub fn builder(registry: ConnectorRegistry) -> ConnectionManagerBuilder {
        ConnectionManagerBuilder {
            registry,
            store: Arc::new(MemoryConnectorStore::new()),
            reload: Arc::new(LogReload),
            resolver: None,
            misuse: MisusePolicy::default(),
        }
    }

    pub fn new(registry: ConnectorRegistry) -> Self {
        Self::builder(registry).build()
    }

    pub fn registry(&self) -> &ConnectorRegistry {
        &self.inner.registry
    }

    /// Returns a snapshot of the current state.
    pub fn state(&self) -> ConnectionState {
        self.inner.state.read().clone()
    }

    /// Returns a stream yielding a snapshot after every state change.
    pub fn subscribe(&self) -> UnboundedReceiver<ConnectionState> {
        self.inner.listeners.subscribe()
    }

    /// Activates the connector registered as `connector_id`.
    ///
    /// A connected connector with a different id is deactivated first. Fails with
    /// [`ConnectionError::ActivationInFlight`] without touching the provider while another
    /// activation is unresolved.
    ///
    /// Results of abandoned attempts never undo a newer attempt. A late success for the
    /// connector that is already connected returns the current session.
    pub async fn activate(&self, connector_id: &str) -> Result<SessionInfo, ConnectionError> {
        let connector = self
            .inner
            .registry
            .get(connector_id)
            .cloned()
            .ok_or_else(|| ConnectionError::UnknownConnector(connector_id.to_string()))?;

        let (attempt, previous) = {
            let mut state = self.inner.state.write();
            if let Some(pending) = state.connecting_to() {
                return Err(ConnectionError::ActivationInFlight(pending.to_string()));
            }
            if state.active_connector() == Some(connector_id)
                && let Some(session) = state.session()
            {
                trace!(target: "wallets::connection", connector = connector_id, "already connected");
                return Ok(session);
            }
            let previous = state.active_connector.take();
            *state = ConnectionState::connecting(connector_id);
            (self.inner.attempts.fetch_add(1, Ordering::Relaxed) + 1, previous)
        };
        self.publish();

        let replaced = previous.is_some();
        if let Some(previous) = previous {
            self.release_provider(&previous).await;
        }

        debug!(target: "wallets::connection", connector = connector_id, attempt, "activating");
        match connector.activate().await {
            Ok(session) => {
                let resolved_name = self.resolve_name(session.account).await;
                self.apply_session(&connector, attempt, session, resolved_name)
            }
            Err(source) => {
                warn!(target: "wallets::connection", connector = connector_id, attempt, %source, "activation failed");
                let rolled_back = {
                    let mut state = self.inner.state.write();
                    let pending = self.is_latest(attempt) && state.connecting_to() == Some(connector_id);
                    if pending {
                        *state = ConnectionState::default();
                    }
                    pending
                };
                if rolled_back {
                    // the replaced connector was released, don't restore it on the next start
                    if replaced {
                        self.inner.store.clear();
                    }
                    self.publish();
                }
                Err(ConnectionError::Activation { connector: connector_id.to_string(), source })
            }
        }
    }

    /// Re-activates the connector that was active last time, without user interaction.
    ///
    /// Failures are logged and leave the state disconnected.
    pub async fn auto_connect(&self) -> Option<SessionInfo> {
        let connector_id = self.inner.store.load()?;
        if !self.inner.registry.contains(&connector_id) {
            debug!(target: "wallets::connection", connector = %connector_id, "remembered connector is gone");
            self.inner.store.clear();
            return None;
        }
        match self.activate(&connector_id).await {
            Ok(session) => Some(session),
            Err(err) => {
                warn!(target: "wallets::connection", connector = %connector_id, %err, "auto connect failed");
                None
            }
        }
    }

    /// Ends the current session.
    ///
    /// Connectors that cannot disconnect programmatically leave the state untouched and report
    /// [`Deactivation::WalletSideOnly`].
    pub async fn deactivate(&self) -> Result<Deactivation, ConnectionError> {
        let connector_id = {
            let mut state = self.inner.state.write();
            match state.status() {
                ConnectionStatus::Disconnected => return Ok(Deactivation::NotConnected),
                ConnectionStatus::Connecting(id) => {
                    debug!(target: "wallets::connection", connector = %id, "abandoning activation");
                    *state = ConnectionState::default();
                    drop(state);
                    self.publish();
                    return Ok(Deactivation::Abandoned);
                }
                ConnectionStatus::Connected => state.active_connector.clone(),
            }
        };
        let Some(connector) = connector_id.as_deref().and_then(|id| self.inner.registry.get(id)).cloned()
        else {
            self.clear(None);
            return Ok(Deactivation::Disconnected);
        };

        if !connector.supports_deactivate() {
            warn!(target: "wallets::connection", connector = connector.id(), "connector cannot disconnect, wallet-side disconnect required");
            return Ok(Deactivation::WalletSideOnly);
        }

        match connector.deactivate().await {
            Ok(()) => {
                self.clear(Some(connector.id()));
                self.inner.store.clear();
                info!(target: "wallets::connection", connector = connector.id(), "disconnected");
                Ok(Deactivation::Disconnected)
            }
            Err(DeactivationError::Unsupported(err)) => {
                self.inner.misuse.report(&err);
                Ok(Deactivation::WalletSideOnly)
            }
            Err(source) => Err(ConnectionError::Deactivation { connector: connector.id().to_string(), source }),
        }
    }

    /// Asks the active connector to move the wallet to `chain_id`.
    ///
    /// Succeeds without a provider call if the wallet is already on `chain_id`.
    pub async fn switch_network(&self, chain_id: ChainId) -> Result<(), SwitchError> {
        let (connector, current) = self
            .active()
            .map_err(|_| SwitchError::ProviderUnavailable("no wallet is connected".to_string()))?;
        if current.chain_id == chain_id {
            return Ok(());
        }

        debug!(target: "wallets::connection", from = current.chain_id, to = chain_id, "switching network");
        connector.switch_network(chain_id).await?;

        let updated = {
            let mut state = self.inner.state.write();
            let still_active = state.is_active() && state.active_connector() == Some(connector.id());
            if still_active {
                state.chain_id = Some(chain_id);
            }
            still_active
        };
        if updated {
            self.publish();
        }
        Ok(())
    }

    /// Submits `request` through the active connector.
    ///
    /// `from` and `chain_id` default to the active session. Returns the hash together with the
    /// session the transaction was submitted in.
    pub async fn send_transaction(
        &self,
        mut request: TransactionRequest,
    ) -> Result<(TxHash, SessionInfo), ConnectionError> {
        let (connector, session) = self.active()?;
        request.from.get_or_insert(session.account);
        request.chain_id.get_or_insert(session.chain_id);

        let hash = connector.send_transaction(request).await?;
        debug!(target: "wallets::connection", %hash, chain_id = session.chain_id, "transaction submitted");
        Ok((hash, session))
    }

    fn active(&self) -> Result<(Arc<dyn Connector>, SessionInfo), ConnectionError> {
        let state = self.inner.state.read();
        let session = state.session().ok_or(ConnectionError::NotConnected)?;
        let connector = state
            .active_connector()
            .and_then(|id| self.inner.registry.get(id))
            .cloned()
            .ok_or(ConnectionError::NotConnected)?;
        Ok((connector, session))
    }

    /// Returns `true` if no activation was started after `attempt`.
    fn is_latest(&self, attempt: u64) -> bool {
        self.inner.attempts.load(Ordering::Relaxed) == attempt
    }

    /// Applies the outcome of activation `attempt`.
    ///
    /// A pending attempt for the same connector is taken over, even by an older attempt. An
    /// abandoned attempt is only applied if nothing was activated since.
    fn apply_session(
        &self,
        connector: &Arc<dyn Connector>,
        attempt: u64,
        session: SessionInfo,
        resolved_name: Option<String>,
    ) -> Result<SessionInfo, ConnectionError> {
        let id = connector.id();
        {
            let mut state = self.inner.state.write();
            if state.active_connector() == Some(id)
                && let Some(current) = state.session()
            {
                trace!(target: "wallets::connection", connector = id, attempt, "already connected by another attempt");
                return Ok(current);
            }
            match state.status() {
                ConnectionStatus::Connecting(pending) if pending == id => {}
                ConnectionStatus::Disconnected if self.is_latest(attempt) => {
                    debug!(target: "wallets::connection", connector = id, attempt, "applying late activation");
                }
                _ => {
                    debug!(target: "wallets::connection", connector = id, attempt, "activation superseded");
                    return Err(ConnectionError::Superseded(id.to_string()));
                }
            }
            *state = ConnectionState::connected(id, session, resolved_name);
        }

        self.watch_chain(connector);
        self.inner.store.save(id);
        info!(target: "wallets::connection", connector = id, account = %session.account, chain_id = session.chain_id, "connected");
        self.publish();
        Ok(session)
    }

    /// Subscribes to chain changes of `connector`, replacing any previous subscription.
    fn watch_chain(&self, connector: &Arc<dyn Connector>) {
        let reload = self.inner.reload.clone();
        let id = connector.id().to_string();
        let subscription = connector.on_chain_changed(Arc::new(move |chain_id| {
            info!(target: "wallets::connection", connector = %id, chain_id, "chain changed, reloading");
            reload.reload();
        }));
        // the replaced subscription is cancelled on drop
        let _ = self.inner.chain_subscription.lock().replace(subscription);
    }

    /// Tears down a connector that is being replaced. Errors are logged only.
    async fn release_provider(&self, connector_id: &str) {
        self.inner.chain_subscription.lock().take();
        let Some(connector) = self.inner.registry.get(connector_id).cloned() else { return };
        if !connector.supports_deactivate() {
            return;
        }
        if let Err(err) = connector.deactivate().await {
            warn!(target: "wallets::connection", connector = connector_id, %err, "failed to deactivate replaced connector");
        }
    }

    /// Resets the state, if `connector_id` (when given) is still the active connector.
    fn clear(&self, connector_id: Option<&str>) {
        {
            let mut state = self.inner.state.write();
            if connector_id.is_some() && state.active_connector() != connector_id {
                return;
            }
            *state = ConnectionState::default();
        }
        self.inner.chain_subscription.lock().take();
        self.publish();
    }

    async fn resolve_name(&self, account: Address) -> Option<String> {
        let resolver = self.inner.resolver.as_ref()?;
        match resolver.lookup_address(account).await {
            Ok(name) => name,
            Err(err) => {
                debug!(target: "wallets::connection", %account, %err, "name lookup failed");
                None
            }
        }
    }

    fn publish(&self) {
        let state = self.state();
        self.inner.listeners.notify(state);
    }
}
