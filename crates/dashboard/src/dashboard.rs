use crate::DashboardError;
use alloy_primitives::TxHash;
use alloy_rpc_types::TransactionRequest;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;
use walletdeck_common::MisusePolicy;
use walletdeck_config::Config;
use walletdeck_transactions::{
    Badge, Navigator, NoopNavigator, OpenDialog, StatusSource, TransactionDialog,
    TransactionLedger, TransactionRecord, TransactionWatcher,
};
use walletdeck_wallets::{
    ConnectionError, ConnectionManager, ConnectorRegistry, ConnectorStore, FileConnectorStore,
    LogReload, MemoryConnectorStore, NameResolver, NetworkCoordinator, Reload, SessionInfo,
};

/// Helper type to construct a [`Dashboard`].
#[derive(Debug)]
pub struct DashboardBuilder {
    config: Config,
    registry: ConnectorRegistry,
    store: Option<Arc<dyn ConnectorStore>>,
    reload: Arc<dyn Reload>,
    navigator: Arc<dyn Navigator>,
    resolver: Option<Arc<dyn NameResolver>>,
    status_source: Option<Arc<dyn StatusSource>>,
}

impl DashboardBuilder {
    pub fn new(config: Config, registry: ConnectorRegistry) -> Self {
        Self {
            config,
            registry,
            store: None,
            reload: Arc::new(LogReload),
            navigator: Arc::new(NoopNavigator),
            resolver: None,
            status_source: None,
        }
    }

    /// Where the last connector is remembered.
    ///
    /// Defaults to a [`FileConnectorStore`] in the configured storage directory.
    pub fn store(mut self, store: Arc<dyn ConnectorStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn reload(mut self, reload: Arc<dyn Reload>) -> Self {
        self.reload = reload;
        self
    }

    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = navigator;
        self
    }

    pub fn resolver(mut self, resolver: Arc<dyn NameResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Enables the transaction watcher.
    pub fn status_source(mut self, source: Arc<dyn StatusSource>) -> Self {
        self.status_source = Some(source);
        self
    }

    /// Validates the config and wires the stores together.
    pub fn build(self) -> Result<Dashboard, DashboardError> {
        let Self { config, registry, store, reload, navigator, resolver, status_source } = self;
        config.validate()?;

        let misuse = MisusePolicy::from_strict(config.strict_misuse);
        let store: Arc<dyn ConnectorStore> = match (store, FileConnectorStore::from_config(&config)) {
            (Some(store), _) => store,
            (None, Some(file)) => Arc::new(file),
            (None, None) => {
                warn!(target: "dashboard", "no storage directory, the last connector is not persisted");
                Arc::new(MemoryConnectorStore::new())
            }
        };

        let mut manager = ConnectionManager::builder(registry).store(store).reload(reload).misuse(misuse);
        if let Some(resolver) = resolver {
            manager = manager.resolver(resolver);
        }
        let manager = manager.build();
        let network = NetworkCoordinator::new(manager.clone(), config.chain_id);

        Ok(Dashboard {
            misuse,
            manager,
            network,
            ledger: TransactionLedger::new(),
            dialog: TransactionDialog::new(navigator),
            status_source,
            tasks: Mutex::new(Vec::new()),
            config,
        })
    }
}

/// The coordinator behind a dapp dashboard.
///
/// Background tasks started by [`Dashboard::start`] are aborted when the dashboard is dropped.
#[derive(Debug)]
pub struct Dashboard {
    config: Config,
    misuse: MisusePolicy,
    manager: ConnectionManager,
    network: NetworkCoordinator,
    ledger: TransactionLedger,
    dialog: TransactionDialog,
    status_source: Option<Arc<dyn StatusSource>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Dashboard {
    pub fn builder(config: Config, registry: ConnectorRegistry) -> DashboardBuilder {
        DashboardBuilder::new(config, registry)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn manager(&self) -> &ConnectionManager {
        &self.manager
    }

    pub fn network(&self) -> &NetworkCoordinator {
        &self.network
    }

    pub fn ledger(&self) -> &TransactionLedger {
        &self.ledger
    }

    pub fn dialog(&self) -> &TransactionDialog {
        &self.dialog
    }

    /// Restores the last session if configured, then starts following the wallet chain and,
    /// with a status source, pending transactions.
    ///
    /// Must be called from within a tokio runtime. Calling it again only reconnects.
    pub async fn start(&self) -> Option<SessionInfo> {
        let session = if self.config.auto_connect { self.manager.auto_connect().await } else { None };

        let mut tasks = self.tasks.lock();
        if tasks.is_empty() {
            tasks.push(self.network.spawn_sync());
            if let Some(source) = &self.status_source {
                let watcher = TransactionWatcher::new(
                    self.ledger.clone(),
                    source.clone(),
                    self.config.tx_poll_interval(),
                );
                tasks.push(watcher.spawn());
            }
        }
        info!(target: "dashboard", app = %self.config.app_name, chain = %self.config.chain(), connected = session.is_some(), "dashboard started");
        session
    }

    /// Submits `request` through the connected wallet and tracks it.
    ///
    /// The dialog is opened for `kind` before the wallet is asked and shows the hash or the
    /// error afterwards. Refused while disconnected or on the wrong chain.
    pub async fn submit_transaction(
        &self,
        request: TransactionRequest,
        kind: impl Into<String>,
        metadata: serde_json::Value,
    ) -> Result<TxHash, DashboardError> {
        if !self.manager.state().is_active() {
            return Err(ConnectionError::NotConnected.into());
        }
        self.network.ensure_chain()?;

        let kind = kind.into();
        self.dialog.open(OpenDialog::new(kind.clone()).metadata(metadata.clone()));

        let (hash, session) = match self.manager.send_transaction(request).await {
            Ok(submitted) => submitted,
            Err(err) => {
                debug!(target: "dashboard", %err, "transaction submission failed");
                self.dialog.set_error(&err);
                return Err(err.into());
            }
        };

        let record =
            TransactionRecord::new(hash, session.chain_id, kind, metadata).with_from(session.account);
        if let Err(err) = self.ledger.insert(record) {
            self.misuse.report(&err);
        }
        self.dialog.set_hash(hash);
        Ok(hash)
    }

    /// The notification badge for the connected chain. Hidden while disconnected.
    pub fn badge(&self) -> Badge {
        match self.manager.state().session() {
            Some(session) => self.ledger.badge(session.chain_id),
            None => Badge::Hidden,
        }
    }

    /// Acknowledges every transaction, as opening the notifications view does.
    pub fn open_notifications(&self) -> usize {
        self.ledger.mark_all_checked()
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        for task in self.tasks.get_mut().drain(..) {
            task.abort();
        }
    }
}
