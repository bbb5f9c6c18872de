use alloy_primitives::{Address, ChainId, TxHash};
use alloy_rpc_types::TransactionRequest;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::{
    collections::VecDeque,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};
use tokio::sync::Notify;
use walletdeck_wallets::{
    ActivationError, ChainChangedHandler, Connector, DeactivationError, SessionInfo, SubmitError,
    Subscription, SwitchError,
};

/// A scripted [`Connector`].
///
/// Clones share their script and counters, so a test can keep a handle after registering the
/// connector. Unscripted calls succeed: activation reports the configured session, switches move
/// the wallet and emit a chain-changed event, submissions return increasing hashes.
#[derive(Clone, Debug)]
pub struct MockConnector {
    id: String,
    supports_deactivate: bool,
    inner: Arc<MockInner>,
}

#[derive(Debug)]
struct MockInner {
    state: Mutex<MockState>,
    gate: Mutex<Option<Arc<Notify>>>,
    activations: AtomicUsize,
    deactivations: AtomicUsize,
    switches: AtomicUsize,
}

#[derive(Default)]
struct MockState {
    account: Address,
    chain_id: ChainId,
    activations: VecDeque<Result<SessionInfo, ActivationError>>,
    switches: VecDeque<Result<(), SwitchError>>,
    submissions: VecDeque<Result<TxHash, SubmitError>>,
    sent: Vec<TransactionRequest>,
    next_hash: u8,
    handlers: Vec<(usize, ChainChangedHandler)>,
    next_handler: usize,
}

impl std::fmt::Debug for MockState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockState")
            .field("account", &self.account)
            .field("chain_id", &self.chain_id)
            .field("handlers", &self.handlers.len())
            .finish_non_exhaustive()
    }
}

impl MockConnector {
    /// A connector reporting `account` on `chain_id` that cannot deactivate.
    pub fn new(id: impl Into<String>, account: Address, chain_id: ChainId) -> Self {
        Self {
            id: id.into(),
            supports_deactivate: false,
            inner: Arc::new(MockInner {
                state: Mutex::new(MockState { account, chain_id, next_hash: 1, ..Default::default() }),
                gate: Mutex::new(None),
                activations: AtomicUsize::new(0),
                deactivations: AtomicUsize::new(0),
                switches: AtomicUsize::new(0),
            }),
        }
    }

    pub fn with_deactivate(mut self) -> Self {
        self.supports_deactivate = true;
        self
    }

    /// Queues the result of the next activation.
    pub fn push_activation(&self, result: Result<SessionInfo, ActivationError>) {
        self.inner.state.lock().activations.push_back(result);
    }

    /// Queues the result of the next network switch.
    pub fn push_switch(&self, result: Result<(), SwitchError>) {
        self.inner.state.lock().switches.push_back(result);
    }

    /// Queues the result of the next submission.
    pub fn push_submission(&self, result: Result<TxHash, SubmitError>) {
        self.inner.state.lock().submissions.push_back(result);
    }

    /// Makes activations started from now on wait until the returned gate is notified.
    pub fn hold_activation(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.inner.gate.lock() = Some(gate.clone());
        gate
    }

    /// Changes the wallet chain as if the user switched it, notifying subscribers.
    pub fn emit_chain_changed(&self, chain_id: ChainId) {
        let handlers: Vec<_> = {
            let mut state = self.inner.state.lock();
            state.chain_id = chain_id;
            state.handlers.iter().map(|(_, handler)| handler.clone()).collect()
        };
        for handler in handlers {
            handler(chain_id);
        }
    }

    pub fn chain_id(&self) -> ChainId {
        self.inner.state.lock().chain_id
    }

    pub fn activations(&self) -> usize {
        self.inner.activations.load(Ordering::SeqCst)
    }

    pub fn deactivations(&self) -> usize {
        self.inner.deactivations.load(Ordering::SeqCst)
    }

    pub fn switches(&self) -> usize {
        self.inner.switches.load(Ordering::SeqCst)
    }

    /// Number of live chain-changed subscriptions.
    pub fn subscribers(&self) -> usize {
        self.inner.state.lock().handlers.len()
    }

    /// Requests submitted so far.
    pub fn sent(&self) -> Vec<TransactionRequest> {
        self.inner.state.lock().sent.clone()
    }
}

#[async_trait]
impl Connector for MockConnector {
    fn id(&self) -> &str {
        &self.id
    }

    async fn activate(&self) -> Result<SessionInfo, ActivationError> {
        let gate = self.inner.gate.lock().clone();
        self.inner.activations.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let mut state = self.inner.state.lock();
        match state.activations.pop_front() {
            Some(result) => {
                if let Ok(session) = &result {
                    state.account = session.account;
                    state.chain_id = session.chain_id;
                }
                result
            }
            None => Ok(SessionInfo::new(state.account, state.chain_id)),
        }
    }

    fn supports_deactivate(&self) -> bool {
        self.supports_deactivate
    }

    async fn deactivate(&self) -> Result<(), DeactivationError> {
        if !self.supports_deactivate {
            return Err(walletdeck_wallets::UnsupportedOperation::new(&self.id, "deactivate").into());
        }
        self.inner.deactivations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn switch_network(&self, chain_id: ChainId) -> Result<(), SwitchError> {
        self.inner.switches.fetch_add(1, Ordering::SeqCst);
        let result = self.inner.state.lock().switches.pop_front().unwrap_or(Ok(()));
        result?;
        self.emit_chain_changed(chain_id);
        Ok(())
    }

    fn on_chain_changed(&self, handler: ChainChangedHandler) -> Subscription {
        let id = {
            let mut state = self.inner.state.lock();
            let id = state.next_handler;
            state.next_handler += 1;
            state.handlers.push((id, handler));
            id
        };
        let inner = self.inner.clone();
        Subscription::new(move || inner.state.lock().handlers.retain(|(other, _)| *other != id))
    }

    async fn send_transaction(&self, request: TransactionRequest) -> Result<TxHash, SubmitError> {
        let mut state = self.inner.state.lock();
        let result = match state.submissions.pop_front() {
            Some(result) => result,
            None => {
                let hash = TxHash::with_last_byte(state.next_hash);
                state.next_hash = state.next_hash.wrapping_add(1);
                Ok(hash)
            }
        };
        if result.is_ok() {
            state.sent.push(request);
        }
        result
    }
}
