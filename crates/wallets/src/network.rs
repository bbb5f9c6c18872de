//! Detection and resolution of a mismatch between the wallet chain and the chain the application
//! requires.

use crate::{
    connection::ConnectionManager,
    error::{NetworkError, SwitchError},
};
use alloy_primitives::ChainId;
use futures::{StreamExt, channel::mpsc::UnboundedReceiver};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::task::JoinHandle;
use walletdeck_common::Listeners;

/// Why a network switch is being asked for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SwitchReason {
    /// The current page or action only works on the required chain.
    PageRequirement,
    /// The user picked another network.
    UserRequested,
}

/// A pending request to move the wallet to `chain_id`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SwitchRequest {
    pub chain_id: ChainId,
    pub reason: SwitchReason,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum NetworkState {
    /// The wallet is on the required chain, no wallet is connected, or the user dismissed the
    /// prompt.
    #[default]
    Matched,
    /// The wallet is on another chain; the switch prompt is shown.
    MismatchDetected { current: ChainId, request: SwitchRequest },
    /// The wallet was asked to switch and has not answered yet.
    SwitchInFlight { request: SwitchRequest },
    /// The wallet refused the switch. The error is kept for display.
    SwitchFailed { request: SwitchRequest, error: SwitchError },
}

impl NetworkState {
    /// The request behind the prompt, if one is shown.
    pub fn request(&self) -> Option<SwitchRequest> {
        match self {
            Self::Matched => None,
            Self::MismatchDetected { request, .. }
            | Self::SwitchInFlight { request }
            | Self::SwitchFailed { request, .. } => Some(*request),
        }
    }

    pub fn is_matched(&self) -> bool {
        matches!(self, Self::Matched)
    }
}

#[derive(Debug)]
struct Machine {
    required: ChainId,
    reason: SwitchReason,
    /// The chain the wallet is on, `None` while disconnected.
    observed: Option<ChainId>,
    state: NetworkState,
    /// `(observed, required)` at the time the prompt was cancelled.
    cancelled: Option<(Option<ChainId>, ChainId)>,
}

impl Machine {
    /// Recomputes the state from the observed and required chains.
    ///
    /// A switch in flight is left alone; its resolution settles the state.
    fn reconcile(&mut self) {
        if matches!(self.state, NetworkState::SwitchInFlight { .. }) {
            return;
        }
        let current = match self.observed {
            Some(current) if current != self.required => current,
            _ => {
                self.state = NetworkState::Matched;
                self.cancelled = None;
                return;
            }
        };
        if self.cancelled == Some((self.observed, self.required)) {
            self.state = NetworkState::Matched;
            return;
        }
        self.cancelled = None;

        let request = SwitchRequest { chain_id: self.required, reason: self.reason };
        let failed_same = matches!(
            &self.state,
            NetworkState::SwitchFailed { request: failed, .. } if *failed == request
        );
        if !failed_same {
            self.state = NetworkState::MismatchDetected { current, request };
        }
    }
}

/// Keeps the wallet on the chain the application requires.
///
/// Cheap to clone; all clones share the same state.
#[derive(Clone, Debug)]
pub struct NetworkCoordinator {
    inner: Arc<CoordinatorInner>,
}

#[derive(Debug)]
struct CoordinatorInner {
    manager: ConnectionManager,
    machine: RwLock<Machine>,
    listeners: Listeners<NetworkState>,
}

// === impl NetworkCoordinator ===

impl NetworkCoordinator {
    /// Creates a coordinator requiring `required` and syncs it with the manager's current chain.
    pub fn new(manager: ConnectionManager, required: ChainId) -> Self {
        let observed = manager.state().chain_id();
        let mut machine = Machine {
            required,
            reason: SwitchReason::PageRequirement,
            observed,
            state: NetworkState::Matched,
            cancelled: None,
        };
        machine.reconcile();
        Self {
            inner: Arc::new(CoordinatorInner {
                manager,
                machine: RwLock::new(machine),
                listeners: Listeners::new(),
            }),
        }
    }

    pub fn state(&self) -> NetworkState {
        self.inner.machine.read().state.clone()
    }

    pub fn required_chain(&self) -> ChainId {
        self.inner.machine.read().required
    }

    /// The request the switch prompt should show, if any.
    pub fn pending_request(&self) -> Option<SwitchRequest> {
        self.inner.machine.read().state.request()
    }

    /// Returns a stream yielding the state after every transition.
    pub fn subscribe(&self) -> UnboundedReceiver<NetworkState> {
        self.inner.listeners.subscribe()
    }

    /// Sets the chain the current page or action needs.
    pub fn require_chain(&self, chain_id: ChainId) -> NetworkState {
        self.update(|machine| {
            machine.required = chain_id;
            machine.reason = SwitchReason::PageRequirement;
        })
    }

    /// Records that the user picked `chain_id`, prompting for the switch if the wallet is
    /// elsewhere.
    pub fn request_switch(&self, chain_id: ChainId) -> NetworkState {
        self.update(|machine| {
            machine.required = chain_id;
            machine.reason = SwitchReason::UserRequested;
        })
    }

    /// [`request_switch`](Self::request_switch) followed by [`confirm`](Self::confirm).
    pub async fn switch_to(&self, chain_id: ChainId) -> Result<(), NetworkError> {
        self.request_switch(chain_id);
        self.confirm().await
    }

    /// Records the chain the wallet is on, `None` when disconnected.
    pub fn observe(&self, chain_id: Option<ChainId>) -> NetworkState {
        self.update(|machine| machine.observed = chain_id)
    }

    /// Observes the manager's current chain.
    pub fn sync(&self) -> NetworkState {
        self.observe(self.inner.manager.state().chain_id())
    }

    /// Asks the wallet to switch to the requested chain.
    ///
    /// Succeeds immediately when nothing is mismatched.
    pub async fn confirm(&self) -> Result<(), NetworkError> {
        self.sync();
        let request = {
            let mut machine = self.inner.machine.write();
            let request = match &machine.state {
                NetworkState::Matched => return Ok(()),
                NetworkState::SwitchInFlight { .. } => return Err(NetworkError::SwitchInFlight),
                NetworkState::MismatchDetected { request, .. }
                | NetworkState::SwitchFailed { request, .. } => *request,
            };
            machine.state = NetworkState::SwitchInFlight { request };
            machine.cancelled = None;
            request
        };
        self.publish();

        debug!(target: "wallets::network", chain_id = request.chain_id, reason = ?request.reason, "requesting network switch");
        let result = self.inner.manager.switch_network(request.chain_id).await;
        let observed = self.inner.manager.state().chain_id();

        if let Err(error) = &result {
            warn!(target: "wallets::network", chain_id = request.chain_id, %error, "network switch failed");
        }
        self.update(|machine| {
            machine.observed = observed;
            machine.state = match &result {
                Ok(()) => NetworkState::Matched,
                Err(error) => NetworkState::SwitchFailed { request, error: error.clone() },
            };
        });
        result.map_err(Into::into)
    }

    /// Closes the error of a failed switch. The mismatch prompt stays until resolved.
    pub fn dismiss_error(&self) -> NetworkState {
        self.update(|machine| {
            if let NetworkState::SwitchFailed { request, .. } = machine.state
                && let Some(current) = machine.observed
            {
                machine.state = NetworkState::MismatchDetected { current, request };
            }
        })
    }

    /// Closes the prompt without switching.
    ///
    /// Nothing is enforced afterwards and the same mismatch is not prompted again; use
    /// [`ensure_chain`](Self::ensure_chain) before acting on the required chain.
    pub fn cancel(&self) -> NetworkState {
        self.update(|machine| match machine.state {
            NetworkState::MismatchDetected { .. } | NetworkState::SwitchFailed { .. } => {
                debug!(target: "wallets::network", required = machine.required, "switch prompt cancelled");
                machine.cancelled = Some((machine.observed, machine.required));
                machine.state = NetworkState::Matched;
            }
            _ => {}
        })
    }

    /// Returns the required chain if the wallet is on it.
    ///
    /// Reads the manager's current chain, so it does not depend on a running
    /// [`spawn_sync`](Self::spawn_sync) task.
    pub fn ensure_chain(&self) -> Result<ChainId, NetworkError> {
        self.sync();
        let machine = self.inner.machine.read();
        match machine.observed {
            Some(current) if current == machine.required => Ok(current),
            current => Err(NetworkError::Mismatch { current, required: machine.required }),
        }
    }

    /// Spawns a task that follows the manager's chain. Runs until aborted.
    pub fn spawn_sync(&self) -> JoinHandle<()> {
        let this = self.clone();
        let mut updates = self.inner.manager.subscribe();
        this.sync();
        tokio::spawn(async move {
            while let Some(state) = updates.next().await {
                this.observe(state.chain_id());
            }
            trace!(target: "wallets::network", "connection updates ended");
        })
    }

    /// Applies `f`, reconciles and publishes if the state changed.
    fn update(&self, f: impl FnOnce(&mut Machine)) -> NetworkState {
        let (state, changed) = {
            let mut machine = self.inner.machine.write();
            let before = machine.state.clone();
            f(&mut machine);
            machine.reconcile();
            (machine.state.clone(), machine.state != before)
        };
        if changed {
            trace!(target: "wallets::network", ?state, "network state changed");
            self.inner.listeners.notify(state.clone());
        }
        state
    }

    fn publish(&self) {
        self.inner.listeners.notify(self.state());
    }
}
