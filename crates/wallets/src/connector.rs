//! The capability surface of a wallet provider.

use crate::error::{ActivationError, DeactivationError, SubmitError, SwitchError, UnsupportedOperation};
use alloy_primitives::{Address, ChainId, TxHash};
use alloy_rpc_types::TransactionRequest;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};

/// Callback invoked by a connector when the wallet reports a new chain.
pub type ChainChangedHandler = Arc<dyn Fn(ChainId) + Send + Sync>;

/// The session a connector reports after a successful activation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub account: Address,
    pub chain_id: ChainId,
}

impl SessionInfo {
    pub const fn new(account: Address, chain_id: ChainId) -> Self {
        Self { account, chain_id }
    }

    /// Narrows a raw provider response (`eth_requestAccounts` + `eth_chainId`) into a session.
    ///
    /// The chain id may be `0x`-prefixed hex, as EIP-1193 providers return it, or decimal.
    pub fn from_raw(accounts: &[String], chain_id: &str) -> Result<Self, ActivationError> {
        let account = accounts
            .first()
            .ok_or_else(|| ActivationError::Unknown("provider returned no accounts".to_string()))?;
        let account = account
            .parse::<Address>()
            .map_err(|err| ActivationError::Unknown(format!("invalid account {account:?}: {err}")))?;

        let chain_id = chain_id.trim();
        let parsed = match chain_id.strip_prefix("0x").or_else(|| chain_id.strip_prefix("0X")) {
            Some(hex) => ChainId::from_str_radix(hex, 16),
            None => chain_id.parse::<ChainId>(),
        };
        let chain_id = parsed
            .map_err(|err| ActivationError::Unknown(format!("invalid chain id {chain_id:?}: {err}")))?;

        Ok(Self { account, chain_id })
    }
}

/// Handle to a provider event subscription.
///
/// The subscription is cancelled when the handle is dropped or [`Subscription::unsubscribe`] is
/// called, whichever happens first.
#[must_use = "dropping a subscription cancels it"]
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Creates a subscription that runs `unsubscribe` when cancelled.
    pub fn new(unsubscribe: impl FnOnce() + Send + 'static) -> Self {
        Self { unsubscribe: Some(Box::new(unsubscribe)) }
    }

    /// A subscription with nothing to cancel.
    pub fn noop() -> Self {
        Self { unsubscribe: None }
    }

    /// Cancels the subscription.
    pub fn unsubscribe(mut self) {
        self.cancel();
    }

    fn cancel(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("active", &self.unsubscribe.is_some()).finish()
    }
}

/// One strategy for establishing a wallet session, e.g. a browser-injected provider or a
/// relay-based one.
///
/// Implementations wrap the raw provider SDK and narrow its responses into typed values before
/// they reach the coordinator.
#[async_trait]
pub trait Connector: Send + Sync + fmt::Debug {
    /// Stable identifier, used for lookup and persistence.
    fn id(&self) -> &str;

    /// Human-readable name.
    fn name(&self) -> &str {
        self.id()
    }

    /// Asks the wallet for a session.
    async fn activate(&self) -> Result<SessionInfo, ActivationError>;

    /// Whether [`Connector::deactivate`] is implemented.
    fn supports_deactivate(&self) -> bool {
        false
    }

    /// Ends the session on the provider side.
    async fn deactivate(&self) -> Result<(), DeactivationError> {
        Err(UnsupportedOperation::new(self.id(), "deactivate").into())
    }

    /// Asks the wallet to move to `chain_id`.
    async fn switch_network(&self, chain_id: ChainId) -> Result<(), SwitchError>;

    /// Registers `handler` for chain-changed events.
    fn on_chain_changed(&self, handler: ChainChangedHandler) -> Subscription;

    /// Asks the wallet to sign and broadcast `request`.
    async fn send_transaction(&self, request: TransactionRequest) -> Result<TxHash, SubmitError>;
}
