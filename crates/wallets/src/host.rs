//! Capabilities the hosting application provides to the coordinator.

use alloy_primitives::Address;
use async_trait::async_trait;
use std::fmt;

/// Restarts the running application from scratch.
///
/// Invoked when the wallet reports a chain change: the session is treated as stale and all
/// chain-dependent state is rebuilt by the reload instead of being reconciled in place.
pub trait Reload: Send + Sync + fmt::Debug {
    fn reload(&self);
}

/// A [`Reload`] for hosts that cannot restart; it only logs.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogReload;

impl Reload for LogReload {
    fn reload(&self) {
        warn!(target: "wallets::host", "session is stale but the host installed no reload handler");
    }
}

/// Resolves an account to a human-readable name, e.g. through a name service.
#[async_trait]
pub trait NameResolver: Send + Sync + fmt::Debug {
    /// Returns `None` if the address has no name.
    async fn lookup_address(&self, address: Address) -> eyre::Result<Option<String>>;
}
