use alloy_primitives::{Address, ChainId, TxHash};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::{
    collections::HashMap,
    sync::atomic::{AtomicUsize, Ordering},
};
use walletdeck_transactions::{Navigator, StatusSource, TxOutcome};
use walletdeck_wallets::{NameResolver, Reload};

/// Records the reloads and navigations the coordinator asks for.
#[derive(Debug, Default)]
pub struct RecordingHost {
    reloads: AtomicUsize,
    navigations: Mutex<Vec<String>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reloads(&self) -> usize {
        self.reloads.load(Ordering::SeqCst)
    }

    pub fn navigations(&self) -> Vec<String> {
        self.navigations.lock().clone()
    }
}

impl Reload for RecordingHost {
    fn reload(&self) {
        self.reloads.fetch_add(1, Ordering::SeqCst);
    }
}

impl Navigator for RecordingHost {
    fn navigate(&self, target: &str) {
        self.navigations.lock().push(target.to_string());
    }
}

/// Resolves the addresses it was given names for.
#[derive(Debug, Default)]
pub struct MockNameResolver {
    names: Mutex<HashMap<Address, String>>,
    fail: bool,
}

impl MockNameResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// A resolver whose lookups always fail.
    pub fn failing() -> Self {
        Self { fail: true, ..Default::default() }
    }

    pub fn with_name(self, address: Address, name: impl Into<String>) -> Self {
        self.names.lock().insert(address, name.into());
        self
    }
}

#[async_trait]
impl NameResolver for MockNameResolver {
    async fn lookup_address(&self, address: Address) -> eyre::Result<Option<String>> {
        if self.fail {
            eyre::bail!("name service unreachable");
        }
        Ok(self.names.lock().get(&address).cloned())
    }
}

/// Reports scripted outcomes. Unknown transactions stay pending.
#[derive(Debug, Default)]
pub struct MockStatusSource {
    outcomes: Mutex<HashMap<(ChainId, TxHash), TxOutcome>>,
    failures: Mutex<HashMap<TxHash, usize>>,
    calls: AtomicUsize,
}

impl MockStatusSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, chain_id: ChainId, hash: TxHash, outcome: TxOutcome) {
        self.outcomes.lock().insert((chain_id, hash), outcome);
    }

    /// Fails the next `times` lookups of `hash`.
    pub fn fail(&self, hash: TxHash, times: usize) {
        self.failures.lock().insert(hash, times);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatusSource for MockStatusSource {
    async fn status(&self, chain_id: ChainId, hash: TxHash) -> eyre::Result<Option<TxOutcome>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(left) = self.failures.lock().get_mut(&hash)
            && *left > 0
        {
            *left -= 1;
            eyre::bail!("rpc timeout");
        }
        Ok(self.outcomes.lock().get(&(chain_id, hash)).copied())
    }
}
