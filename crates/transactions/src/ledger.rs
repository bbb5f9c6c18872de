//! The session ledger of submitted transactions.

use crate::{
    badge::Badge,
    error::LedgerError,
    record::{TransactionRecord, TxStatus},
};
use alloy_primitives::{ChainId, TxHash};
use chrono::Utc;
use futures::channel::mpsc::UnboundedReceiver;
use parking_lot::RwLock;
use std::{collections::HashMap, sync::Arc};
use walletdeck_common::Listeners;

/// Emitted by the ledger after every mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LedgerEvent {
    Recorded(TxHash),
    StatusChanged { hash: TxHash, status: TxStatus },
    /// These hashes were acknowledged.
    Checked(Vec<TxHash>),
}

/// Result of [`TransactionLedger::update_status`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusChange {
    Applied,
    /// The record already had a final status, or the update was to `Pending`.
    Ignored,
}

#[derive(Debug, Default)]
struct Entries {
    /// Insertion order.
    records: Vec<TransactionRecord>,
    index: HashMap<TxHash, usize>,
}

impl Entries {
    fn get_mut(&mut self, hash: &TxHash) -> Option<&mut TransactionRecord> {
        let idx = *self.index.get(hash)?;
        self.records.get_mut(idx)
    }
}

/// Append-only record of every transaction submitted in this session, keyed by hash.
///
/// Counts and the badge are computed from the records on every call.
#[derive(Clone, Debug, Default)]
pub struct TransactionLedger {
    inner: Arc<LedgerInner>,
}

#[derive(Debug, Default)]
struct LedgerInner {
    entries: RwLock<Entries>,
    listeners: Listeners<LedgerEvent>,
}

// === impl TransactionLedger ===

impl TransactionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracks a new pending transaction.
    pub fn record(
        &self,
        hash: TxHash,
        chain_id: ChainId,
        kind: impl Into<String>,
        metadata: serde_json::Value,
    ) -> Result<(), LedgerError> {
        self.insert(TransactionRecord::new(hash, chain_id, kind, metadata))
    }

    /// Tracks `record` as is.
    ///
    /// Fails with [`LedgerError::DuplicateHash`] if the hash is already tracked, leaving the
    /// ledger unchanged.
    pub fn insert(&self, record: TransactionRecord) -> Result<(), LedgerError> {
        let hash = record.hash;
        {
            let mut entries = self.inner.entries.write();
            if entries.index.contains_key(&hash) {
                return Err(LedgerError::DuplicateHash(hash));
            }
            debug!(target: "transactions::ledger", %hash, chain_id = record.chain_id, kind = %record.kind, "recording transaction");
            let idx = entries.records.len();
            entries.records.push(record);
            entries.index.insert(hash, idx);
        }
        self.inner.listeners.notify(LedgerEvent::Recorded(hash));
        Ok(())
    }

    /// Moves a pending transaction to `status`.
    ///
    /// Updates of records that already have a final status are ignored, so repeated or late
    /// provider events are harmless.
    pub fn update_status(&self, hash: TxHash, status: TxStatus) -> Result<StatusChange, LedgerError> {
        {
            let mut entries = self.inner.entries.write();
            let record = entries.get_mut(&hash).ok_or(LedgerError::UnknownHash(hash))?;
            if record.status.is_final() || !status.is_final() {
                trace!(target: "transactions::ledger", %hash, current = %record.status, update = %status, "ignoring status update");
                return Ok(StatusChange::Ignored);
            }
            record.status = status;
            record.finalized_at = Some(Utc::now());
        }
        debug!(target: "transactions::ledger", %hash, %status, "transaction finalized");
        self.inner.listeners.notify(LedgerEvent::StatusChanged { hash, status });
        Ok(StatusChange::Applied)
    }

    /// Acknowledges a transaction. Returns `false` if it was already checked.
    pub fn mark_checked(&self, hash: TxHash) -> Result<bool, LedgerError> {
        {
            let mut entries = self.inner.entries.write();
            let record = entries.get_mut(&hash).ok_or(LedgerError::UnknownHash(hash))?;
            if record.checked {
                return Ok(false);
            }
            record.checked = true;
        }
        self.inner.listeners.notify(LedgerEvent::Checked(vec![hash]));
        Ok(true)
    }

    /// Acknowledges every transaction and returns how many were unchecked.
    pub fn mark_all_checked(&self) -> usize {
        let hashes: Vec<_> = {
            let mut entries = self.inner.entries.write();
            entries
                .records
                .iter_mut()
                .filter(|record| !record.checked)
                .map(|record| {
                    record.checked = true;
                    record.hash
                })
                .collect()
        };
        let count = hashes.len();
        if count > 0 {
            self.inner.listeners.notify(LedgerEvent::Checked(hashes));
        }
        count
    }

    /// Number of pending transactions on any chain.
    pub fn pending_count(&self) -> usize {
        self.count(|record| record.is_pending())
    }

    pub fn pending_for_chain(&self, chain_id: ChainId) -> usize {
        self.count(|record| record.chain_id == chain_id && record.is_pending())
    }

    /// Number of unacknowledged transactions submitted on `chain_id`.
    pub fn unchecked_for_chain(&self, chain_id: ChainId) -> usize {
        self.count(|record| record.chain_id == chain_id && !record.checked)
    }

    /// The notification badge for a session on `chain_id`.
    pub fn badge(&self, chain_id: ChainId) -> Badge {
        Badge::from_counts(self.unchecked_for_chain(chain_id), self.pending_count())
    }

    /// Records submitted on `chain_id`, newest first.
    pub fn for_chain(&self, chain_id: ChainId) -> Vec<TransactionRecord> {
        let entries = self.inner.entries.read();
        entries.records.iter().rev().filter(|record| record.chain_id == chain_id).cloned().collect()
    }

    pub fn get(&self, hash: &TxHash) -> Option<TransactionRecord> {
        let entries = self.inner.entries.read();
        entries.index.get(hash).and_then(|idx| entries.records.get(*idx)).cloned()
    }

    /// Hashes and chains of every pending transaction, oldest first.
    pub fn pending(&self) -> Vec<(ChainId, TxHash)> {
        let entries = self.inner.entries.read();
        entries.records.iter().filter(|r| r.is_pending()).map(|r| (r.chain_id, r.hash)).collect()
    }

    /// All records in submission order.
    pub fn records(&self) -> Vec<TransactionRecord> {
        self.inner.entries.read().records.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.entries.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn subscribe(&self) -> UnboundedReceiver<LedgerEvent> {
        self.inner.listeners.subscribe()
    }

    fn count(&self, f: impl Fn(&TransactionRecord) -> bool) -> usize {
        self.inner.entries.read().records.iter().filter(|record| f(record)).count()
    }
}
