//! Follows pending transactions until the chain reports an outcome.

use crate::{
    ledger::{StatusChange, TransactionLedger},
    record::TxOutcome,
};
use alloy_primitives::{ChainId, TxHash};
use async_trait::async_trait;
use futures::future::join_all;
use std::{fmt, sync::Arc, time::Duration};
use tokio::{task::JoinHandle, time::MissedTickBehavior};

/// Where transaction outcomes come from, usually a chain RPC endpoint.
#[async_trait]
pub trait StatusSource: Send + Sync + fmt::Debug {
    /// Returns the outcome of `hash` on `chain_id`, or `None` while it is not final.
    async fn status(&self, chain_id: ChainId, hash: TxHash) -> eyre::Result<Option<TxOutcome>>;
}

/// Periodically polls a [`StatusSource`] for every pending transaction of a ledger.
#[derive(Clone, Debug)]
pub struct TransactionWatcher {
    ledger: TransactionLedger,
    source: Arc<dyn StatusSource>,
    interval: Duration,
}

impl TransactionWatcher {
    pub fn new(ledger: TransactionLedger, source: Arc<dyn StatusSource>, interval: Duration) -> Self {
        Self { ledger, source, interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Polls every pending transaction once and returns how many were finalized.
    ///
    /// A failing lookup is logged and retried on the next poll.
    pub async fn poll_once(&self) -> usize {
        let pending = self.ledger.pending();
        if pending.is_empty() {
            return 0;
        }
        trace!(target: "transactions::watcher", pending = pending.len(), "polling transactions");

        let futs = pending.into_iter().map(|(chain_id, hash)| async move {
            (chain_id, hash, self.source.status(chain_id, hash).await)
        });

        let mut finalized = 0;
        for (chain_id, hash, result) in join_all(futs).await {
            match result {
                Ok(Some(outcome)) => match self.ledger.update_status(hash, outcome.into()) {
                    Ok(StatusChange::Applied) => finalized += 1,
                    Ok(StatusChange::Ignored) => {}
                    Err(err) => warn!(target: "transactions::watcher", %err, "failed to apply outcome"),
                },
                Ok(None) => {}
                Err(err) => {
                    warn!(target: "transactions::watcher", %hash, chain_id, %err, "failed to fetch transaction status");
                }
            }
        }
        finalized
    }

    /// Spawns a task polling at the configured interval. Runs until aborted.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let finalized = self.poll_once().await;
                if finalized > 0 {
                    debug!(target: "transactions::watcher", finalized, "transactions finalized");
                }
            }
        })
    }
}
