//! Tracked transactions.

use alloy_primitives::{Address, ChainId, TxHash};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a submitted transaction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    #[default]
    Pending,
    Confirmed,
    Failed,
}

impl TxStatus {
    /// Returns `true` for `Confirmed` and `Failed`, which are never left again.
    pub const fn is_final(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
        })
    }
}

/// The final outcome of a transaction as reported by the chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxOutcome {
    Confirmed,
    /// Reverted or dropped.
    Failed,
}

impl From<TxOutcome> for TxStatus {
    fn from(outcome: TxOutcome) -> Self {
        match outcome {
            TxOutcome::Confirmed => Self::Confirmed,
            TxOutcome::Failed => Self::Failed,
        }
    }
}

/// A submitted transaction and what is known about it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub hash: TxHash,
    /// The chain that was active when the transaction was submitted.
    pub chain_id: ChainId,
    /// Semantic tag chosen by the submitter, e.g. `approve` or `swap`.
    pub kind: String,
    /// Opaque payload for presentation.
    pub metadata: serde_json::Value,
    pub status: TxStatus,
    /// Whether the user acknowledged the transaction in the notifications view.
    pub checked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    pub added_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finalized_at: Option<DateTime<Utc>>,
}

impl TransactionRecord {
    /// Creates a pending, unchecked record.
    pub fn new(
        hash: TxHash,
        chain_id: ChainId,
        kind: impl Into<String>,
        metadata: serde_json::Value,
    ) -> Self {
        Self {
            hash,
            chain_id,
            kind: kind.into(),
            metadata,
            status: TxStatus::Pending,
            checked: false,
            from: None,
            added_at: Utc::now(),
            finalized_at: None,
        }
    }

    pub fn with_from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    pub fn is_pending(&self) -> bool {
        self.status == TxStatus::Pending
    }
}
