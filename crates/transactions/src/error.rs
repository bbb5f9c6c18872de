use alloy_primitives::TxHash;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// The hash is already tracked. The ledger was left unchanged.
    #[error("transaction {0} is already tracked")]
    DuplicateHash(TxHash),
    #[error("transaction {0} is not tracked")]
    UnknownHash(TxHash),
}
