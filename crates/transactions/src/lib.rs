//! # walletdeck-transactions
//!
//! Tracking of submitted transactions: the session ledger, the notification badge, the
//! transaction dialog and the watcher that finalizes pending records.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

#[macro_use]
extern crate tracing;

pub mod badge;
pub mod dialog;
pub mod error;
pub mod ledger;
pub mod record;
pub mod watcher;

pub use badge::Badge;
pub use dialog::{DialogState, Navigator, NoopNavigator, OpenDialog, TransactionDialog};
pub use error::LedgerError;
pub use ledger::{LedgerEvent, StatusChange, TransactionLedger};
pub use record::{TransactionRecord, TxOutcome, TxStatus};
pub use watcher::{StatusSource, TransactionWatcher};
