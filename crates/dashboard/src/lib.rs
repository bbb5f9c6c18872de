//! # walletdeck
//!
//! The wallet connection and transaction lifecycle coordinator of a dapp dashboard.
//!
//! [`Dashboard`] wires the connection manager, the network coordinator, the transaction ledger
//! and the transaction dialog together. The individual stores are re-exported for hosts that
//! need finer control.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

#[macro_use]
extern crate tracing;

mod dashboard;
pub use dashboard::{Dashboard, DashboardBuilder};

mod error;
pub use error::DashboardError;

pub mod utils;

pub use walletdeck_config::{self as config, Config};
pub use walletdeck_transactions as transactions;
pub use walletdeck_wallets as wallets;
