//! # walletdeck-wallets
//!
//! Wallet connectors, the connection lifecycle and network mismatch resolution.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

#[macro_use]
extern crate tracing;

pub mod connection;
pub mod connector;
pub mod error;
pub mod host;
pub mod network;
pub mod registry;
pub mod store;

pub use connection::{ConnectionManager, ConnectionManagerBuilder, ConnectionState, ConnectionStatus, Deactivation};
pub use connector::{ChainChangedHandler, Connector, SessionInfo, Subscription};
pub use error::{
    ActivationError, ConnectionError, DeactivationError, NetworkError, SubmitError, SwitchError,
    UnsupportedOperation,
};
pub use host::{LogReload, NameResolver, Reload};
pub use network::{NetworkCoordinator, NetworkState, SwitchReason, SwitchRequest};
pub use registry::ConnectorRegistry;
pub use store::{ConnectorStore, FileConnectorStore, MemoryConnectorStore};
