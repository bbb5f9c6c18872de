//! Shared mocks for walletdeck tests.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![allow(clippy::disallowed_macros)]

mod connector;
pub use connector::MockConnector;

mod host;
pub use host::{MockNameResolver, MockStatusSource, RecordingHost};

/// Initializes tracing for tests.
pub fn init_tracing() {
    let _ = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
