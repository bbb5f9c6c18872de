//! Config extraction and validation errors

use alloy_primitives::ChainId;

/// Represents a failed attempt to build a usable [`Config`](crate::Config).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The figment could not be extracted into a `Config`.
    #[error("failed to extract walletdeck config: {0}")]
    Extract(#[from] Box<figment::Error>),
    /// The required chain is missing from `supported_chains`.
    #[error("chain {0} is the application chain but is not listed in `supported_chains`")]
    UnsupportedAppChain(ChainId),
    /// `connectors` is empty.
    #[error("no wallet connectors are enabled")]
    NoConnectors,
    /// A connector id is listed more than once.
    #[error("connector `{0}` is listed more than once")]
    DuplicateConnector(String),
    /// `tx_poll_interval_ms` is zero.
    #[error("`tx_poll_interval_ms` must be greater than zero")]
    ZeroPollInterval,
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Extract(Box::new(err))
    }
}
