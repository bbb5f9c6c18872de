use walletdeck_config::ConfigError;
use walletdeck_wallets::{ConnectionError, NetworkError};

#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    #[error(transparent)]
    Network(#[from] NetworkError),
}
