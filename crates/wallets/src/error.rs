use alloy_primitives::ChainId;

/// Why a connector could not establish a session.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ActivationError {
    #[error("user rejected the connection request")]
    UserRejected,
    #[error("wallet provider unavailable: {0}")]
    ProviderUnavailable(String),
    #[error("{0}")]
    Unknown(String),
}

/// Why a connector could not move the wallet to another chain.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SwitchError {
    #[error("user rejected the network switch")]
    UserRejected,
    #[error("chain {0} is not configured in the wallet")]
    UnknownChain(ChainId),
    #[error("wallet provider unavailable: {0}")]
    ProviderUnavailable(String),
}

/// Why a connector could not submit a transaction.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    #[error("user rejected the transaction")]
    UserRejected,
    #[error("wallet provider unavailable: {0}")]
    ProviderUnavailable(String),
    #[error("{0}")]
    Unknown(String),
}

/// A capability the connector does not have was invoked.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("connector `{connector}` does not support {operation}")]
pub struct UnsupportedOperation {
    pub connector: String,
    pub operation: &'static str,
}

impl UnsupportedOperation {
    pub fn new(connector: impl Into<String>, operation: &'static str) -> Self {
        Self { connector: connector.into(), operation }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DeactivationError {
    #[error(transparent)]
    Unsupported(#[from] UnsupportedOperation),
    #[error("wallet provider failed to disconnect: {0}")]
    Provider(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("unknown connector `{0}`")]
    UnknownConnector(String),
    #[error("activation of `{0}` is already in flight")]
    ActivationInFlight(String),
    #[error("activation of `{0}` resolved after another connector took over")]
    Superseded(String),
    #[error("failed to activate `{connector}`: {source}")]
    Activation {
        connector: String,
        #[source]
        source: ActivationError,
    },
    #[error("failed to deactivate `{connector}`: {source}")]
    Deactivation {
        connector: String,
        #[source]
        source: DeactivationError,
    },
    #[error("no wallet is connected")]
    NotConnected,
    #[error(transparent)]
    Submit(#[from] SubmitError),
}

impl ConnectionError {
    /// Returns the provider-level activation error, if this is one.
    pub fn as_activation(&self) -> Option<&ActivationError> {
        match self {
            Self::Activation { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("wallet is on chain {} but chain {required} is required", display_chain(*current))]
    Mismatch { current: Option<ChainId>, required: ChainId },
    #[error("a network switch is already in flight")]
    SwitchInFlight,
    #[error(transparent)]
    Switch(#[from] SwitchError),
}

fn display_chain(chain: Option<ChainId>) -> String {
    chain.map_or_else(|| "<none>".to_string(), |id| id.to_string())
}
