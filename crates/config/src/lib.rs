//! # walletdeck-config
//!
//! Configuration for the wallet connection and transaction coordinator.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

#[macro_use]
extern crate tracing;

use alloy_chains::Chain;
use alloy_primitives::ChainId;
use figment::{
    Figment, Provider,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

pub mod error;
pub use error::ConfigError;

// reexport so hosts can merge their own providers
pub use figment;

/// walletdeck configuration
///
/// # Defaults
///
/// All configuration values have a default, documented on the corresponding field.
///
/// # Loading
///
/// [`Config::load`] merges, in order of increasing precedence:
///
/// 1. the defaults,
/// 2. `walletdeck.toml` in the current directory (or the file named by `WALLETDECK_CONFIG`),
/// 3. environment variables prefixed with `WALLETDECK_`, e.g. `WALLETDECK_CHAIN_ID=56`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Display name of the application. Consumed by presentation only.
    pub app_name: String,
    /// Social links shown by the presentation layer, in display order.
    pub social_links: Vec<SocialLink>,
    /// The chain the application expects the wallet to be on.
    ///
    /// Defaults to Ethereum mainnet.
    pub chain_id: ChainId,
    /// Chains the application knows how to talk to. Must contain `chain_id`.
    pub supported_chains: Vec<ChainId>,
    /// Enabled connector ids, in display order.
    pub connectors: Vec<String>,
    /// Whether to re-activate the last used connector on start.
    pub auto_connect: bool,
    /// Where the last used connector id is remembered.
    ///
    /// Defaults to `<data dir>/walletdeck`.
    pub storage_dir: Option<PathBuf>,
    /// How often pending transactions are polled, in milliseconds.
    pub tx_poll_interval_ms: u64,
    /// Panic on internal misuse (`Some(true)`), log it (`Some(false)`), or decide by build
    /// profile (`None`).
    pub strict_misuse: Option<bool>,
}

/// A link rendered in the application footer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialLink {
    /// Link label, e.g. `github`.
    pub name: String,
    /// Target url.
    pub url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "walletdeck".to_string(),
            social_links: vec![],
            chain_id: 1,
            supported_chains: vec![1],
            connectors: vec!["injected".to_string(), "walletconnect".to_string()],
            auto_connect: true,
            storage_dir: None,
            tx_poll_interval_ms: 4_000,
            strict_misuse: None,
        }
    }
}

impl Config {
    /// The default config file name.
    pub const FILE_NAME: &'static str = "walletdeck.toml";

    /// Prefix of the environment variables that override config values.
    pub const ENV_PREFIX: &'static str = "WALLETDECK_";

    /// The file that holds the id of the last active connector.
    pub const LAST_CONNECTOR_FILE: &'static str = "last_connector";

    /// Loads the config from the current directory and the environment, then validates it.
    pub fn load() -> Result<Self, ConfigError> {
        Self::try_from(Self::figment())
    }

    /// Same as [`Config::load`], reading `walletdeck.toml` from `root`.
    pub fn load_with_root(root: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::try_from(Self::figment_with_root(root))
    }

    /// Attempts to extract a validated `Config` from `provider`.
    pub fn try_from<T: Provider>(provider: T) -> Result<Self, ConfigError> {
        let figment = Figment::from(provider);
        trace!("load config with provider: {:?}", figment.metadata().collect::<Vec<_>>());
        let config = figment.extract::<Self>()?;
        config.validate()?;
        Ok(config)
    }

    /// Returns the default figment: defaults, then `walletdeck.toml`, then the environment.
    pub fn figment() -> Figment {
        let file = Env::var_or("WALLETDECK_CONFIG", Self::FILE_NAME);
        Self::figment_with_file(file)
    }

    /// Returns the default figment reading `walletdeck.toml` from `root`.
    pub fn figment_with_root(root: impl AsRef<Path>) -> Figment {
        Self::figment_with_file(root.as_ref().join(Self::FILE_NAME))
    }

    fn figment_with_file(file: impl AsRef<Path>) -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(file.as_ref()))
            .merge(Env::prefixed(Self::ENV_PREFIX).ignore(&["CONFIG"]))
    }

    /// Checks the invariants the coordinator relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.is_supported(self.chain_id) {
            return Err(ConfigError::UnsupportedAppChain(self.chain_id));
        }
        if self.connectors.is_empty() {
            return Err(ConfigError::NoConnectors);
        }
        for (idx, id) in self.connectors.iter().enumerate() {
            if self.connectors[..idx].contains(id) {
                return Err(ConfigError::DuplicateConnector(id.clone()));
            }
        }
        if self.tx_poll_interval_ms == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }
        Ok(())
    }

    /// Returns `true` if `chain_id` is listed in `supported_chains`.
    pub fn is_supported(&self, chain_id: ChainId) -> bool {
        self.supported_chains.contains(&chain_id)
    }

    /// Returns the application chain as an [`alloy_chains::Chain`], mostly for display.
    pub fn chain(&self) -> Chain {
        Chain::from_id(self.chain_id)
    }

    /// Returns the interval at which pending transactions are polled.
    pub fn tx_poll_interval(&self) -> Duration {
        Duration::from_millis(self.tx_poll_interval_ms)
    }

    /// Returns the configured storage directory, or `<data dir>/walletdeck`.
    pub fn storage_dir(&self) -> Option<PathBuf> {
        self.storage_dir.clone().or_else(|| dirs::data_dir().map(|dir| dir.join("walletdeck")))
    }

    /// Returns the path of the file remembering the last active connector.
    pub fn last_connector_file(&self) -> Option<PathBuf> {
        self.storage_dir().map(|dir| dir.join(Self::LAST_CONNECTOR_FILE))
    }
}
