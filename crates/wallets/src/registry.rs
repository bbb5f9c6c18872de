use crate::connector::Connector;
use std::sync::Arc;
use walletdeck_config::Config;

/// The set of connectors the user can pick from, in display order.
///
/// Connectors live for the whole process and are only ever referenced.
#[derive(Clone, Debug, Default)]
pub struct ConnectorRegistry {
    connectors: Vec<Arc<dyn Connector>>,
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the registry from the connectors the host makes available, keeping only those
    /// enabled in `config` and ordering them as configured.
    pub fn from_config(
        config: &Config,
        available: impl IntoIterator<Item = Arc<dyn Connector>>,
    ) -> Self {
        let mut available: Vec<_> = available.into_iter().collect();
        let mut registry = Self::new();
        for id in &config.connectors {
            match available.iter().position(|c| c.id() == id) {
                Some(idx) => registry.register(available.swap_remove(idx)),
                None => warn!(target: "wallets::registry", %id, "enabled connector is not available"),
            }
        }
        for skipped in &available {
            debug!(target: "wallets::registry", id = skipped.id(), "connector not enabled");
        }
        registry
    }

    /// Adds a connector, replacing any connector registered under the same id.
    pub fn register(&mut self, connector: Arc<dyn Connector>) {
        if let Some(existing) = self.connectors.iter_mut().find(|c| c.id() == connector.id()) {
            warn!(target: "wallets::registry", id = connector.id(), "replacing registered connector");
            *existing = connector;
        } else {
            self.connectors.push(connector);
        }
    }

    /// Builder-style [`ConnectorRegistry::register`].
    pub fn with(mut self, connector: impl Connector + 'static) -> Self {
        self.register(Arc::new(connector));
        self
    }

    pub fn get(&self, id: &str) -> Option<&Arc<dyn Connector>> {
        self.connectors.iter().find(|c| c.id() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Connector>> {
        self.connectors.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.connectors.iter().map(|c| c.id())
    }

    pub fn len(&self) -> usize {
        self.connectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connectors.is_empty()
    }
}
