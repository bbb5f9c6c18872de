//! Remembers the last active connector so the session can be re-established on start.

use parking_lot::Mutex;
use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
};
use walletdeck_config::Config;

/// Persistence of the last active connector id.
///
/// Failures are never fatal: a store that cannot read or write simply forgets.
pub trait ConnectorStore: Send + Sync + fmt::Debug {
    fn load(&self) -> Option<String>;

    fn save(&self, connector_id: &str);

    fn clear(&self);
}

/// Keeps the id in memory for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryConnectorStore {
    id: Mutex<Option<String>>,
}

impl MemoryConnectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self { id: Mutex::new(Some(id.into())) }
    }
}

impl ConnectorStore for MemoryConnectorStore {
    fn load(&self) -> Option<String> {
        self.id.lock().clone()
    }

    fn save(&self, connector_id: &str) {
        *self.id.lock() = Some(connector_id.to_string());
    }

    fn clear(&self) {
        self.id.lock().take();
    }
}

/// Keeps the id in a plain text file.
#[derive(Clone, Debug)]
pub struct FileConnectorStore {
    path: PathBuf,
}

impl FileConnectorStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Uses [`Config::last_connector_file`], if a storage directory can be determined.
    pub fn from_config(config: &Config) -> Option<Self> {
        config.last_connector_file().map(Self::new)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, contents: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, contents)
    }
}

impl ConnectorStore for FileConnectorStore {
    fn load(&self) -> Option<String> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                let id = contents.trim();
                (!id.is_empty()).then(|| id.to_string())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => None,
            Err(err) => {
                warn!(target: "wallets::store", path = %self.path.display(), %err, "failed to read last connector");
                None
            }
        }
    }

    fn save(&self, connector_id: &str) {
        if let Err(err) = self.write(connector_id) {
            warn!(target: "wallets::store", path = %self.path.display(), %err, "failed to persist last connector");
        }
    }

    fn clear(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                warn!(target: "wallets::store", path = %self.path.display(), %err, "failed to clear last connector");
            }
        }
    }
}
