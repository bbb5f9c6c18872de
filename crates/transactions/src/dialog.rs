//! The single transaction dialog the presentation layer shows while a transaction is submitted.

use alloy_primitives::TxHash;
use futures::channel::mpsc::UnboundedReceiver;
use parking_lot::Mutex;
use std::{fmt, sync::Arc};
use walletdeck_common::Listeners;

/// Client-side navigation of the hosting application.
pub trait Navigator: Send + Sync + fmt::Debug {
    fn navigate(&self, target: &str);
}

/// Navigator for hosts without routing. Redirects are logged and dropped.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn navigate(&self, target: &str) {
        debug!(target: "transactions::dialog", %target, "no navigator installed, dropping redirect");
    }
}

/// What the dialog currently shows. The default value is the closed dialog.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DialogState {
    pub is_open: bool,
    pub hash: Option<TxHash>,
    pub kind: Option<String>,
    pub metadata: serde_json::Value,
    pub error: Option<String>,
    /// Navigated to after the dialog closed.
    pub redirect: Option<String>,
}

/// Arguments of [`TransactionDialog::open`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OpenDialog {
    kind: String,
    metadata: serde_json::Value,
    hash: Option<TxHash>,
    error: Option<String>,
    redirect: Option<String>,
}

impl OpenDialog {
    pub fn new(kind: impl Into<String>) -> Self {
        Self { kind: kind.into(), ..Default::default() }
    }

    pub fn metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn hash(mut self, hash: TxHash) -> Self {
        self.hash = Some(hash);
        self
    }

    pub fn error(mut self, error: impl fmt::Display) -> Self {
        self.error = Some(error.to_string());
        self
    }

    /// Navigate to `target` once the dialog is closed.
    pub fn redirect(mut self, target: impl Into<String>) -> Self {
        self.redirect = Some(target.into());
        self
    }
}

/// Single-slot controller of the transaction dialog.
///
/// Cheap to clone; all clones share the same slot.
#[derive(Clone, Debug)]
pub struct TransactionDialog {
    inner: Arc<DialogInner>,
}

#[derive(Debug)]
struct DialogInner {
    state: Mutex<DialogState>,
    navigator: Arc<dyn Navigator>,
    listeners: Listeners<DialogState>,
}

impl Default for TransactionDialog {
    fn default() -> Self {
        Self::new(Arc::new(NoopNavigator))
    }
}

impl TransactionDialog {
    pub fn new(navigator: Arc<dyn Navigator>) -> Self {
        Self {
            inner: Arc::new(DialogInner {
                state: Mutex::new(DialogState::default()),
                navigator,
                listeners: Listeners::new(),
            }),
        }
    }

    pub fn state(&self) -> DialogState {
        self.inner.state.lock().clone()
    }

    pub fn is_open(&self) -> bool {
        self.inner.state.lock().is_open
    }

    pub fn subscribe(&self) -> UnboundedReceiver<DialogState> {
        self.inner.listeners.subscribe()
    }

    /// Opens the dialog, replacing whatever it showed.
    pub fn open(&self, dialog: OpenDialog) {
        let OpenDialog { kind, metadata, hash, error, redirect } = dialog;
        {
            let mut state = self.inner.state.lock();
            if state.is_open {
                debug!(target: "transactions::dialog", previous = ?state.kind, "replacing open dialog");
            }
            *state = DialogState { is_open: true, hash, kind: Some(kind), metadata, error, redirect };
        }
        self.publish();
    }

    /// Sets the hash once the transaction was submitted. Returns `false` if the dialog is closed.
    pub fn set_hash(&self, hash: TxHash) -> bool {
        self.modify(|state| state.hash = Some(hash))
    }

    /// Shows `error`. Returns `false` if the dialog is closed.
    pub fn set_error(&self, error: impl fmt::Display) -> bool {
        let error = error.to_string();
        self.modify(|state| state.error = Some(error))
    }

    /// Clears the dialog, then follows the redirect it was opened with, if any.
    ///
    /// Returns `false` if the dialog was already closed.
    pub fn close(&self) -> bool {
        let closed = std::mem::take(&mut *self.inner.state.lock());
        if !closed.is_open {
            return false;
        }
        self.publish();
        if let Some(target) = closed.redirect {
            self.inner.navigator.navigate(&target);
        }
        true
    }

    fn modify(&self, f: impl FnOnce(&mut DialogState)) -> bool {
        {
            let mut state = self.inner.state.lock();
            if !state.is_open {
                debug!(target: "transactions::dialog", "dialog is closed, ignoring update");
                return false;
            }
            f(&mut state);
        }
        self.publish();
        true
    }

    fn publish(&self) {
        self.inner.listeners.notify(self.state());
    }
}
