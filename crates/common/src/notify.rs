//! Fan-out of store updates to subscribers.

use futures::channel::mpsc::{UnboundedReceiver, UnboundedSender, unbounded};
use parking_lot::Mutex;

/// A set of listeners that receive a copy of every notified value.
///
/// Presentation code subscribes to a store and reads snapshots off the returned stream; the
/// store stays the only writer. Listeners whose receiving half was dropped are pruned on the
/// next notification.
#[derive(Debug)]
pub struct Listeners<T> {
    senders: Mutex<Vec<UnboundedSender<T>>>,
}

impl<T> Default for Listeners<T> {
    fn default() -> Self {
        Self { senders: Mutex::new(Vec::new()) }
    }
}

// === impl Listeners ===

impl<T: Clone> Listeners<T> {
    /// Creates an empty listener set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new listener and returns its stream.
    pub fn subscribe(&self) -> UnboundedReceiver<T> {
        let (tx, rx) = unbounded();
        self.senders.lock().push(tx);
        rx
    }

    /// Sends `value` to every live listener.
    pub fn notify(&self, value: T) {
        let mut senders = self.senders.lock();
        senders.retain(|tx| tx.unbounded_send(value.clone()).is_ok());
        trace!(target: "notify", listeners = senders.len(), "notified listeners");
    }

    /// Returns the number of registered listeners, including ones not yet pruned.
    pub fn len(&self) -> usize {
        self.senders.lock().len()
    }

    /// Returns `true` if no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
