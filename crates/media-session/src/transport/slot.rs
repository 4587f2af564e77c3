//! The shared slot holding a leg's transport manager.

use super::TransportManager;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Holds the current transport manager and lets tasks wait for one to
/// appear.
///
/// The answering side of a session cannot know the transport until the
/// offer arrives, and the offer is processed on another task. Readers
/// that need the manager therefore wait on the slot for a bounded time
/// instead of failing immediately.
pub struct TransportSlot {
    tx: watch::Sender<Option<Arc<dyn TransportManager>>>,
}

impl TransportSlot {
    pub fn new() -> Self {
        Self {
            tx: watch::Sender::new(None),
        }
    }

    /// The manager currently installed, if any.
    pub fn current(&self) -> Option<Arc<dyn TransportManager>> {
        self.tx.borrow().clone()
    }

    /// Installs a manager, waking every waiter. Returns the manager that
    /// was installed before, which the caller is expected to close.
    pub fn set(&self, manager: Arc<dyn TransportManager>) -> Option<Arc<dyn TransportManager>> {
        self.tx.send_replace(Some(manager))
    }

    /// Empties the slot, returning the previous occupant.
    pub fn clear(&self) -> Option<Arc<dyn TransportManager>> {
        self.tx.send_replace(None)
    }

    /// Waits up to `bound` for a manager to be installed.
    pub async fn wait(&self, bound: Duration) -> Option<Arc<dyn TransportManager>> {
        if let Some(current) = self.current() {
            return Some(current);
        }
        let mut rx = self.tx.subscribe();
        let result = match tokio::time::timeout(bound, rx.wait_for(|slot| slot.is_some())).await {
            Ok(Ok(slot)) => slot.clone(),
            // On timeout, check one last time in case the install raced
            // the deadline.
            _ => self.current(),
        };
        result
    }
}

impl Default for TransportSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TransportSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = self.current().map(|manager| manager.kind());
        f.debug_struct("TransportSlot").field("kind", &kind).finish()
    }
}
