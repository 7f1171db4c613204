//! Single-slot mailbox bridging callback delivery and polling.
//!
//! Subscription APIs deliver messages whenever they arrive; poll
//! predicates want to ask "has anything arrived yet?" on their own
//! cadence. An [`Inbox`] decouples the two: delivery writes the slot,
//! predicates read it. The slot holds the latest payload only; earlier
//! undrained payloads are replaced.

use std::sync::{Arc, Mutex, MutexGuard};

/// Cloneable handle to a shared single-payload slot.
#[derive(Debug, Clone, Default)]
pub struct Inbox {
    slot: Arc<Mutex<Option<Vec<u8>>>>,
}

impl Inbox {
    /// Creates an empty inbox.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a payload, replacing any undrained one.
    pub fn deliver(&self, payload: Vec<u8>) {
        *self.lock() = Some(payload);
    }

    /// Whether a payload is waiting.
    #[must_use]
    pub fn has_message(&self) -> bool {
        self.lock().is_some()
    }

    /// Removes and returns the waiting payload, if any.
    pub fn take(&self) -> Option<Vec<u8>> {
        self.lock().take()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Vec<u8>>> {
        // A poisoned slot still holds plain bytes; recover the guard.
        match self.slot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty() {
        let inbox = Inbox::new();
        assert!(!inbox.has_message());
        assert_eq!(inbox.take(), None);
    }

    #[test]
    fn take_drains_the_slot() {
        let inbox = Inbox::new();
        inbox.deliver(b"hello".to_vec());
        assert!(inbox.has_message());
        assert_eq!(inbox.take(), Some(b"hello".to_vec()));
        assert!(!inbox.has_message());
    }

    #[test]
    fn later_payloads_replace_undrained_ones() {
        let inbox = Inbox::new();
        inbox.deliver(b"first".to_vec());
        inbox.deliver(b"second".to_vec());
        assert_eq!(inbox.take(), Some(b"second".to_vec()));
    }

    #[test]
    fn clones_share_the_slot() {
        let inbox = Inbox::new();
        let delivery_handle = inbox.clone();
        delivery_handle.deliver(b"shared".to_vec());
        assert_eq!(inbox.take(), Some(b"shared".to_vec()));
    }
}
