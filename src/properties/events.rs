//! Structural-change notifications for property owners.
//!
//! Owners publish will/did pairs around every structural mutation so that
//! external indices (undo stacks, UI models) can stay consistent. Listeners
//! receive events over crossbeam channels; they cannot call back into the
//! owner during delivery, which makes the no-reentrant-mutation rule
//! structural rather than a documentation promise.

use crate::properties::id::PropertyId;
use crossbeam_channel::{unbounded, Receiver, Sender};

/// A structural-change notification from a property owner.
///
/// `parent` is the composite the property lives under, INVALID for the tree
/// root. `index` is the position in the parent's display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnerEvent {
    WillAddProperty {
        parent: PropertyId,
        id: PropertyId,
        identifier: String,
        index: usize,
    },
    DidAddProperty {
        parent: PropertyId,
        id: PropertyId,
        identifier: String,
        index: usize,
    },
    WillRemoveProperty {
        parent: PropertyId,
        id: PropertyId,
        identifier: String,
        index: usize,
    },
    DidRemoveProperty {
        parent: PropertyId,
        id: PropertyId,
        identifier: String,
        index: usize,
    },
}

/// Registered listeners of one owner tree.
#[derive(Debug, Clone, Default)]
pub struct OwnerObservers {
    senders: Vec<Sender<OwnerEvent>>,
}

impl OwnerObservers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener; events arrive on the returned receiver in
    /// notification order.
    pub fn subscribe(&mut self) -> Receiver<OwnerEvent> {
        let (tx, rx) = unbounded();
        self.senders.push(tx);
        rx
    }

    /// Deliver an event to every live listener, dropping the disconnected.
    pub fn notify(&mut self, event: OwnerEvent) {
        self.senders.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_and_notify() {
        let mut obs = OwnerObservers::new();
        let rx = obs.subscribe();

        obs.notify(OwnerEvent::DidAddProperty {
            parent: PropertyId::INVALID,
            id: PropertyId(0),
            identifier: "iso".into(),
            index: 0,
        });

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], OwnerEvent::DidAddProperty { .. }));
    }

    #[test]
    fn test_disconnected_listener_dropped() {
        let mut obs = OwnerObservers::new();
        let rx = obs.subscribe();
        drop(rx);

        obs.notify(OwnerEvent::WillRemoveProperty {
            parent: PropertyId::INVALID,
            id: PropertyId(1),
            identifier: "iso".into(),
            index: 0,
        });
        assert!(obs.is_empty());
    }
}
