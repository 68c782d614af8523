//! Batched structural-change notifications.
//!
//! A [`NetworkLock`] is a scoped, reentrant suppression token: while at least
//! one lock is held, structural-change events are buffered, and the outermost
//! release flushes them in order. This batches expensive downstream reactions
//! (re-evaluation, re-render) during compound mutations; it is an ordering
//! guarantee, not a concurrency primitive — the whole network model is
//! single-threaded.

use crossbeam_channel::{unbounded, Receiver, Sender};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// A structural change of the network graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkEvent {
    ProcessorAdded { identifier: String },
    ProcessorRemoved { identifier: String },
    ConnectionAdded { outport: String, inport: String },
    ConnectionRemoved { outport: String, inport: String },
    LinkAdded { src: String, dst: String },
    LinkRemoved { src: String, dst: String },
}

#[derive(Debug, Default)]
struct NotifierInner {
    depth: Cell<usize>,
    pending: RefCell<Vec<NetworkEvent>>,
    senders: RefCell<Vec<Sender<NetworkEvent>>>,
}

/// Shared event fan-out of one network. Cloning shares the same buffer and
/// lock depth.
#[derive(Debug, Clone, Default)]
pub struct NetworkNotifier {
    inner: Rc<NotifierInner>,
}

impl NetworkNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener; events arrive on the returned receiver, batched
    /// while a lock is held.
    pub fn subscribe(&self) -> Receiver<NetworkEvent> {
        let (tx, rx) = unbounded();
        self.inner.senders.borrow_mut().push(tx);
        rx
    }

    pub fn is_locked(&self) -> bool {
        self.inner.depth.get() > 0
    }

    /// Deliver or buffer an event depending on the lock depth.
    pub fn notify(&self, event: NetworkEvent) {
        if self.is_locked() {
            self.inner.pending.borrow_mut().push(event);
        } else {
            self.dispatch(event);
        }
    }

    fn dispatch(&self, event: NetworkEvent) {
        self.inner
            .senders
            .borrow_mut()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Acquire a suppression token. Reentrant: nested locks only extend the
    /// batch.
    pub fn lock(&self) -> NetworkLock {
        self.inner.depth.set(self.inner.depth.get() + 1);
        NetworkLock {
            notifier: self.clone(),
        }
    }
}

/// RAII guard returned by [`NetworkNotifier::lock`]. Dropping the outermost
/// guard flushes the buffered events in notification order.
pub struct NetworkLock {
    notifier: NetworkNotifier,
}

impl Drop for NetworkLock {
    fn drop(&mut self) {
        let inner = &self.notifier.inner;
        let depth = inner.depth.get();
        inner.depth.set(depth - 1);
        if depth == 1 {
            let pending = std::mem::take(&mut *inner.pending.borrow_mut());
            for event in pending {
                self.notifier.dispatch(event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn added(id: &str) -> NetworkEvent {
        NetworkEvent::ProcessorAdded {
            identifier: id.to_string(),
        }
    }

    #[test]
    fn test_unlocked_events_pass_through() {
        let notifier = NetworkNotifier::new();
        let rx = notifier.subscribe();
        notifier.notify(added("a"));
        assert_eq!(rx.try_iter().count(), 1);
    }

    #[test]
    fn test_lock_batches_until_outermost_release() {
        let notifier = NetworkNotifier::new();
        let rx = notifier.subscribe();

        let outer = notifier.lock();
        notifier.notify(added("a"));
        {
            let _inner = notifier.lock();
            notifier.notify(added("b"));
        }
        // Inner release must not flush.
        assert_eq!(rx.try_iter().count(), 0);

        drop(outer);
        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(events, vec![added("a"), added("b")]);
    }
}
