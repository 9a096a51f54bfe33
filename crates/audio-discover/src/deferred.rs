//! One-shot follow-up actions run after the current event has been handled.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum DeferredAction {
    /// Full routing recompute.
    Routing,
    /// Recount live sinks and sources of a card; recompute if it has none.
    CardCheck { card: u32 },
}

/// The host's event loop. A posted action cannot be withdrawn.
pub trait EventLoop {
    fn post_once(&mut self, action: DeferredAction);
}

/// FIFO event loop stand-in. Clones share the same queue, so the engine can
/// post into one clone while the host drains another.
#[derive(Debug, Clone, Default)]
pub struct DeferredQueue {
    inner: Rc<RefCell<VecDeque<DeferredAction>>>,
}

impl DeferredQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pop(&self) -> Option<DeferredAction> {
        self.inner.borrow_mut().pop_front()
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }

    pub fn pending(&self) -> Vec<DeferredAction> {
        self.inner.borrow().iter().copied().collect()
    }
}

impl EventLoop for DeferredQueue {
    fn post_once(&mut self, action: DeferredAction) {
        self.inner.borrow_mut().push_back(action);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_queue() {
        let host = DeferredQueue::new();
        let mut engine_side = host.clone();

        engine_side.post_once(DeferredAction::CardCheck { card: 3 });
        engine_side.post_once(DeferredAction::Routing);

        assert_eq!(host.len(), 2);
        assert_eq!(host.pop(), Some(DeferredAction::CardCheck { card: 3 }));
        assert_eq!(host.pop(), Some(DeferredAction::Routing));
        assert!(host.is_empty());
        assert_eq!(host.pop(), None);
    }
}
