//! Node registry
//!
//! One owning store of nodes keyed by `NodeId`, with two derived indexes:
//! node key to id and live handle to id. Every index entry points into the
//! store; `retire` validates the key index before removing anything.

use std::collections::HashMap;

use tracing::{debug, error, warn};

use crate::audiomgr::AudioManager;
use crate::error::RegistryError;
use crate::types::{Handle, Node, NodeId};

pub struct NodeRegistry {
    nodes: HashMap<NodeId, Node>,
    by_key: HashMap<String, NodeId>,
    by_handle: HashMap<Handle, NodeId>,
    audiomgr: Box<dyn AudioManager>,
}

impl NodeRegistry {
    pub fn new(audiomgr: Box<dyn AudioManager>) -> Self {
        Self {
            nodes: HashMap::new(),
            by_key: HashMap::new(),
            by_handle: HashMap::new(),
            audiomgr,
        }
    }

    /// Look up `key`, building and registering a new node only if absent.
    ///
    /// Returns the node's id and whether it was created. An existing node is
    /// returned untouched. A new node gets a fresh id and `key`, is indexed
    /// under its handle if it has one, and is registered with the audio
    /// manager when visible.
    pub fn upsert(&mut self, key: &str, build: impl FnOnce() -> Node) -> (NodeId, bool) {
        if let Some(&id) = self.by_key.get(key) {
            return (id, false);
        }

        let mut node = build();
        node.identify(NodeId::new(), key);

        if node.visible {
            match self.audiomgr.register(&node) {
                Ok(manager_id) => node.manager_id = Some(manager_id),
                Err(e) => warn!("failed to register node '{}': {}", node.key(), e),
            }
        }

        debug!("new node:\n{}", node);

        let id = node.id();
        if let Some(handle) = node.handle {
            if let Some(previous) = self.by_handle.insert(handle, id) {
                self.clear_stale_handle(previous, handle);
            }
        }
        self.by_key.insert(node.key().to_string(), id);
        self.nodes.insert(id, node);

        (id, true)
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    pub fn find_by_key(&self, key: &str) -> Option<&Node> {
        self.by_key.get(key).and_then(|id| self.nodes.get(id))
    }

    pub fn id_by_key(&self, key: &str) -> Option<NodeId> {
        self.by_key.get(key).copied()
    }

    pub fn find_by_handle(&self, handle: Handle) -> Option<&Node> {
        self.by_handle.get(&handle).and_then(|id| self.nodes.get(id))
    }

    pub fn id_by_handle(&self, handle: Handle) -> Option<NodeId> {
        self.by_handle.get(&handle).copied()
    }

    /// Bind a live handle to node `id`.
    ///
    /// A handle already bound elsewhere moves to `id`; the previous holder
    /// loses it. A different handle previously held by `id` is dropped.
    pub fn bind_handle(&mut self, handle: Handle, id: NodeId) -> Result<(), RegistryError> {
        let old = match self.nodes.get(&id) {
            Some(node) => node.handle,
            None => return Err(RegistryError::UnknownNode(id)),
        };

        if let Some(old) = old.filter(|&h| h != handle) {
            self.by_handle.remove(&old);
        }

        if let Some(previous) = self.by_handle.insert(handle, id) {
            if previous != id {
                self.clear_stale_handle(previous, handle);
            }
        }

        if let Some(node) = self.nodes.get_mut(&id) {
            node.handle = Some(handle);
        }
        Ok(())
    }

    /// Drop the binding for `handle`, returning the node that held it.
    pub fn unbind_handle(&mut self, handle: Handle) -> Option<NodeId> {
        let id = self.by_handle.remove(&handle)?;
        if let Some(node) = self.nodes.get_mut(&id) {
            node.handle = None;
        }
        Some(id)
    }

    fn clear_stale_handle(&mut self, previous: NodeId, handle: Handle) {
        if let Some(node) = self.nodes.get_mut(&previous) {
            warn!(
                "handle {} moved away from '{}', unbinding it there",
                handle,
                node.key()
            );
            node.handle = None;
        }
    }

    /// Remove node `id` from the store and both indexes.
    ///
    /// The key index must map the node's key back to `id`; otherwise nothing
    /// is removed and the fault is returned.
    pub fn retire(&mut self, id: NodeId) -> Result<Node, RegistryError> {
        let key = match self.nodes.get(&id) {
            Some(node) => node.key().to_string(),
            None => return Err(RegistryError::UnknownNode(id)),
        };

        match self.by_key.get(&key) {
            None => return Err(RegistryError::NotIndexed { key }),
            Some(&found) if found != id => {
                return Err(RegistryError::KeyMismatch {
                    key,
                    expected: id,
                    found,
                })
            }
            Some(_) => {}
        }

        self.by_key.remove(&key);
        let node = self
            .nodes
            .remove(&id)
            .ok_or(RegistryError::UnknownNode(id))?;

        if let Some(handle) = node.handle {
            if self.by_handle.get(&handle) == Some(&id) {
                self.by_handle.remove(&handle);
            }
        }

        debug!("destroying node: {} / '{}'", node.key(), node.amname);

        if node.visible {
            if let Err(e) = self.audiomgr.unregister(&node) {
                warn!("failed to unregister node '{}': {}", node.key(), e);
            }
        }

        Ok(node)
    }

    /// Retire every node matching `pred`, logging consistency faults.
    pub fn retire_where(&mut self, pred: impl Fn(&Node) -> bool) -> Vec<Node> {
        let ids = self.ids_where(pred);
        let mut retired = Vec::with_capacity(ids.len());
        for id in ids {
            match self.retire(id) {
                Ok(node) => retired.push(node),
                Err(e) => error!("confused with data structures: {}", e),
            }
        }
        retired
    }

    pub fn ids_where(&self, pred: impl Fn(&Node) -> bool) -> Vec<NodeId> {
        self.nodes
            .values()
            .filter(|n| pred(n))
            .map(|n| n.id())
            .collect()
    }

    pub fn for_each(&self, mut visitor: impl FnMut(&Node)) {
        for node in self.nodes.values() {
            visitor(node);
        }
    }

    pub fn for_each_mut(&mut self, mut visitor: impl FnMut(&mut Node)) {
        for node in self.nodes.values_mut() {
            visitor(node);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Forget every manager id and register visible, available nodes again.
    pub fn reregister_all(&mut self) {
        for node in self.nodes.values_mut() {
            node.manager_id = None;
            if node.visible && node.available {
                match self.audiomgr.register(node) {
                    Ok(manager_id) => node.manager_id = Some(manager_id),
                    Err(e) => warn!("failed to register node '{}': {}", node.key(), e),
                }
            }
        }
    }

    /// Forget every manager id.
    pub fn clear_manager_ids(&mut self) {
        for node in self.nodes.values_mut() {
            node.manager_id = None;
        }
    }

    /// Verify both indexes agree with the store.
    pub fn check_consistency(&self) -> Result<(), RegistryError> {
        for (key, id) in &self.by_key {
            match self.nodes.get(id) {
                None => return Err(RegistryError::UnknownNode(*id)),
                Some(node) if node.key() != key.as_str() => {
                    return Err(RegistryError::KeyMismatch {
                        key: key.clone(),
                        expected: *id,
                        found: node.id(),
                    })
                }
                Some(_) => {}
            }
        }
        for (handle, id) in &self.by_handle {
            let node = self.nodes.get(id).ok_or(RegistryError::UnknownNode(*id))?;
            if node.handle != Some(*handle) || self.by_key.get(node.key()) != Some(id) {
                return Err(RegistryError::NotIndexed {
                    key: node.key().to_string(),
                });
            }
        }
        Ok(())
    }
}
