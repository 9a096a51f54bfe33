//! Routing collaborator.
//!
//! The routing algorithm itself lives outside this crate. The engine only
//! asks it to recompute, to pick an initial destination for a new stream,
//! and tells it about observed stream routes.

use tracing::debug;

use crate::registry::NodeRegistry;
use crate::types::{Direction, Implement, Node, NodeId, NodeType};

/// A stream route seen on the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteChange {
    Added { stream: NodeId, destination: NodeId },
    Removed { stream: NodeId, destination: NodeId },
}

pub trait Router {
    /// Recompute every route from the current node set.
    fn recompute_routes(&mut self, registry: &NodeRegistry);

    /// Choose an output for a stream that has none yet.
    ///
    /// `candidate` is transient and never enters the registry. The returned
    /// node may lack a live handle.
    fn decide_preroute(&mut self, candidate: &Node, registry: &NodeRegistry) -> Option<NodeId>;

    /// Informational; the route table is owned by the router.
    fn observe_route(&mut self, _change: RouteChange, _registry: &NodeRegistry) {}
}

/// Output preference, most preferred first.
const OUTPUT_PRIORITY: &[NodeType] = &[
    NodeType::BluetoothA2dp,
    NodeType::UsbHeadphone,
    NodeType::WiredHeadphone,
    NodeType::UsbHeadset,
    NodeType::WiredHeadset,
    NodeType::BluetoothSco,
    NodeType::Hdmi,
    NodeType::Speakers,
    NodeType::FrontSpeakers,
    NodeType::RearSpeakers,
    NodeType::Jack,
    NodeType::Spdif,
];

fn priority(node_type: NodeType) -> usize {
    OUTPUT_PRIORITY
        .iter()
        .position(|t| *t == node_type)
        .unwrap_or(OUTPUT_PRIORITY.len())
}

/// Sends every stream to the most preferred available output device.
#[derive(Debug, Default)]
pub struct PriorityRouter {
    recomputes: usize,
}

impl PriorityRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recomputes(&self) -> usize {
        self.recomputes
    }

    fn best_output(registry: &NodeRegistry) -> Option<&Node> {
        registry
            .iter()
            .filter(|n| {
                n.implement == Implement::Device
                    && n.direction == Direction::Output
                    && n.available
                    && n.visible
            })
            .min_by(|a, b| {
                priority(a.node_type)
                    .cmp(&priority(b.node_type))
                    .then_with(|| a.key().cmp(b.key()))
            })
    }
}

impl Router for PriorityRouter {
    fn recompute_routes(&mut self, registry: &NodeRegistry) {
        self.recomputes += 1;
        match Self::best_output(registry) {
            Some(node) => debug!("routing recomputed, default output '{}'", node.key()),
            None => debug!("routing recomputed, no output available"),
        }
    }

    fn decide_preroute(&mut self, candidate: &Node, registry: &NodeRegistry) -> Option<NodeId> {
        let target = Self::best_output(registry)?;
        debug!("preroute '{}' ({}) => '{}'", candidate.amname, candidate.node_type, target.key());
        Some(target.id())
    }

    fn observe_route(&mut self, change: RouteChange, registry: &NodeRegistry) {
        let name = |id: NodeId| {
            registry
                .get(id)
                .map(|n| n.amname.clone())
                .unwrap_or_else(|| id.to_string())
        };
        match change {
            RouteChange::Added { stream, destination } => {
                debug!("register route '{}' => '{}'", name(stream), name(destination))
            }
            RouteChange::Removed { stream, destination } => {
                debug!("clear route '{}' => '{}'", name(stream), name(destination))
            }
        }
    }
}
