//! Stream ingestion
//!
//! Classifies playback streams, pre-routes new ones and keeps a stream node
//! for every classified stream attached to a sink.

use std::collections::HashSet;

use tracing::{debug, error, warn};

use crate::classify::classify_stream;
use crate::discover::Discover;
use crate::router::RouteChange;
use crate::sources::{props, EventSource, NewStream, PropList, StreamInput};
use crate::types::{Direction, Handle, HandleKind, Implement, Node, NodeId, NodeType};

/// Stream routes already reported to the router.
///
/// Reporting is idempotent: a route is announced once when added and once
/// when removed, never twice for the same stream and destination.
#[derive(Debug, Default)]
pub struct ExplicitRoutes {
    routes: HashSet<(NodeId, NodeId)>,
}

impl ExplicitRoutes {
    /// Record a route. False if it was already recorded.
    pub fn insert(&mut self, stream: NodeId, destination: NodeId) -> bool {
        self.routes.insert((stream, destination))
    }

    /// Forget a route. False if it was not recorded.
    pub fn remove(&mut self, stream: NodeId, destination: NodeId) -> bool {
        self.routes.remove(&(stream, destination))
    }

    /// Forget every route of `stream`, returning their destinations.
    pub fn take_stream(&mut self, stream: NodeId) -> Vec<NodeId> {
        let destinations: Vec<NodeId> = self
            .routes
            .iter()
            .filter(|(s, _)| *s == stream)
            .map(|(_, d)| *d)
            .collect();
        for destination in &destinations {
            self.routes.remove(&(stream, *destination));
        }
        destinations
    }

    pub fn contains(&self, stream: NodeId, destination: NodeId) -> bool {
        self.routes.contains(&(stream, destination))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Write the routing class of a stream back onto its properties.
pub fn set_routing_properties(proplist: &mut PropList, node_type: NodeType, explicit: bool) {
    let method = if explicit {
        props::ROUTING_EXPLICIT
    } else {
        props::ROUTING_DEFAULT
    };
    proplist.set(props::ROUTING_CLASS_NAME, node_type.as_str());
    proplist.set(props::ROUTING_CLASS_ID, node_type.class_id().to_string());
    proplist.set(props::ROUTING_METHOD, method);
}

/// Read back a routing class stamped earlier. Only application classes count.
pub fn routing_class(proplist: &PropList) -> Option<NodeType> {
    proplist
        .get(props::ROUTING_CLASS_ID)?
        .parse::<u32>()
        .ok()
        .and_then(NodeType::from_application_class_id)
}

fn stream_class(proplist: &PropList) -> Option<NodeType> {
    classify_stream(
        proplist.get(props::MEDIA_ROLE),
        proplist.get(props::APPLICATION_PROCESS_BINARY),
    )
}

impl Discover {
    /// Classify a stream being created and, if it has no sink yet, propose one.
    ///
    /// Returns the sink handle to bind the stream to; the caller may ignore it.
    pub fn preroute(&mut self, stream: &mut NewStream, server: &dyn EventSource) -> Option<Handle> {
        let Some(node_type) = stream_class(&stream.proplist) else {
            debug!("can't classify new stream, leaving it alone");
            return None;
        };

        set_routing_properties(&mut stream.proplist, node_type, stream.sink.is_some());

        if stream.sink.is_some() {
            return None;
        }

        let mut candidate = Node::new("<preroute>", Direction::Input, Implement::Stream);
        candidate.identify(NodeId::nil(), "<preroute>");
        candidate.node_type = node_type;
        candidate.channels = stream.channels;
        candidate.amname = "<preroute>".to_string();

        let target = self
            .router
            .decide_preroute(&candidate, &self.registry)
            .and_then(|id| self.registry.get(id));

        let Some(target) = target else {
            warn!("there is no default route for the new stream");
            return None;
        };
        let Some(handle) = target.handle else {
            warn!("can't route to the default '{}': no sink", target.amname);
            return None;
        };
        if handle.kind != HandleKind::Sink || server.sink(handle.index).is_none() {
            warn!("can't route to the default '{}': sink lookup failed", target.amname);
            return None;
        }

        debug!("preroute: new stream ({}) => '{}'", node_type, target.amname);
        Some(handle)
    }

    /// A stream was attached to a sink.
    pub fn stream_added(&mut self, stream: &mut StreamInput) {
        debug!("dealing with new stream '{}'", stream.name);

        let node_type = match routing_class(&stream.proplist) {
            Some(node_type) => node_type,
            None => match stream_class(&stream.proplist) {
                Some(node_type) => {
                    set_routing_properties(&mut stream.proplist, node_type, false);
                    node_type
                }
                None => {
                    debug!("can't find stream class for '{}', leaving it alone", stream.name);
                    return;
                }
            },
        };

        let key = format!("stream_input.{}", stream.index);
        let handle = Handle::stream_input(stream.index);

        let (id, created) = self.registry.upsert(&key, || {
            let mut node = Node::new(&key, Direction::Input, Implement::Stream);
            node.node_type = node_type;
            node.channels = stream.channels;
            node.amname = stream.name.clone();
            node.amdescr = stream.proplist.get(props::MEDIA_NAME).unwrap_or("").to_string();
            node.paname = stream.name.clone();
            node.handle = Some(handle);
            node
        });

        if !created {
            error!("confused with stream: '{}' already exists", key);
            return;
        }

        let Some(destination) = stream
            .sink
            .and_then(|sink| self.registry.id_by_handle(Handle::sink(sink)))
        else {
            debug!("can't figure out where this stream is routed");
            return;
        };

        if self.routes.insert(id, destination) {
            self.router
                .observe_route(RouteChange::Added { stream: id, destination }, &self.registry);
        }
    }

    /// A stream went away. Its node is retired unconditionally.
    pub fn stream_removed(&mut self, stream: &StreamInput) {
        let Some(id) = self
            .registry
            .unbind_handle(Handle::stream_input(stream.index))
        else {
            debug!("can't find node for stream (name '{}')", stream.name);
            return;
        };

        let current = stream
            .sink
            .and_then(|sink| self.registry.id_by_handle(Handle::sink(sink)));
        match current {
            Some(destination) => {
                if self.routes.remove(id, destination) {
                    self.router.observe_route(
                        RouteChange::Removed { stream: id, destination },
                        &self.registry,
                    );
                }
            }
            None => debug!("can't figure out where this stream is routed"),
        }

        // the stream may have moved since it was added
        for destination in self.routes.take_stream(id) {
            self.router
                .observe_route(RouteChange::Removed { stream: id, destination }, &self.registry);
        }

        if let Err(e) = self.registry.retire(id) {
            error!("confused with data structures: {}", e);
        }
    }
}
