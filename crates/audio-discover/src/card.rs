//! Card ingestion
//!
//! Expands cards into device nodes and keeps them current across profile
//! switches, sink/source hot-plug and card removal.

use tracing::{debug, error, info, warn};

use crate::classify::{classify_by_card, default_display_name, derive_privacy, Bus};
use crate::deferred::DeferredAction;
use crate::discover::{Discover, ProfileSwitch};
use crate::error::ProfileNameError;
use crate::sources::{
    props, Card, Endpoint, EventSource, Port, PortAvailability, Profile, Sink, Source,
};
use crate::types::{CardRef, Direction, Handle, Implement, Node, NodeId, NodeType, Stamp};

/// Most sink or source targets a single profile name may carry.
pub const MAX_CARD_TARGET: usize = 4;

const ALSA_CARD_PREFIX: &str = "alsa_card.";
const BLUEZ_CARD_PREFIX: &str = "bluez_card.";

/// Sink and source targets named by an ALSA profile, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileTargets {
    pub sinks: Vec<String>,
    pub sources: Vec<String>,
}

/// Split a profile name such as `output:analog-stereo+input:analog-stereo`.
pub fn parse_profile_name(profile: &str) -> Result<ProfileTargets, ProfileNameError> {
    let mut targets = ProfileTargets::default();

    for segment in profile.split('+') {
        let (list, direction, name) = if let Some(name) = segment.strip_prefix("output:") {
            (&mut targets.sinks, Direction::Output, name)
        } else if let Some(name) = segment.strip_prefix("input:") {
            (&mut targets.sources, Direction::Input, name)
        } else {
            return Err(ProfileNameError::Malformed {
                profile: profile.to_string(),
            });
        };

        if name.is_empty() {
            return Err(ProfileNameError::Malformed {
                profile: profile.to_string(),
            });
        }
        if list.len() >= MAX_CARD_TARGET {
            return Err(ProfileNameError::TooManyTargets {
                profile: profile.to_string(),
                direction,
                max: MAX_CARD_TARGET,
            });
        }
        list.push(name.to_string());
    }

    Ok(targets)
}

/// Per-scan attributes shared by every node a card profile produces.
struct Expansion<'a> {
    card: &'a Card,
    bus: Bus,
    profile: &'a Profile,
    direction: Direction,
    channels: u32,
    paname: String,
    amdescr: &'a str,
    stamp: Stamp,
}

impl Expansion<'_> {
    fn build(&self, key: &str, port: Option<&Port>) -> Node {
        let port_name = port.map(|p| p.name.as_str());
        let port_description = port.and_then(|p| p.description.as_deref());

        let class = classify_by_card(
            self.direction,
            self.bus,
            self.card.form_factor(),
            Some(&self.profile.name),
            port_name,
            port_description,
        );

        let mut node = Node::new(key, self.direction, Implement::Device);
        node.node_type = class.node_type;
        node.location = class.location;
        node.privacy = derive_privacy(class.node_type, self.direction);
        node.amname = default_display_name(&class, port_description, port_name, &self.paname);
        node.amdescr = self.amdescr.to_string();
        node.paname = self.paname.clone();
        node.channels = self.channels;
        node.available = port.map_or(true, |p| p.available != PortAvailability::No);
        node.card = Some(CardRef {
            index: self.card.index,
            profile: self.profile.name.clone(),
        });
        node.port_name = port_name.map(str::to_string);
        node.stamp = self.stamp;
        node
    }
}

impl Discover {
    /// A card appeared on the server.
    pub fn card_added(&mut self, card: &Card) {
        let Some(bus_name) = card.bus() else {
            debug!(
                "ignoring card '{}' due to lack of '{}' property",
                card.name,
                props::DEVICE_BUS
            );
            return;
        };

        match Bus::parse(bus_name) {
            Some(bus @ (Bus::Pci | Bus::Usb)) => {
                let stamp = self.next_stamp();
                self.handle_alsa_card(card, bus, stamp);
            }
            Some(Bus::Bluetooth) => self.handle_bluetooth_card(card),
            None => debug!(
                "ignoring card '{}' due to unsupported bus type '{}'",
                card.name, bus_name
            ),
        }
    }

    /// A card went away: retire every device node it produced.
    pub fn card_removed(&mut self, card_index: u32) {
        let retired = self.registry.retire_where(|n| n.belongs_to_card(card_index));
        debug!("card {} removed, retired {} nodes", card_index, retired.len());

        if self.switch.as_ref().is_some_and(|s| s.card == card_index) {
            self.switch = None;
        }
    }

    /// The server is about to switch `card_index` to `profile`.
    ///
    /// Until `profile_changed` arrives for that card, sinks and sources
    /// appearing on it are keyed by the new profile.
    pub fn profile_changing(&mut self, card_index: u32, profile: &str) {
        debug!("card {} switching to profile '{}'", card_index, profile);
        self.switch = Some(ProfileSwitch {
            card: card_index,
            profile: profile.to_string(),
        });
    }

    /// The active profile of `card` changed.
    pub fn profile_changed(&mut self, card: &Card) {
        self.apply_profile_change(card);

        if self.switch.as_ref().is_some_and(|s| s.card == card.index) {
            self.switch = None;
        }
    }

    fn apply_profile_change(&mut self, card: &Card) {
        let Some(bus_name) = card.bus() else {
            debug!(
                "ignoring profile change on card '{}' due to lack of '{}' property",
                card.name,
                props::DEVICE_BUS
            );
            return;
        };

        match Bus::parse(bus_name) {
            Some(Bus::Bluetooth) => {
                let Some(profile) = card.active() else {
                    warn!("card '{}' has no active profile", card.name);
                    return;
                };
                debug!("bluetooth profile changed to '{}' on card '{}'", profile.name, card.name);

                if profile.is_off() {
                    // switched off but not unloaded yet
                    let index = card.index;
                    self.registry.for_each_mut(|node| {
                        if node.belongs_to_card(index) {
                            node.available = false;
                        }
                    });
                }
            }
            Some(bus @ (Bus::Pci | Bus::Usb)) => {
                debug!(
                    "alsa profile changed to '{}' on card '{}'",
                    card.active_profile.as_deref().unwrap_or("<none>"),
                    card.name
                );

                let stamp = self.next_stamp();
                self.handle_alsa_card(card, bus, stamp);

                let index = card.index;
                let stale = self
                    .registry
                    .retire_where(|n| n.belongs_to_card(index) && n.stamp < stamp);
                if !stale.is_empty() {
                    debug!("retired {} stale nodes of card '{}'", stale.len(), card.name);
                }
            }
            None => debug!(
                "ignoring profile change on card '{}' due to unsupported bus type '{}'",
                card.name, bus_name
            ),
        }
    }

    fn handle_alsa_card(&mut self, card: &Card, bus: Bus, stamp: Stamp) {
        if card.proplist.get(props::UDEV_DISCOVERED) != Some("1") {
            info!("statically loaded card '{}' is not supported", card.name);
            return;
        }
        let Some(card_id) = card.name.strip_prefix(ALSA_CARD_PREFIX) else {
            debug!("ignoring unrecognized card '{}'", card.name);
            return;
        };

        let amdescr = card.proplist.get(props::ALSA_CARD_NAME).unwrap_or("");
        let active = card.active_profile.as_deref();

        for profile in &card.profiles {
            if self.config.selected_profile_only && active != Some(profile.name.as_str()) {
                continue;
            }
            if profile.is_off() {
                continue;
            }
            if profile.n_sinks > 0 && !self.config.accepts_channels(profile.max_sink_channels) {
                debug!(
                    "skipping profile '{}': {} sink channels out of range",
                    profile.name, profile.max_sink_channels
                );
                continue;
            }
            if profile.n_sources > 0 && !self.config.accepts_channels(profile.max_source_channels) {
                debug!(
                    "skipping profile '{}': {} source channels out of range",
                    profile.name, profile.max_source_channels
                );
                continue;
            }

            let targets = match parse_profile_name(&profile.name) {
                Ok(targets) => targets,
                Err(e) => {
                    debug!("{}", e);
                    continue;
                }
            };

            for target in &targets.sinks {
                self.expand_ports(Expansion {
                    card,
                    bus,
                    profile,
                    direction: Direction::Output,
                    channels: profile.max_sink_channels,
                    paname: format!("alsa_output.{}.{}", card_id, target),
                    amdescr,
                    stamp,
                });
            }
            for target in &targets.sources {
                self.expand_ports(Expansion {
                    card,
                    bus,
                    profile,
                    direction: Direction::Input,
                    channels: profile.max_source_channels,
                    paname: format!("alsa_input.{}.{}", card_id, target),
                    amdescr,
                    stamp,
                });
            }
        }
    }

    /// One node per participating port, or one whole-profile node if none.
    fn expand_ports(&mut self, expansion: Expansion<'_>) {
        let mut have_ports = false;

        for port in &expansion.card.ports {
            if !port.serves(&expansion.profile.name, expansion.direction) {
                continue;
            }
            have_ports = true;

            let key = format!("{}@{}", expansion.paname, port.name);
            let candidate = expansion.build(&key, Some(port));
            self.upsert_device(candidate);
        }

        if !have_ports {
            let candidate = expansion.build(&expansion.paname, None);
            self.upsert_device(candidate);
        }
    }

    /// Insert `candidate`, or refresh the scan-dependent fields of the node
    /// already holding its key.
    fn upsert_device(&mut self, candidate: Node) -> NodeId {
        let stamp = candidate.stamp;
        let available = candidate.available;
        let card = candidate.card.clone();
        let key = candidate.key().to_string();

        let (id, created) = self.registry.upsert(&key, || candidate);
        if !created {
            if let Some(node) = self.registry.get_mut(id) {
                node.touch(stamp);
                node.available = available;
                node.card = card;
            }
        }
        id
    }

    fn handle_bluetooth_card(&mut self, card: &Card) {
        let Some(card_id) = card.name.strip_prefix(BLUEZ_CARD_PREFIX) else {
            debug!("ignoring unrecognized bluetooth card '{}'", card.name);
            return;
        };

        let stamp = self.next_stamp();
        let amdescr = card.proplist.get(props::DEVICE_DESCRIPTION).unwrap_or("");

        for profile in &card.profiles {
            if profile.n_sinks > 0 {
                let expansion = Expansion {
                    card,
                    bus: Bus::Bluetooth,
                    profile,
                    direction: Direction::Output,
                    channels: profile.max_sink_channels,
                    paname: format!("bluez_sink.{}", card_id),
                    amdescr,
                    stamp,
                };
                let key = format!("{}@{}", expansion.paname, profile.name);
                self.upsert_device(expansion.build(&key, None));
            }
            if profile.n_sources > 0 {
                let expansion = Expansion {
                    card,
                    bus: Bus::Bluetooth,
                    profile,
                    direction: Direction::Input,
                    channels: profile.max_source_channels,
                    paname: format!("bluez_source.{}", card_id),
                    amdescr,
                    stamp,
                };
                let key = format!("{}@{}", expansion.paname, profile.name);
                self.upsert_device(expansion.build(&key, None));
            }
        }

        match card.active() {
            Some(profile) => debug!("card '{}' default profile '{}'", card.name, profile.name),
            None => warn!("card '{}' has no active profile", card.name),
        }

        self.schedule(DeferredAction::CardCheck { card: card.index });
    }

    /// Registry key of the device node a card-backed sink or source maps to.
    fn endpoint_key(
        &self,
        endpoint: &Endpoint,
        what: &str,
        server: &dyn EventSource,
    ) -> Option<String> {
        let card_index = endpoint.card?;
        let Some(card) = server.card(card_index) else {
            debug!("ignoring {} '{}': card {} not found", what, endpoint.name, card_index);
            return None;
        };

        let profile = match &self.switch {
            Some(switch) if switch.card == card.index => {
                debug!(
                    "profile switch in flight, '{}' supersedes '{}'",
                    switch.profile,
                    card.active_profile.as_deref().unwrap_or("<none>")
                );
                Some(switch.profile.as_str())
            }
            _ => card.active_profile.as_deref(),
        };

        let Some(bus_name) = card.bus() else {
            debug!(
                "ignoring {} '{}' due to lack of '{}' property on its card",
                what,
                endpoint.name,
                props::DEVICE_BUS
            );
            return None;
        };

        match Bus::parse(bus_name) {
            Some(Bus::Bluetooth) => {
                let Some(profile) = profile else {
                    warn!("card '{}' has no active profile", card.name);
                    return None;
                };
                Some(format!("{}@{}", endpoint.name, profile))
            }
            Some(Bus::Pci | Bus::Usb) => Some(match &endpoint.active_port {
                Some(port) => format!("{}@{}", endpoint.name, port),
                None => endpoint.name.clone(),
            }),
            None => {
                debug!(
                    "ignoring {} '{}' due to unsupported bus type '{}' of its card",
                    what, endpoint.name, bus_name
                );
                None
            }
        }
    }

    /// Bind a card-backed endpoint to its node and mark it available.
    fn bind_endpoint(
        &mut self,
        endpoint: &Endpoint,
        handle: Handle,
        what: &str,
        server: &dyn EventSource,
    ) -> Option<NodeType> {
        let key = self.endpoint_key(endpoint, what, server)?;
        let Some(id) = self.registry.id_by_key(&key) else {
            debug!("can't find node for {} (key '{}')", what, key);
            return None;
        };

        if let Err(e) = self.registry.bind_handle(handle, id) {
            error!("failed to bind {} '{}': {}", what, endpoint.name, e);
            return None;
        }

        let node = self.registry.get_mut(id)?;
        debug!(
            "node for '{}' found (key {}), updating with {} data",
            node.paname,
            node.key(),
            what
        );
        node.available = true;
        Some(node.node_type)
    }

    /// A sink appeared. `route` asks for routing to follow.
    pub fn sink_added(&mut self, sink: &Sink, route: bool, server: &dyn EventSource) {
        if sink.card.is_none() {
            self.add_cardless_sink(sink);
            return;
        }

        let handle = Handle::sink(sink.index);
        let Some(node_type) = self.bind_endpoint(sink, handle, "sink", server) else {
            return;
        };

        if route {
            self.follow_endpoint_change(node_type);
        }
    }

    fn add_cardless_sink(&mut self, sink: &Sink) {
        if self.config.null_sink_name.as_deref() != Some(sink.name.as_str()) {
            info!("currently we do not support statically loaded sinks ('{}')", sink.name);
            return;
        }

        let handle = Handle::sink(sink.index);
        let (id, created) = self.registry.upsert(&sink.name, || {
            let mut node = Node::new(&sink.name, Direction::Output, Implement::Device);
            node.node_type = NodeType::Null;
            node.privacy = derive_privacy(NodeType::Null, Direction::Output);
            node.visible = false;
            node.available = true;
            node.amname = "Silent".to_string();
            node.paname = sink.name.clone();
            node.channels = sink.channels;
            node.handle = Some(handle);
            node
        });

        if !created {
            if let Err(e) = self.registry.bind_handle(handle, id) {
                error!("failed to bind null sink '{}': {}", sink.name, e);
                return;
            }
            if let Some(node) = self.registry.get_mut(id) {
                node.available = true;
            }
        }
    }

    /// A sink went away.
    pub fn sink_removed(&mut self, sink: &Sink) {
        let Some(id) = self.registry.unbind_handle(Handle::sink(sink.index)) else {
            debug!("can't find node for sink (name '{}')", sink.name);
            return;
        };
        let Some(node) = self.registry.get_mut(id) else {
            return;
        };
        debug!("node found for '{}', resetting sink data", sink.name);

        if sink.card.is_none() {
            if node.node_type == NodeType::Null {
                node.available = false;
            } else {
                info!("currently we do not support statically loaded sinks ('{}')", sink.name);
            }
            return;
        }

        if !node.node_type.is_bluetooth() {
            node.available = false;
        } else if self.switch_in_flight() {
            self.schedule(DeferredAction::Routing);
        }
    }

    /// A source appeared.
    pub fn source_added(&mut self, source: &Source, server: &dyn EventSource) {
        if source.card.is_none() {
            debug!("ignoring source '{}' without a card", source.name);
            return;
        }
        let handle = Handle::source(source.index);
        if let Some(node_type) = self.bind_endpoint(source, handle, "source", server) {
            if node_type.is_bluetooth() && self.switch_in_flight() {
                self.schedule(DeferredAction::Routing);
            }
        }
    }

    /// A source went away.
    pub fn source_removed(&mut self, source: &Source) {
        let Some(id) = self.registry.unbind_handle(Handle::source(source.index)) else {
            debug!("can't find node for source (name '{}')", source.name);
            return;
        };
        let switching = self.switch_in_flight();
        let Some(node) = self.registry.get_mut(id) else {
            return;
        };
        debug!("node found for '{}', resetting source data", source.name);

        if !node.node_type.is_bluetooth() {
            node.available = false;
        } else if switching {
            self.schedule(DeferredAction::Routing);
        }
    }

    /// Routing follow-up after a card-backed sink appeared.
    ///
    /// Bluetooth endpoints come and go in bursts during a profile switch, so
    /// their recompute is deferred until the switch's callbacks are done.
    fn follow_endpoint_change(&mut self, node_type: NodeType) {
        if node_type.is_bluetooth() && self.switch_in_flight() {
            self.schedule(DeferredAction::Routing);
        } else {
            self.recompute_routes();
        }
    }
}
