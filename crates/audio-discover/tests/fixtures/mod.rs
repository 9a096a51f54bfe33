#![allow(dead_code)]

use audio_discover::scenario::Replay;
use audio_discover::{
    props, AudioManager, AudioManagerError, Card, DeferredQueue, Discover, ManagerId, NewStream,
    Node, NodeId, NodeRegistry, Port, PortAvailability, Profile, PropList, RouteChange, Router,
    ServerEvent, Sink, Source, StreamInput,
};
use discoverconf::DiscoverConfig;
use std::cell::RefCell;
use std::rc::Rc;

/// Everything the recording router saw.
#[derive(Debug, Default)]
pub struct RouterLog {
    pub recomputes: usize,
    pub preroute_candidates: Vec<Node>,
    pub routes: Vec<RouteChange>,
    /// Key of the node `decide_preroute` answers with.
    pub preroute_target: Option<String>,
}

pub struct RecordingRouter(pub Rc<RefCell<RouterLog>>);

impl Router for RecordingRouter {
    fn recompute_routes(&mut self, _registry: &NodeRegistry) {
        self.0.borrow_mut().recomputes += 1;
    }

    fn decide_preroute(&mut self, candidate: &Node, registry: &NodeRegistry) -> Option<NodeId> {
        let mut log = self.0.borrow_mut();
        log.preroute_candidates.push(candidate.clone());
        let key = log.preroute_target.clone()?;
        registry.id_by_key(&key)
    }

    fn observe_route(&mut self, change: RouteChange, _registry: &NodeRegistry) {
        self.0.borrow_mut().routes.push(change);
    }
}

/// Keys the recording audio manager was told about.
#[derive(Debug, Default)]
pub struct AudioManagerLog {
    pub registered: Vec<String>,
    pub unregistered: Vec<String>,
    pub reject: bool,
}

pub struct RecordingAudioManager {
    log: Rc<RefCell<AudioManagerLog>>,
    next_id: u16,
}

impl RecordingAudioManager {
    pub fn new(log: Rc<RefCell<AudioManagerLog>>) -> Self {
        Self { log, next_id: 0 }
    }
}

impl AudioManager for RecordingAudioManager {
    fn register(&mut self, node: &Node) -> Result<ManagerId, AudioManagerError> {
        let mut log = self.log.borrow_mut();
        if log.reject {
            return Err(AudioManagerError::Rejected {
                key: node.key().to_string(),
                reason: "test rejection".to_string(),
            });
        }
        log.registered.push(node.key().to_string());
        self.next_id += 1;
        Ok(ManagerId(self.next_id))
    }

    fn unregister(&mut self, node: &Node) -> Result<(), AudioManagerError> {
        self.log.borrow_mut().unregistered.push(node.key().to_string());
        Ok(())
    }
}

pub struct TestFixture {
    pub replay: Replay,
    pub router: Rc<RefCell<RouterLog>>,
    pub audiomgr: Rc<RefCell<AudioManagerLog>>,
}

impl TestFixture {
    pub fn new() -> Self {
        Self::with_config(DiscoverConfig::default())
    }

    pub fn with_config(config: DiscoverConfig) -> Self {
        let router = Rc::new(RefCell::new(RouterLog::default()));
        let audiomgr = Rc::new(RefCell::new(AudioManagerLog::default()));

        let replay = Replay::new(
            config,
            Box::new(RecordingAudioManager::new(audiomgr.clone())),
            Box::new(RecordingRouter(router.clone())),
        );

        Self {
            replay,
            router,
            audiomgr,
        }
    }

    pub fn apply(&mut self, event: ServerEvent) {
        self.replay.apply(event);
    }

    pub fn node(&self, key: &str) -> Option<&Node> {
        self.replay.engine.find_node(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.replay
            .engine
            .nodes()
            .into_iter()
            .map(|n| n.key().to_string())
            .collect()
    }

    pub fn recomputes(&self) -> usize {
        self.router.borrow().recomputes
    }
}

/// An engine whose deferred actions stay queued until the test runs them.
pub struct QueuedEngine {
    pub engine: Discover,
    pub queue: DeferredQueue,
    pub router: Rc<RefCell<RouterLog>>,
}

impl QueuedEngine {
    pub fn new(config: DiscoverConfig) -> Self {
        let queue = DeferredQueue::new();
        let router = Rc::new(RefCell::new(RouterLog::default()));
        let audiomgr = Rc::new(RefCell::new(AudioManagerLog::default()));
        let engine = Discover::new(
            config,
            Box::new(RecordingAudioManager::new(audiomgr)),
            Box::new(RecordingRouter(router.clone())),
            Box::new(queue.clone()),
        );
        Self {
            engine,
            queue,
            router,
        }
    }

    pub fn recomputes(&self) -> usize {
        self.router.borrow().recomputes
    }
}

pub fn profile(name: &str, n_sinks: u32, n_sources: u32, channels: u32) -> Profile {
    Profile {
        name: name.to_string(),
        n_sinks,
        n_sources,
        max_sink_channels: if n_sinks > 0 { channels } else { 0 },
        max_source_channels: if n_sources > 0 { channels } else { 0 },
    }
}

pub fn output_port(name: &str, description: &str, profiles: &[&str]) -> Port {
    Port {
        name: name.to_string(),
        description: Some(description.to_string()),
        is_input: false,
        is_output: true,
        profiles: profiles.iter().map(|p| p.to_string()).collect(),
        available: PortAvailability::Unknown,
    }
}

pub fn input_port(name: &str, description: &str, profiles: &[&str]) -> Port {
    Port {
        is_input: true,
        is_output: false,
        ..output_port(name, description, profiles)
    }
}

/// A bluetooth headset card named `bluez_card.<id>`.
pub fn bluetooth_card(index: u32, id: &str, profiles: Vec<Profile>, active: &str) -> Card {
    Card {
        index,
        name: format!("bluez_card.{}", id),
        proplist: PropList::new()
            .with(props::DEVICE_BUS, "bluetooth")
            .with(props::DEVICE_FORM_FACTOR, "headset")
            .with(props::DEVICE_DESCRIPTION, "Test Headset"),
        profiles,
        active_profile: Some(active.to_string()),
        ports: vec![],
    }
}

/// A hot-plugged PCI card named `alsa_card.<id>` without a form factor.
pub fn alsa_card(
    index: u32,
    id: &str,
    profiles: Vec<Profile>,
    active: &str,
    ports: Vec<Port>,
) -> Card {
    Card {
        index,
        name: format!("alsa_card.{}", id),
        proplist: PropList::new()
            .with(props::DEVICE_BUS, "pci")
            .with(props::UDEV_DISCOVERED, "1")
            .with(props::ALSA_CARD_NAME, "HDA Intel PCH"),
        profiles,
        active_profile: Some(active.to_string()),
        ports,
    }
}

pub fn sink(index: u32, name: &str, card: Option<u32>, active_port: Option<&str>) -> Sink {
    Sink {
        index,
        name: name.to_string(),
        card,
        active_port: active_port.map(str::to_string),
        channels: 2,
    }
}

pub fn source(index: u32, name: &str, card: Option<u32>, active_port: Option<&str>) -> Source {
    sink(index, name, card, active_port)
}

pub fn stream_props(role: Option<&str>, binary: Option<&str>) -> PropList {
    let mut pl = PropList::new().with(props::MEDIA_NAME, "Playback");
    if let Some(role) = role {
        pl.set(props::MEDIA_ROLE, role);
    }
    if let Some(binary) = binary {
        pl.set(props::APPLICATION_PROCESS_BINARY, binary);
    }
    pl
}

pub fn new_stream(role: Option<&str>, binary: Option<&str>, sink: Option<u32>) -> NewStream {
    NewStream {
        proplist: stream_props(role, binary),
        sink,
        channels: 2,
    }
}

pub fn stream_input(
    index: u32,
    role: Option<&str>,
    binary: Option<&str>,
    sink: Option<u32>,
) -> StreamInput {
    StreamInput {
        index,
        name: format!("stream-{}", index),
        proplist: stream_props(role, binary),
        sink,
        channels: 2,
    }
}
