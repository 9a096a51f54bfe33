//! Recorded server event sequences and a driver that replays them.

use std::path::Path;

use discoverconf::DiscoverConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::audiomgr::AudioManager;
use crate::deferred::DeferredQueue;
use crate::discover::Discover;
use crate::error::ScenarioError;
use crate::router::Router;
use crate::sources::{Card, NewStream, ServerSnapshot, Sink, Source, StreamInput};

fn default_route() -> bool {
    true
}

/// One server callback, as recorded in a scenario file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ServerEvent {
    CardAdded {
        card: Card,
    },
    CardRemoved {
        index: u32,
    },
    ProfileChanging {
        card: u32,
        profile: String,
    },
    ProfileChanged {
        card: u32,
        profile: String,
    },
    SinkAdded {
        sink: Sink,
        #[serde(default = "default_route")]
        route: bool,
    },
    SinkRemoved {
        index: u32,
    },
    SourceAdded {
        source: Source,
    },
    SourceRemoved {
        index: u32,
    },
    StreamNew {
        stream: NewStream,
    },
    StreamAdded {
        stream: StreamInput,
    },
    StreamRemoved {
        index: u32,
    },
    DomainUp,
    DomainDown,
}

/// Ordered list of server events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scenario {
    pub events: Vec<ServerEvent>,
}

impl Scenario {
    pub fn from_json(json: &str) -> Result<Self, ScenarioError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }
}

/// Keeps a server snapshot current and feeds each event to the engine,
/// draining deferred actions after every event.
pub struct Replay {
    pub server: ServerSnapshot,
    pub engine: Discover,
    queue: DeferredQueue,
}

impl Replay {
    pub fn new(
        config: DiscoverConfig,
        audiomgr: Box<dyn AudioManager>,
        router: Box<dyn Router>,
    ) -> Self {
        let queue = DeferredQueue::new();
        let engine = Discover::new(config, audiomgr, router, Box::new(queue.clone()));
        Self {
            server: ServerSnapshot::new(),
            engine,
            queue,
        }
    }

    pub fn run(&mut self, scenario: &Scenario) {
        for event in &scenario.events {
            self.apply(event.clone());
        }
    }

    pub fn apply(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::CardAdded { card } => {
                self.server.put_card(card.clone());
                self.engine.card_added(&card);
            }
            ServerEvent::CardRemoved { index } => {
                if self.server.remove_card(index).is_none() {
                    warn!("removing unknown card {}", index);
                }
                self.engine.card_removed(index);
            }
            ServerEvent::ProfileChanging { card, profile } => {
                self.engine.profile_changing(card, &profile);
            }
            ServerEvent::ProfileChanged { card, profile } => {
                let Some(current) = self.server.card_mut(card) else {
                    warn!("profile change on unknown card {}", card);
                    return;
                };
                current.active_profile = Some(profile);
                let current = current.clone();
                self.engine.profile_changed(&current);
            }
            ServerEvent::SinkAdded { sink, route } => {
                self.server.put_sink(sink.clone());
                self.engine.sink_added(&sink, route, &self.server);
            }
            ServerEvent::SinkRemoved { index } => match self.server.remove_sink(index) {
                Some(sink) => self.engine.sink_removed(&sink),
                None => warn!("removing unknown sink {}", index),
            },
            ServerEvent::SourceAdded { source } => {
                self.server.put_source(source.clone());
                self.engine.source_added(&source, &self.server);
            }
            ServerEvent::SourceRemoved { index } => match self.server.remove_source(index) {
                Some(source) => self.engine.source_removed(&source),
                None => warn!("removing unknown source {}", index),
            },
            ServerEvent::StreamNew { mut stream } => {
                if let Some(handle) = self.engine.preroute(&mut stream, &self.server) {
                    info!("new stream prerouted to {}", handle);
                }
            }
            ServerEvent::StreamAdded { mut stream } => {
                self.engine.stream_added(&mut stream);
                self.server.put_stream_input(stream);
            }
            ServerEvent::StreamRemoved { index } => match self.server.remove_stream_input(index) {
                Some(stream) => self.engine.stream_removed(&stream),
                None => warn!("removing unknown stream {}", index),
            },
            ServerEvent::DomainUp => self.engine.domain_up(),
            ServerEvent::DomainDown => self.engine.domain_down(),
        }

        self.pump();
    }

    /// Run deferred actions until the queue is empty.
    pub fn pump(&mut self) {
        while let Some(action) = self.queue.pop() {
            debug!("running deferred {:?}", action);
            self.engine.run_deferred(action, &self.server);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_event_list() {
        let json = r#"[
            {"event": "card_removed", "index": 3},
            {"event": "profile_changing", "card": 1, "profile": "a2dp"},
            {"event": "sink_added", "sink": {"index": 4, "name": "null"}},
            {"event": "domain_up"}
        ]"#;
        let scenario = Scenario::from_json(json).unwrap();

        assert_eq!(scenario.events.len(), 4);
        assert_eq!(scenario.events[0], ServerEvent::CardRemoved { index: 3 });
        match &scenario.events[2] {
            ServerEvent::SinkAdded { sink, route } => {
                assert_eq!(sink.name, "null");
                assert!(sink.card.is_none());
                assert!(*route);
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(scenario.events[3], ServerEvent::DomainUp);
    }

    #[test]
    fn test_unknown_event_is_an_error() {
        let err = Scenario::from_json(r#"[{"event": "module_loaded"}]"#).unwrap_err();
        assert!(matches!(err, ScenarioError::Json(_)));
    }
}
