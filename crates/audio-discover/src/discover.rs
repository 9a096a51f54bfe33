//! The discovery engine facade.
//!
//! `Discover` owns the registry and the collaborators and exposes one entry
//! point per server event. Entry points never fail: faults are logged and the
//! event is dropped for the node concerned. Card events are implemented in
//! `card.rs`, stream events in `stream.rs`.

use discoverconf::DiscoverConfig;
use tracing::{debug, info};

use crate::audiomgr::AudioManager;
use crate::deferred::{DeferredAction, EventLoop};
use crate::registry::NodeRegistry;
use crate::router::Router;
use crate::sources::EventSource;
use crate::stream::ExplicitRoutes;
use crate::types::{Node, Stamp};

/// A profile switch announced for a card and not yet completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileSwitch {
    pub card: u32,
    pub profile: String,
}

pub struct Discover {
    pub(crate) config: DiscoverConfig,
    pub(crate) registry: NodeRegistry,
    pub(crate) router: Box<dyn Router>,
    pub(crate) events: Box<dyn EventLoop>,
    pub(crate) stamp: Stamp,
    pub(crate) switch: Option<ProfileSwitch>,
    pub(crate) routes: ExplicitRoutes,
}

impl Discover {
    pub fn new(
        config: DiscoverConfig,
        audiomgr: Box<dyn AudioManager>,
        router: Box<dyn Router>,
        events: Box<dyn EventLoop>,
    ) -> Self {
        Self {
            config,
            registry: NodeRegistry::new(audiomgr),
            router,
            events,
            stamp: 0,
            switch: None,
            routes: ExplicitRoutes::default(),
        }
    }

    pub fn config(&self) -> &DiscoverConfig {
        &self.config
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    /// Live nodes ordered by key.
    pub fn nodes(&self) -> Vec<&Node> {
        let mut nodes: Vec<&Node> = self.registry.iter().collect();
        nodes.sort_by(|a, b| a.key().cmp(b.key()));
        nodes
    }

    pub fn find_node(&self, key: &str) -> Option<&Node> {
        self.registry.find_by_key(key)
    }

    /// Stamp of the most recent card scan.
    pub fn current_stamp(&self) -> Stamp {
        self.stamp
    }

    pub(crate) fn next_stamp(&mut self) -> Stamp {
        self.stamp += 1;
        self.stamp
    }

    pub fn profile_switch(&self) -> Option<&ProfileSwitch> {
        self.switch.as_ref()
    }

    pub(crate) fn switch_in_flight(&self) -> bool {
        self.switch.is_some()
    }

    pub(crate) fn recompute_routes(&mut self) {
        self.router.recompute_routes(&self.registry);
    }

    pub(crate) fn schedule(&mut self, action: DeferredAction) {
        match action {
            DeferredAction::Routing => debug!("scheduling deferred routing"),
            DeferredAction::CardCheck { card } => debug!("scheduling card check for card {}", card),
        }
        self.events.post_once(action);
    }

    /// Run a previously posted action. Its target may have disappeared since.
    pub fn run_deferred(&mut self, action: DeferredAction, server: &dyn EventSource) {
        match action {
            DeferredAction::Routing => {
                debug!("deferred routing starts");
                self.recompute_routes();
            }
            DeferredAction::CardCheck { card } => {
                debug!("card check starts");
                let Some(found) = server.card(card) else {
                    debug!("card {} is gone", card);
                    return;
                };
                let n_sinks = server.sinks_on_card(card);
                let n_sources = server.sources_on_card(card);
                if n_sinks > 0 || n_sources > 0 {
                    debug!(
                        "found {} sinks and {} sources belonging to '{}' card, nothing to do",
                        n_sinks, n_sources, found.name
                    );
                } else {
                    debug!("card '{}' has no sinks/sources, routing", found.name);
                    self.recompute_routes();
                }
            }
        }
    }

    /// The audio manager came (back) up: re-register everything it should see.
    pub fn domain_up(&mut self) {
        info!("audio manager domain up");
        self.registry.reregister_all();
    }

    /// The audio manager went away: every manager id is void.
    pub fn domain_down(&mut self) {
        info!("audio manager domain down");
        self.registry.clear_manager_ids();
    }
}
