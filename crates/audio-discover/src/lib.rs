pub mod audiomgr;
pub mod card;
pub mod classify;
pub mod deferred;
pub mod discover;
pub mod error;
pub mod registry;
pub mod router;
pub mod scenario;
pub mod sources;
pub mod stream;
pub mod types;

pub use audiomgr::{AudioManager, LocalAudioManager};
pub use card::{parse_profile_name, ProfileTargets, MAX_CARD_TARGET};
pub use classify::{
    classify_by_card, classify_stream, default_display_name, derive_privacy, Bus, CardClass,
};
pub use deferred::{DeferredAction, DeferredQueue, EventLoop};
pub use discover::{Discover, ProfileSwitch};
pub use error::*;
pub use registry::NodeRegistry;
pub use router::{PriorityRouter, RouteChange, Router};
pub use scenario::{Scenario, ServerEvent};
pub use sources::*;
pub use stream::ExplicitRoutes;
pub use types::*;
