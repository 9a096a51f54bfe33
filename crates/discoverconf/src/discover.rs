//! Discovery configuration - criteria used while expanding cards into nodes.

use serde::{Deserialize, Serialize};

/// Filtering criteria for sinks and sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoverConfig {
    /// Smallest accepted max-channel count of a profile direction.
    /// Default: 1
    #[serde(default = "DiscoverConfig::default_chmin")]
    pub chmin: u32,

    /// Largest accepted max-channel count of a profile direction.
    /// Default: 2
    #[serde(default = "DiscoverConfig::default_chmax")]
    pub chmax: u32,

    /// For ALSA cards: only expand the active profile.
    /// Bluetooth cards always expand every profile.
    /// Default: true
    #[serde(default = "DiscoverConfig::default_selected")]
    pub selected_profile_only: bool,

    /// Name of the card-less sink that becomes the Silent node.
    /// Default: none
    #[serde(default)]
    pub null_sink_name: Option<String>,
}

impl DiscoverConfig {
    fn default_chmin() -> u32 {
        1
    }

    fn default_chmax() -> u32 {
        2
    }

    fn default_selected() -> bool {
        true
    }

    /// Whether a max-channel count falls inside `[chmin, chmax]`.
    pub fn accepts_channels(&self, channels: u32) -> bool {
        channels >= self.chmin && channels <= self.chmax
    }
}

impl Default for DiscoverConfig {
    fn default() -> Self {
        Self {
            chmin: Self::default_chmin(),
            chmax: Self::default_chmax(),
            selected_profile_only: Self::default_selected(),
            null_sink_name: None,
        }
    }
}
