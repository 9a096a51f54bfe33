use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::Direction;

/// Property keys read from and written to server objects.
pub mod props {
    pub const DEVICE_BUS: &str = "device.bus";
    pub const DEVICE_FORM_FACTOR: &str = "device.form_factor";
    pub const DEVICE_DESCRIPTION: &str = "device.description";
    pub const ALSA_CARD_NAME: &str = "alsa.card_name";
    pub const UDEV_DISCOVERED: &str = "module-udev-detect.discovered";

    pub const MEDIA_ROLE: &str = "media.role";
    pub const MEDIA_NAME: &str = "media.name";
    pub const APPLICATION_PROCESS_BINARY: &str = "application.process.binary";

    pub const ROUTING_CLASS_NAME: &str = "routing.class.name";
    pub const ROUTING_CLASS_ID: &str = "routing.class.id";
    pub const ROUTING_METHOD: &str = "routing.method";

    pub const ROUTING_EXPLICIT: &str = "explicit";
    pub const ROUTING_DEFAULT: &str = "default";
}

/// String property map attached to cards and streams.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropList(BTreeMap<String, String>);

impl PropList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PropList {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    #[serde(default)]
    pub n_sinks: u32,
    #[serde(default)]
    pub n_sources: u32,
    #[serde(default)]
    pub max_sink_channels: u32,
    #[serde(default)]
    pub max_source_channels: u32,
}

impl Profile {
    /// A profile with neither sinks nor sources.
    pub fn is_off(&self) -> bool {
        self.n_sinks == 0 && self.n_sources == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortAvailability {
    #[default]
    Unknown,
    Yes,
    No,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_input: bool,
    #[serde(default)]
    pub is_output: bool,
    /// Profiles this port works with. Empty means every profile.
    #[serde(default)]
    pub profiles: Vec<String>,
    #[serde(default)]
    pub available: PortAvailability,
}

impl Port {
    /// Whether the port takes part in `direction` nodes of `profile`.
    pub fn serves(&self, profile: &str, direction: Direction) -> bool {
        let in_profile = self.profiles.is_empty() || self.profiles.iter().any(|p| p == profile);
        let direction_ok = match direction {
            Direction::Input => self.is_input,
            Direction::Output => self.is_output,
        };
        in_profile && direction_ok
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub index: u32,
    pub name: String,
    #[serde(default)]
    pub proplist: PropList,
    #[serde(default)]
    pub profiles: Vec<Profile>,
    #[serde(default)]
    pub active_profile: Option<String>,
    #[serde(default)]
    pub ports: Vec<Port>,
}

impl Card {
    pub fn bus(&self) -> Option<&str> {
        self.proplist.get(props::DEVICE_BUS)
    }

    pub fn form_factor(&self) -> Option<&str> {
        self.proplist.get(props::DEVICE_FORM_FACTOR)
    }

    pub fn profile(&self, name: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    pub fn active(&self) -> Option<&Profile> {
        self.active_profile.as_deref().and_then(|name| self.profile(name))
    }
}

/// A sink or source. Both carry the same attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub index: u32,
    pub name: String,
    #[serde(default)]
    pub card: Option<u32>,
    #[serde(default)]
    pub active_port: Option<String>,
    #[serde(default)]
    pub channels: u32,
}

pub type Sink = Endpoint;
pub type Source = Endpoint;

/// A playback stream that has been attached to a sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamInput {
    pub index: u32,
    pub name: String,
    #[serde(default)]
    pub proplist: PropList,
    #[serde(default)]
    pub sink: Option<u32>,
    #[serde(default)]
    pub channels: u32,
}

/// A playback stream still being set up, before it has any sink.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStream {
    #[serde(default)]
    pub proplist: PropList,
    /// Sink explicitly requested by the client, or picked by pre-routing.
    #[serde(default)]
    pub sink: Option<u32>,
    #[serde(default)]
    pub channels: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn port(profiles: &[&str], is_input: bool, is_output: bool) -> Port {
        Port {
            name: "analog-output-speaker".to_string(),
            description: Some("Speakers".to_string()),
            is_input,
            is_output,
            profiles: profiles.iter().map(|p| p.to_string()).collect(),
            available: PortAvailability::Unknown,
        }
    }

    #[test]
    fn test_port_without_profiles_serves_all() {
        let p = port(&[], false, true);
        assert!(p.serves("output:analog-stereo", Direction::Output));
        assert!(p.serves("anything", Direction::Output));
        assert!(!p.serves("anything", Direction::Input));
    }

    #[test]
    fn test_port_restricted_to_profiles() {
        let p = port(&["output:analog-stereo"], false, true);
        assert!(p.serves("output:analog-stereo", Direction::Output));
        assert!(!p.serves("output:hdmi-stereo", Direction::Output));
    }

    #[test]
    fn test_card_active_profile_lookup() {
        let card = Card {
            index: 0,
            name: "alsa_card.pci-0000_00_1b.0".to_string(),
            proplist: PropList::new().with(props::DEVICE_BUS, "pci"),
            profiles: vec![Profile {
                name: "off".to_string(),
                n_sinks: 0,
                n_sources: 0,
                max_sink_channels: 0,
                max_source_channels: 0,
            }],
            active_profile: Some("off".to_string()),
            ports: vec![],
        };
        assert_eq!(card.bus(), Some("pci"));
        assert!(card.active().is_some_and(Profile::is_off));
        assert!(card.form_factor().is_none());
    }
}
