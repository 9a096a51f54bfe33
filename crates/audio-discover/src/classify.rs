//! Classification heuristics
//!
//! Pure functions mapping raw card, port and stream attributes onto a node's
//! semantic fields. Nothing here touches the registry.

use crate::types::{Direction, Location, NodeType, Privacy};

/// Card bus types the engine knows how to expand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bus {
    Pci,
    Usb,
    Bluetooth,
}

impl Bus {
    /// Exact, case-sensitive match on the `device.bus` value.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pci" => Some(Self::Pci),
            "usb" => Some(Self::Usb),
            "bluetooth" => Some(Self::Bluetooth),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FormFactor {
    Internal,
    Speaker,
    Handset,
    Headset,
    Headphone,
    Microphone,
}

impl FormFactor {
    fn parse(value: &str) -> Option<Self> {
        let ff = match value.to_ascii_lowercase().as_str() {
            "internal" => Self::Internal,
            "speaker" | "car" => Self::Speaker,
            "handset" => Self::Handset,
            "headset" => Self::Headset,
            "headphone" => Self::Headphone,
            "microphone" => Self::Microphone,
            _ => return None,
        };
        Some(ff)
    }
}

/// Result of classifying a device node from its card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardClass {
    pub node_type: NodeType,
    pub location: Location,
    /// Display name suggested by port-name guessing (the port description).
    pub name_hint: Option<String>,
}

impl CardClass {
    fn new(node_type: NodeType, location: Location) -> Self {
        Self {
            node_type,
            location,
            name_hint: None,
        }
    }

    fn unknown() -> Self {
        Self::new(NodeType::Unknown, Location::Unknown)
    }
}

/// Classify a device node by its card's bus and form factor.
///
/// When the form factor is absent or unrecognized, the type is guessed from
/// `port_name` instead (only if a port is given). An `internal` form factor
/// guesses the same way on pci cards but always reports an external location.
pub fn classify_by_card(
    direction: Direction,
    bus: Bus,
    form_factor: Option<&str>,
    profile_name: Option<&str>,
    port_name: Option<&str>,
    port_description: Option<&str>,
) -> CardClass {
    let bluetooth_type = || {
        if profile_name == Some("a2dp") {
            NodeType::BluetoothA2dp
        } else {
            NodeType::BluetoothSco
        }
    };

    match form_factor.and_then(FormFactor::parse) {
        Some(FormFactor::Internal) => {
            // only onboard pci cards have port names worth guessing from
            let mut class = match (bus, port_name) {
                (Bus::Pci, Some(name)) => guess_by_port_name(direction, name, port_description),
                _ => CardClass::unknown(),
            };
            class.location = Location::External;
            class
        }
        Some(FormFactor::Speaker) if direction == Direction::Output => {
            CardClass::new(NodeType::Speakers, Location::Internal)
        }
        Some(FormFactor::Handset) => CardClass::new(NodeType::Phone, Location::External),
        Some(FormFactor::Headset) => {
            let node_type = match bus {
                Bus::Usb => NodeType::UsbHeadset,
                Bus::Bluetooth => bluetooth_type(),
                Bus::Pci => NodeType::WiredHeadset,
            };
            CardClass::new(node_type, Location::External)
        }
        Some(FormFactor::Headphone) if direction == Direction::Output => {
            // bluetooth headphones carry no profile hint, so stay unknown
            let node_type = match bus {
                Bus::Usb => NodeType::UsbHeadphone,
                Bus::Bluetooth => NodeType::Unknown,
                Bus::Pci => NodeType::WiredHeadphone,
            };
            CardClass::new(node_type, Location::External)
        }
        Some(FormFactor::Microphone) if direction == Direction::Input => {
            CardClass::new(NodeType::Microphone, Location::External)
        }
        Some(_) => CardClass::unknown(),
        None => port_name
            .map(|name| guess_by_port_name(direction, name, port_description))
            .unwrap_or_else(CardClass::unknown),
    }
}

/// Guess a device type from a port name. First match wins.
fn guess_by_port_name(
    direction: Direction,
    port_name: &str,
    port_description: Option<&str>,
) -> CardClass {
    let name = port_name.to_lowercase();
    let output = direction == Direction::Output;
    let input = direction == Direction::Input;

    let hinted = if output && name.contains("headphone") {
        Some(NodeType::WiredHeadphone)
    } else if name.contains("headset") {
        Some(NodeType::WiredHeadset)
    } else if name.contains("line") {
        Some(NodeType::Jack)
    } else if name.contains("spdif") {
        Some(NodeType::Spdif)
    } else if name.contains("hdmi") {
        Some(NodeType::Hdmi)
    } else if input && name.contains("microphone") {
        Some(NodeType::Microphone)
    } else {
        None
    };

    if let Some(node_type) = hinted {
        return CardClass {
            node_type,
            location: Location::Unknown,
            name_hint: port_description.map(str::to_string),
        };
    }

    if output && name.contains("analog-output") {
        CardClass::new(NodeType::Speakers, Location::Unknown)
    } else if input && name.contains("analog-input") {
        CardClass::new(NodeType::Jack, Location::Unknown)
    } else {
        CardClass::unknown()
    }
}

/// Privacy of a node. Inputs are always unknown.
pub fn derive_privacy(node_type: NodeType, direction: Direction) -> Privacy {
    if direction == Direction::Input {
        return Privacy::Unknown;
    }

    match node_type {
        NodeType::Phone
        | NodeType::WiredHeadset
        | NodeType::WiredHeadphone
        | NodeType::UsbHeadset
        | NodeType::UsbHeadphone
        | NodeType::BluetoothSco
        | NodeType::BluetoothA2dp => Privacy::Private,

        NodeType::Null | NodeType::Jack | NodeType::Spdif | NodeType::Hdmi => Privacy::Unknown,

        _ => Privacy::Public,
    }
}

/// Display name for a device node.
///
/// Preference: guessed hint, type label, port description, port name, and
/// finally the server-side name.
pub fn default_display_name(
    class: &CardClass,
    port_description: Option<&str>,
    port_name: Option<&str>,
    paname: &str,
) -> String {
    class
        .name_hint
        .as_deref()
        .or_else(|| class.node_type.label())
        .or(port_description)
        .or(port_name)
        .unwrap_or(paname)
        .to_string()
}

const ROLE_TABLE: &[(&str, NodeType)] = &[
    ("video", NodeType::Player),
    ("music", NodeType::Player),
    ("game", NodeType::Game),
    ("event", NodeType::Event),
    ("phone", NodeType::Player),
    ("animation", NodeType::Player),
    ("test", NodeType::Player),
];

const BINARY_TABLE: &[(&str, NodeType)] = &[
    ("rhythmbox", NodeType::Player),
    ("firefox", NodeType::Browser),
    ("chrome", NodeType::Browser),
    ("chromium", NodeType::Browser),
    ("sound-juicer", NodeType::Player),
];

fn lookup(table: &[(&str, NodeType)], value: Option<&str>) -> Option<NodeType> {
    let value = value?;
    table.iter().find(|(id, _)| *id == value).map(|(_, t)| *t)
}

/// Classify a stream by media role, refined by process binary.
///
/// Returns `None` when the stream is unclassified.
pub fn classify_stream(media_role: Option<&str>, process_binary: Option<&str>) -> Option<NodeType> {
    let by_role = lookup(ROLE_TABLE, media_role);

    match by_role {
        Some(NodeType::Player) | None => lookup(BINARY_TABLE, process_binary).or(by_role),
        specific => specific,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(
        direction: Direction,
        bus: Bus,
        form_factor: Option<&str>,
        profile: Option<&str>,
        port: Option<&str>,
    ) -> CardClass {
        classify_by_card(direction, bus, form_factor, profile, port, Some("Port Description"))
    }

    #[test]
    fn test_bluetooth_headset_profiles() {
        let a2dp = card(Direction::Output, Bus::Bluetooth, Some("headset"), Some("a2dp"), None);
        assert_eq!(a2dp.node_type, NodeType::BluetoothA2dp);
        assert_eq!(a2dp.location, Location::External);

        let hsp = card(Direction::Output, Bus::Bluetooth, Some("headset"), Some("hsp"), None);
        assert_eq!(hsp.node_type, NodeType::BluetoothSco);
    }

    #[test]
    fn test_headset_by_bus() {
        let usb = card(Direction::Input, Bus::Usb, Some("headset"), None, None);
        assert_eq!(usb.node_type, NodeType::UsbHeadset);

        let wired = card(Direction::Output, Bus::Pci, Some("Headset"), None, None);
        assert_eq!(wired.node_type, NodeType::WiredHeadset);
    }

    #[test]
    fn test_headphone_is_output_only() {
        let out = card(Direction::Output, Bus::Usb, Some("headphone"), None, None);
        assert_eq!(out.node_type, NodeType::UsbHeadphone);

        let inp = card(Direction::Input, Bus::Usb, Some("headphone"), None, None);
        assert_eq!(inp.node_type, NodeType::Unknown);
    }

    #[test]
    fn test_speaker_and_car() {
        for ff in ["speaker", "car"] {
            let c = card(Direction::Output, Bus::Pci, Some(ff), None, None);
            assert_eq!(c.node_type, NodeType::Speakers);
            assert_eq!(c.location, Location::Internal);
        }
        let inp = card(Direction::Input, Bus::Pci, Some("speaker"), None, None);
        assert_eq!(inp.node_type, NodeType::Unknown);
    }

    #[test]
    fn test_handset_and_microphone() {
        let phone = card(Direction::Output, Bus::Usb, Some("handset"), None, None);
        assert_eq!(phone.node_type, NodeType::Phone);

        let mic = card(Direction::Input, Bus::Usb, Some("microphone"), None, None);
        assert_eq!(mic.node_type, NodeType::Microphone);
        assert_eq!(mic.location, Location::External);
    }

    #[test]
    fn test_guess_headphone_jack_without_form_factor() {
        let c = card(Direction::Output, Bus::Pci, None, None, Some("Headphone Jack"));
        assert_eq!(c.node_type, NodeType::WiredHeadphone);
        assert_eq!(c.name_hint.as_deref(), Some("Port Description"));
    }

    #[test]
    fn test_guess_priority_order() {
        // "headphone" is output only, so an input falls through to "line"
        let c = card(Direction::Input, Bus::Pci, None, None, Some("headphone-line"));
        assert_eq!(c.node_type, NodeType::Jack);

        let c = card(Direction::Output, Bus::Pci, None, None, Some("analog-output-speaker"));
        assert_eq!(c.node_type, NodeType::Speakers);
        assert!(c.name_hint.is_none());

        let c = card(Direction::Input, Bus::Pci, None, None, Some("analog-input-mic"));
        assert_eq!(c.node_type, NodeType::Jack);

        let c = card(Direction::Output, Bus::Pci, None, None, Some("iec958-stereo-spdif"));
        assert_eq!(c.node_type, NodeType::Spdif);

        let c = card(Direction::Output, Bus::Pci, None, None, Some("mystery"));
        assert_eq!(c.node_type, NodeType::Unknown);
    }

    #[test]
    fn test_unrecognized_form_factor_guesses() {
        let c = card(Direction::Output, Bus::Usb, Some("webcam"), None, Some("hdmi-output-0"));
        assert_eq!(c.node_type, NodeType::Hdmi);
    }

    #[test]
    fn test_internal_form_factor_location() {
        let c = card(Direction::Output, Bus::Pci, Some("internal"), None, Some("analog-output-speaker"));
        assert_eq!(c.node_type, NodeType::Speakers);
        assert_eq!(c.location, Location::External);

        let c = card(Direction::Output, Bus::Pci, Some("internal"), None, Some("analog-output-headphones"));
        assert_eq!(c.node_type, NodeType::WiredHeadphone);
        assert_eq!(c.location, Location::External);
    }

    #[test]
    fn test_internal_form_factor_guesses_on_pci_only() {
        let c = card(Direction::Output, Bus::Usb, Some("internal"), None, Some("analog-output-speaker"));
        assert_eq!(c.node_type, NodeType::Unknown);
        assert_eq!(c.location, Location::External);

        let c = card(Direction::Input, Bus::Pci, Some("internal"), None, None);
        assert_eq!(c.node_type, NodeType::Unknown);
        assert_eq!(c.location, Location::External);
    }

    #[test]
    fn test_bluetooth_headphone_stays_unknown() {
        let c = card(Direction::Output, Bus::Bluetooth, Some("headphone"), Some("a2dp"), None);
        assert_eq!(c.node_type, NodeType::Unknown);
        assert_eq!(c.location, Location::External);

        let usb = card(Direction::Output, Bus::Usb, Some("headphone"), None, None);
        assert_eq!(usb.node_type, NodeType::UsbHeadphone);
    }

    #[test]
    fn test_privacy_table() {
        use NodeType::*;
        for t in [Speakers, FrontSpeakers, RearSpeakers, Unknown, Player] {
            assert_eq!(derive_privacy(t, Direction::Output), Privacy::Public);
        }
        for t in [Phone, WiredHeadset, UsbHeadphone, BluetoothSco, BluetoothA2dp] {
            assert_eq!(derive_privacy(t, Direction::Output), Privacy::Private);
        }
        for t in [Null, Jack, Spdif, Hdmi] {
            assert_eq!(derive_privacy(t, Direction::Output), Privacy::Unknown);
        }
        assert_eq!(derive_privacy(Phone, Direction::Input), Privacy::Unknown);
    }

    #[test]
    fn test_display_name_preference() {
        let hinted = card(Direction::Output, Bus::Pci, None, None, Some("headphone"));
        assert_eq!(
            default_display_name(&hinted, Some("Port Description"), Some("headphone"), "alsa_output.x"),
            "Port Description"
        );

        let typed = CardClass::new(NodeType::Speakers, Location::Internal);
        assert_eq!(default_display_name(&typed, Some("desc"), None, "p"), "Speakers");

        let unknown = CardClass::unknown();
        assert_eq!(default_display_name(&unknown, Some("desc"), Some("port"), "p"), "desc");
        assert_eq!(default_display_name(&unknown, None, Some("port"), "p"), "port");
        assert_eq!(default_display_name(&unknown, None, None, "p"), "p");
    }

    #[test]
    fn test_stream_role_and_binary() {
        assert_eq!(classify_stream(Some("music"), None), Some(NodeType::Player));
        assert_eq!(classify_stream(Some("music"), Some("mpv")), Some(NodeType::Player));
        assert_eq!(classify_stream(None, Some("firefox")), Some(NodeType::Browser));
        assert_eq!(classify_stream(None, None), None);
        assert_eq!(classify_stream(Some("bogus"), Some("bogus")), None);
    }

    #[test]
    fn test_binary_refines_player_bucket_only() {
        assert_eq!(classify_stream(Some("video"), Some("firefox")), Some(NodeType::Browser));
        assert_eq!(classify_stream(Some("game"), Some("firefox")), Some(NodeType::Game));
        assert_eq!(classify_stream(Some("event"), Some("chrome")), Some(NodeType::Event));
    }
}
