use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Generation counter written at card (re)enumeration time.
pub type Stamp = u64;

/// Registry-assigned identity of a node. Stable for the node's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Identity carried by transient nodes that never enter the registry.
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }

    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Input,
    Output,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Output => "output",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Implement {
    Device,
    Stream,
}

impl Implement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Device => "device",
            Self::Stream => "stream",
        }
    }
}

impl fmt::Display for Implement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Semantic class of a node.
///
/// Application classes occupy ids `1..=4` and are the only values accepted
/// when a routing class id is read back from a stream's properties. Device
/// classes start at 128.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    #[default]
    Unknown,

    Player,
    Game,
    Browser,
    Event,

    Null,
    Speakers,
    FrontSpeakers,
    RearSpeakers,
    Microphone,
    Jack,
    Spdif,
    Hdmi,
    WiredHeadset,
    WiredHeadphone,
    UsbHeadset,
    UsbHeadphone,
    BluetoothSco,
    BluetoothA2dp,
    Phone,
}

const APPLICATION_CLASSES: [NodeType; 4] = [
    NodeType::Player,
    NodeType::Game,
    NodeType::Browser,
    NodeType::Event,
];

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Player => "player",
            Self::Game => "game",
            Self::Browser => "browser",
            Self::Event => "event",
            Self::Null => "null",
            Self::Speakers => "speakers",
            Self::FrontSpeakers => "front_speakers",
            Self::RearSpeakers => "rear_speakers",
            Self::Microphone => "microphone",
            Self::Jack => "jack",
            Self::Spdif => "spdif",
            Self::Hdmi => "hdmi",
            Self::WiredHeadset => "wired_headset",
            Self::WiredHeadphone => "wired_headphone",
            Self::UsbHeadset => "usb_headset",
            Self::UsbHeadphone => "usb_headphone",
            Self::BluetoothSco => "bluetooth_sco",
            Self::BluetoothA2dp => "bluetooth_a2dp",
            Self::Phone => "phone",
        }
    }

    /// Canonical display label, `None` for `Unknown`.
    pub fn label(&self) -> Option<&'static str> {
        let label = match self {
            Self::Unknown => return None,
            Self::Player => "Player",
            Self::Game => "Game",
            Self::Browser => "Browser",
            Self::Event => "Event",
            Self::Null => "Silent",
            Self::Speakers => "Speakers",
            Self::FrontSpeakers => "Front Speakers",
            Self::RearSpeakers => "Rear Speakers",
            Self::Microphone => "Microphone",
            Self::Jack => "Line",
            Self::Spdif => "SPDIF",
            Self::Hdmi => "HDMI",
            Self::WiredHeadset => "Wired Headset",
            Self::WiredHeadphone => "Wired Headphone",
            Self::UsbHeadset => "USB Headset",
            Self::UsbHeadphone => "USB Headphone",
            Self::BluetoothSco => "Bluetooth Handsfree",
            Self::BluetoothA2dp => "Bluetooth Stereo Headphone",
            Self::Phone => "Phone",
        };
        Some(label)
    }

    /// Numeric class id written to `routing.class.id`.
    pub fn class_id(&self) -> u32 {
        match self {
            Self::Unknown => 0,
            Self::Player => 1,
            Self::Game => 2,
            Self::Browser => 3,
            Self::Event => 4,
            Self::Null => 128,
            Self::Speakers => 129,
            Self::FrontSpeakers => 130,
            Self::RearSpeakers => 131,
            Self::Microphone => 132,
            Self::Jack => 133,
            Self::Spdif => 134,
            Self::Hdmi => 135,
            Self::WiredHeadset => 136,
            Self::WiredHeadphone => 137,
            Self::UsbHeadset => 138,
            Self::UsbHeadphone => 139,
            Self::BluetoothSco => 140,
            Self::BluetoothA2dp => 141,
            Self::Phone => 142,
        }
    }

    /// Resolve an application class id. Device and unknown ids yield `None`.
    pub fn from_application_class_id(id: u32) -> Option<Self> {
        APPLICATION_CLASSES.iter().copied().find(|t| t.class_id() == id)
    }

    pub fn is_application(&self) -> bool {
        APPLICATION_CLASSES.contains(self)
    }

    pub fn is_bluetooth(&self) -> bool {
        matches!(self, Self::BluetoothSco | Self::BluetoothA2dp)
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for NodeType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unknown" => Ok(Self::Unknown),
            "player" => Ok(Self::Player),
            "game" => Ok(Self::Game),
            "browser" => Ok(Self::Browser),
            "event" => Ok(Self::Event),
            "null" => Ok(Self::Null),
            "speakers" => Ok(Self::Speakers),
            "front_speakers" => Ok(Self::FrontSpeakers),
            "rear_speakers" => Ok(Self::RearSpeakers),
            "microphone" => Ok(Self::Microphone),
            "jack" => Ok(Self::Jack),
            "spdif" => Ok(Self::Spdif),
            "hdmi" => Ok(Self::Hdmi),
            "wired_headset" => Ok(Self::WiredHeadset),
            "wired_headphone" => Ok(Self::WiredHeadphone),
            "usb_headset" => Ok(Self::UsbHeadset),
            "usb_headphone" => Ok(Self::UsbHeadphone),
            "bluetooth_sco" => Ok(Self::BluetoothSco),
            "bluetooth_a2dp" => Ok(Self::BluetoothA2dp),
            "phone" => Ok(Self::Phone),
            _ => Err(format!("Unknown node type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    #[default]
    Unknown,
    Internal,
    External,
}

impl Location {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Internal => "internal",
            Self::External => "external",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Privacy {
    #[default]
    Unknown,
    Public,
    Private,
}

impl Privacy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Public => "public",
            Self::Private => "private",
        }
    }
}

/// Which server-side object table a handle indexes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleKind {
    Sink,
    Source,
    StreamInput,
}

/// Typed reference to a live server object, resolved on demand through the
/// event source. A node with no live backing object holds `None` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Handle {
    pub kind: HandleKind,
    pub index: u32,
}

impl Handle {
    pub fn sink(index: u32) -> Self {
        Self {
            kind: HandleKind::Sink,
            index,
        }
    }

    pub fn source(index: u32) -> Self {
        Self {
            kind: HandleKind::Source,
            index,
        }
    }

    pub fn stream_input(index: u32) -> Self {
        Self {
            kind: HandleKind::StreamInput,
            index,
        }
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            HandleKind::Sink => "sink",
            HandleKind::Source => "source",
            HandleKind::StreamInput => "stream_input",
        };
        write!(f, "{}#{}", kind, self.index)
    }
}

/// Back-reference from a device node to the card profile that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardRef {
    pub index: u32,
    pub profile: String,
}

/// Identifier handed out by the external audio manager on registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ManagerId(pub u16);

impl fmt::Display for ManagerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One audio endpoint or application stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    id: NodeId,
    key: String,
    pub direction: Direction,
    pub implement: Implement,
    pub node_type: NodeType,
    pub location: Location,
    pub privacy: Privacy,
    pub channels: u32,
    pub visible: bool,
    pub available: bool,
    pub amname: String,
    pub amdescr: String,
    pub paname: String,
    pub handle: Option<Handle>,
    pub card: Option<CardRef>,
    pub port_name: Option<String>,
    pub manager_id: Option<ManagerId>,
    pub stamp: Stamp,
}

impl Node {
    /// A visible, available node with every classification field unknown.
    pub fn new(key: impl Into<String>, direction: Direction, implement: Implement) -> Self {
        Self {
            id: NodeId::new(),
            key: key.into(),
            direction,
            implement,
            node_type: NodeType::Unknown,
            location: Location::Unknown,
            privacy: Privacy::Unknown,
            channels: 0,
            visible: true,
            available: true,
            amname: String::new(),
            amdescr: String::new(),
            paname: String::new(),
            handle: None,
            card: None,
            port_name: None,
            manager_id: None,
            stamp: 0,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Deduplication key. Fixed once the registry has stored the node.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub(crate) fn identify(&mut self, id: NodeId, key: &str) {
        self.id = id;
        self.key = key.to_string();
    }

    /// Raise the stamp to `stamp`. Never lowers it.
    pub fn touch(&mut self, stamp: Stamp) {
        if stamp > self.stamp {
            self.stamp = stamp;
        }
    }

    pub fn is_device(&self) -> bool {
        self.implement == Implement::Device
    }

    /// Whether this device node was produced from card `index`.
    pub fn belongs_to_card(&self, index: u32) -> bool {
        self.is_device() && self.card.as_ref().is_some_and(|c| c.index == index)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "   key      : '{}'", self.key)?;
        writeln!(f, "   direction: {}", self.direction)?;
        writeln!(f, "   implement: {}", self.implement)?;
        writeln!(f, "   type     : {}", self.node_type)?;
        writeln!(f, "   location : {}", self.location.as_str())?;
        writeln!(f, "   privacy  : {}", self.privacy.as_str())?;
        writeln!(f, "   channels : {}", self.channels)?;
        writeln!(f, "   visible  : {}", self.visible)?;
        writeln!(f, "   available: {}", self.available)?;
        writeln!(f, "   amname   : '{}'", self.amname)?;
        writeln!(f, "   amdescr  : '{}'", self.amdescr)?;
        writeln!(f, "   paname   : '{}'", self.paname)?;
        match self.handle {
            Some(h) => writeln!(f, "   handle   : {}", h)?,
            None => writeln!(f, "   handle   : <unset>")?,
        }
        match &self.card {
            Some(card) => writeln!(f, "   card     : {} '{}'", card.index, card.profile)?,
            None => writeln!(f, "   card     : <none>")?,
        }
        writeln!(f, "   port     : '{}'", self.port_name.as_deref().unwrap_or(""))?;
        match self.manager_id {
            Some(id) => writeln!(f, "   amid     : {}", id)?,
            None => writeln!(f, "   amid     : <unassigned>")?,
        }
        write!(f, "   stamp    : {}", self.stamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_type_round_trips_through_str() {
        for t in [NodeType::BluetoothA2dp, NodeType::WiredHeadphone, NodeType::Player] {
            assert_eq!(t.as_str().parse::<NodeType>().unwrap(), t);
        }
        assert!("warp_drive".parse::<NodeType>().is_err());
    }

    #[test]
    fn test_application_class_ids() {
        assert_eq!(NodeType::from_application_class_id(1), Some(NodeType::Player));
        assert_eq!(NodeType::from_application_class_id(4), Some(NodeType::Event));
        assert_eq!(NodeType::from_application_class_id(0), None);
        assert_eq!(
            NodeType::from_application_class_id(NodeType::Speakers.class_id()),
            None
        );
    }

    #[test]
    fn test_touch_never_lowers_stamp() {
        let mut node = Node::new("k", Direction::Output, Implement::Device);
        node.touch(5);
        node.touch(3);
        assert_eq!(node.stamp, 5);
    }

    #[test]
    fn test_belongs_to_card_requires_device() {
        let mut node = Node::new("stream_input.1", Direction::Input, Implement::Stream);
        node.card = Some(CardRef {
            index: 2,
            profile: "a2dp".to_string(),
        });
        assert!(!node.belongs_to_card(2));

        node.implement = Implement::Device;
        assert!(node.belongs_to_card(2));
        assert!(!node.belongs_to_card(3));
    }

    #[test]
    fn test_display_marks_unset_handle() {
        let node = Node::new("bluez_sink.X@a2dp", Direction::Output, Implement::Device);
        let rendered = node.to_string();
        assert!(rendered.contains("'bluez_sink.X@a2dp'"));
        assert!(rendered.contains("<unset>"));
        assert!(rendered.contains("<unassigned>"));
    }
}
