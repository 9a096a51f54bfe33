pub mod model;
pub mod snapshot;

pub use model::{
    props, Card, Endpoint, NewStream, Port, PortAvailability, Profile, PropList, Sink, Source,
    StreamInput,
};
pub use snapshot::ServerSnapshot;

/// Read-only view of the audio server's live objects.
///
/// Handles stored on nodes are resolved through this on demand, so a handle
/// whose object has gone away resolves to `None` instead of dangling.
pub trait EventSource {
    fn card(&self, index: u32) -> Option<&Card>;
    fn sink(&self, index: u32) -> Option<&Sink>;
    fn source(&self, index: u32) -> Option<&Source>;

    /// Number of live sinks attached to card `card`.
    fn sinks_on_card(&self, card: u32) -> usize;

    /// Number of live sources attached to card `card`.
    fn sources_on_card(&self, card: u32) -> usize;
}
