use serde::{Deserialize, Serialize};

use super::{Card, EventSource, Sink, Source, StreamInput};

/// In-memory copy of the server's object tables.
///
/// The replay tool keeps one current while it feeds events to the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerSnapshot {
    #[serde(default)]
    pub cards: Vec<Card>,
    #[serde(default)]
    pub sinks: Vec<Sink>,
    #[serde(default)]
    pub sources: Vec<Source>,
    #[serde(default)]
    pub stream_inputs: Vec<StreamInput>,
}

/// Replace the entry with the same index, or append.
fn put<T>(items: &mut Vec<T>, item: T, index_of: impl Fn(&T) -> u32) {
    let index = index_of(&item);
    match items.iter_mut().find(|existing| index_of(existing) == index) {
        Some(slot) => *slot = item,
        None => items.push(item),
    }
}

fn take<T>(items: &mut Vec<T>, index: u32, index_of: impl Fn(&T) -> u32) -> Option<T> {
    let pos = items.iter().position(|item| index_of(item) == index)?;
    Some(items.remove(pos))
}

impl ServerSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_card(&mut self, card: Card) {
        put(&mut self.cards, card, |c| c.index);
    }

    pub fn remove_card(&mut self, index: u32) -> Option<Card> {
        take(&mut self.cards, index, |c| c.index)
    }

    pub fn card_mut(&mut self, index: u32) -> Option<&mut Card> {
        self.cards.iter_mut().find(|c| c.index == index)
    }

    pub fn put_sink(&mut self, sink: Sink) {
        put(&mut self.sinks, sink, |s| s.index);
    }

    pub fn remove_sink(&mut self, index: u32) -> Option<Sink> {
        take(&mut self.sinks, index, |s| s.index)
    }

    pub fn put_source(&mut self, source: Source) {
        put(&mut self.sources, source, |s| s.index);
    }

    pub fn remove_source(&mut self, index: u32) -> Option<Source> {
        take(&mut self.sources, index, |s| s.index)
    }

    pub fn put_stream_input(&mut self, stream: StreamInput) {
        put(&mut self.stream_inputs, stream, |s| s.index);
    }

    pub fn remove_stream_input(&mut self, index: u32) -> Option<StreamInput> {
        take(&mut self.stream_inputs, index, |s| s.index)
    }

    pub fn stream_input(&self, index: u32) -> Option<&StreamInput> {
        self.stream_inputs.iter().find(|s| s.index == index)
    }
}

impl EventSource for ServerSnapshot {
    fn card(&self, index: u32) -> Option<&Card> {
        self.cards.iter().find(|c| c.index == index)
    }

    fn sink(&self, index: u32) -> Option<&Sink> {
        self.sinks.iter().find(|s| s.index == index)
    }

    fn source(&self, index: u32) -> Option<&Source> {
        self.sources.iter().find(|s| s.index == index)
    }

    fn sinks_on_card(&self, card: u32) -> usize {
        self.sinks.iter().filter(|s| s.card == Some(card)).count()
    }

    fn sources_on_card(&self, card: u32) -> usize {
        self.sources.iter().filter(|s| s.card == Some(card)).count()
    }
}
