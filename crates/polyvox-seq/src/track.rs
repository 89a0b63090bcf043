//! Tick-ordered event lists.

use alloc::string::String;
use alloc::vec::Vec;

use crate::event::{Event, EventKind};

/// One track of events, kept sorted by tick and same-tick priority.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Track {
    name: Option<String>,
    events: Vec<Event>,
}

impl Track {
    /// Build a track from events in any order.
    ///
    /// The sort is stable, so events that share a tick and priority keep
    /// the order they were given in.
    pub fn new(mut events: Vec<Event>) -> Self {
        events.sort_by_key(Event::sort_key);
        Self { name: None, events }
    }

    /// Attach a display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Display name, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Insert an event at its sorted position, after any equal keys.
    pub fn push(&mut self, event: Event) {
        let key = event.sort_key();
        let index = self.events.partition_point(|e| e.sort_key() <= key);
        self.events.insert(index, event);
    }

    /// Events in playback order.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Number of events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True when the track holds no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Tick of the last event, 0 for an empty track.
    pub fn end_tick(&self) -> u64 {
        self.events.last().map_or(0, |e| e.tick)
    }

    /// Tempo changes as `(tick, micros_per_beat)` pairs.
    pub fn tempo_changes(&self) -> impl Iterator<Item = (u64, u32)> + '_ {
        self.events.iter().filter_map(|e| match e.kind {
            EventKind::Tempo(micros) => Some((e.tick, micros)),
            _ => None,
        })
    }

    /// Number of channel message events.
    pub fn channel_event_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e.kind, EventKind::Channel(_)))
            .count()
    }
}

impl FromIterator<Event> for Track {
    fn from_iter<T: IntoIterator<Item = Event>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_sorted_by_tick_then_priority() {
        let track = Track::new(vec![
            Event::note_on(480, 0, 62, 100),
            Event::note_on(0, 0, 60, 100),
            Event::note_off(480, 0, 60),
            Event::tempo(480, 600_000),
        ]);
        let order: Vec<(u64, u8)> = track.events().iter().map(Event::sort_key).collect();
        assert_eq!(order, [(0, 3), (480, 0), (480, 1), (480, 3)]);
        assert_eq!(track.end_tick(), 480);
        assert_eq!(track.channel_event_count(), 3);
    }

    #[test]
    fn test_push_keeps_order() {
        let mut track = Track::default().with_name("lead");
        track.push(Event::note_on(100, 0, 60, 90));
        track.push(Event::note_on(10, 0, 64, 90));
        track.push(Event::note_off(100, 0, 64));
        let ticks: Vec<u64> = track.events().iter().map(|e| e.tick).collect();
        assert_eq!(ticks, [10, 100, 100]);
        assert!(matches!(
            track.events()[1].kind,
            EventKind::Channel(polyvox_synth::ChannelMessage::NoteOff { .. })
        ));
        assert_eq!(track.name(), Some("lead"));
    }

    #[test]
    fn test_tempo_changes() {
        let track: Track = [Event::tempo(0, 400_000), Event::note_on(0, 0, 60, 1)]
            .into_iter()
            .collect();
        assert_eq!(track.tempo_changes().collect::<Vec<_>>(), [(0, 400_000)]);
        assert!(!track.is_empty());
        assert_eq!(track.len(), 2);
    }
}
