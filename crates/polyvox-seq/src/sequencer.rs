//! Multi-track sequencer driven by elapsed time.
//!
//! The sequencer keeps one cursor per track and a fractional tick position.
//! [`Sequencer::advance_time`] converts seconds to ticks at the tempo in
//! effect, stopping at every event tick on the way so that a tempo change
//! applies to the rest of the interval and not to the part before it.

use alloc::vec;
use alloc::vec::Vec;

use polyvox_core::{DEFAULT_MICROS_PER_BEAT, TempoMap, micros_per_beat_to_bpm, seconds_per_tick};
use polyvox_synth::MessageSink;

use crate::event::{EventKind, SequenceError};
use crate::track::Track;

/// Events closer than this to the end of an interval count as reached.
const TIME_EPSILON: f64 = 1e-9;

/// Plays a set of tracks into a [`MessageSink`].
#[derive(Debug, Clone)]
pub struct Sequencer {
    tracks: Vec<Track>,
    cursors: Vec<usize>,
    ticks_per_beat: u16,
    micros_per_beat: u32,
    tick: f64,
    tempo_map: TempoMap,
}

impl Sequencer {
    /// Build a sequencer over `tracks`. Track `i` is reported to sinks as
    /// track number `i`.
    pub fn new(ticks_per_beat: u16, tracks: Vec<Track>) -> Result<Self, SequenceError> {
        if ticks_per_beat == 0 {
            return Err(SequenceError::ZeroTicksPerBeat);
        }
        let tempo_map = TempoMap::from_changes(
            ticks_per_beat,
            tracks.iter().flat_map(Track::tempo_changes),
        );
        Ok(Self {
            cursors: vec![0; tracks.len()],
            tracks,
            ticks_per_beat,
            micros_per_beat: DEFAULT_MICROS_PER_BEAT,
            tick: 0.0,
            tempo_map,
        })
    }

    /// Ticks per beat.
    pub fn ticks_per_beat(&self) -> u16 {
        self.ticks_per_beat
    }

    /// The tracks being played.
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Current position in ticks.
    pub fn current_tick(&self) -> f64 {
        self.tick
    }

    /// Tempo currently in effect, in microseconds per beat.
    pub fn micros_per_beat(&self) -> u32 {
        self.micros_per_beat
    }

    /// Tempo currently in effect, in beats per minute.
    pub fn tempo_bpm(&self) -> f64 {
        micros_per_beat_to_bpm(self.micros_per_beat)
    }

    /// Every tempo change in the song, for offline tick/time queries.
    pub fn tempo_map(&self) -> &TempoMap {
        &self.tempo_map
    }

    /// Tick of the last event across all tracks.
    pub fn end_tick(&self) -> u64 {
        self.tracks.iter().map(Track::end_tick).max().unwrap_or(0)
    }

    /// Time from the start to the last event.
    pub fn duration_seconds(&self) -> f64 {
        self.tempo_map.tick_to_seconds(self.end_tick())
    }

    /// True once every track's cursor is past its last event.
    pub fn is_finished(&self) -> bool {
        self.tracks
            .iter()
            .zip(&self.cursors)
            .all(|(track, &cursor)| cursor >= track.len())
    }

    /// Rewind every track and return to the default tempo of 120 BPM.
    pub fn restart(&mut self) {
        self.cursors.fill(0);
        self.tick = 0.0;
        self.micros_per_beat = DEFAULT_MICROS_PER_BEAT;
        #[cfg(feature = "tracing")]
        tracing::debug!(tracks = self.tracks.len(), "sequencer restarted");
    }

    /// Tick of the next undispatched event.
    pub fn next_event_tick(&self) -> Option<u64> {
        self.tracks
            .iter()
            .zip(&self.cursors)
            .filter_map(|(track, &cursor)| track.events().get(cursor).map(|e| e.tick))
            .min()
    }

    /// Seconds from the current position to the next undispatched event.
    ///
    /// Tempo only changes at event ticks, so the current tempo holds for
    /// the whole interval.
    pub fn seconds_until_next_event(&self) -> Option<f64> {
        let next = self.next_event_tick()?;
        let ticks = (next as f64 - self.tick).max(0.0);
        Some(ticks * self.seconds_per_tick())
    }

    fn seconds_per_tick(&self) -> f64 {
        seconds_per_tick(self.micros_per_beat, self.ticks_per_beat)
    }

    /// Move forward by `seconds`, dispatching every event reached.
    ///
    /// Events already due at the current position are dispatched first, so
    /// `advance_time(0.0, ..)` flushes anything sitting at the cursor.
    pub fn advance_time<S: MessageSink + ?Sized>(&mut self, seconds: f64, sink: &mut S) {
        let mut remaining = if seconds.is_finite() {
            seconds.max(0.0)
        } else {
            0.0
        };
        loop {
            self.dispatch_due(sink);
            if remaining <= 0.0 {
                break;
            }
            let spt = self.seconds_per_tick();
            match self.next_event_tick() {
                Some(next) if (next as f64 - self.tick) * spt <= remaining + TIME_EPSILON => {
                    remaining = (remaining - (next as f64 - self.tick) * spt).max(0.0);
                    // Land exactly on the event tick
                    self.tick = next as f64;
                }
                _ => {
                    self.tick += remaining / spt;
                    remaining = 0.0;
                }
            }
        }
    }

    /// Dispatch every event at or before the current tick in (tick,
    /// priority) order across tracks.
    fn dispatch_due<S: MessageSink + ?Sized>(&mut self, sink: &mut S) {
        while let Some(index) = self.next_due_track() {
            let cursor = self.cursors[index];
            self.cursors[index] += 1;
            match self.tracks[index].events()[cursor].kind {
                EventKind::Channel(ref message) => sink.send(index as u16, message),
                EventKind::Tempo(micros) => {
                    self.micros_per_beat = micros.max(1);
                    #[cfg(feature = "tracing")]
                    tracing::debug!(
                        tick = self.tick,
                        micros_per_beat = micros,
                        "tempo change"
                    );
                }
                EventKind::SysEx(_) | EventKind::Meta { .. } | EventKind::EndOfTrack => {}
            }
        }
    }

    fn next_due_track(&self) -> Option<usize> {
        let mut best: Option<(usize, (u64, u8))> = None;
        for (index, (track, &cursor)) in self.tracks.iter().zip(&self.cursors).enumerate() {
            let Some(event) = track.events().get(cursor) else {
                continue;
            };
            if event.tick as f64 > self.tick {
                continue;
            }
            let key = event.sort_key();
            if best.is_none_or(|(_, k)| key < k) {
                best = Some((index, key));
            }
        }
        best.map(|(index, _)| index)
    }
}
