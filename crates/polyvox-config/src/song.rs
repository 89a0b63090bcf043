//! Song file format: tracks of events and the instruments that play them.
//!
//! ```toml
//! name = "Two Notes"
//! ticks_per_beat = 480
//! tempo_bpm = 100.0
//!
//! [[tracks]]
//! events = [
//!     { type = "note", tick = 0, note = 60, duration = 480 },
//!     { type = "note", tick = 480, note = 64, velocity = 90, duration = 480 },
//! ]
//!
//! [[instruments]]
//! patch = "warm_pad"
//! channels = [0]
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use polyvox_core::{SynthTables, bpm_to_micros_per_beat};
use polyvox_seq::{Event, Player, Sequencer, Track};
use polyvox_synth::{ChannelMessage, Mixer};

use crate::engine::EngineConfig;
use crate::error::ConfigError;
use crate::factory_patches::get_factory_patch;
use crate::patch::{PatchConfig, Routing, SampleLoader};

fn default_velocity() -> u8 {
    100
}

fn default_ticks_per_beat() -> u16 {
    480
}

fn unity() -> f32 {
    1.0
}

/// One event in a track.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventConfig {
    /// A note with a length; expands to a start and a release.
    Note {
        /// Start tick.
        tick: u64,
        /// Channel, 0 to 15.
        #[serde(default)]
        channel: u8,
        /// Note number.
        note: u8,
        /// Velocity.
        #[serde(default = "default_velocity")]
        velocity: u8,
        /// Length in ticks.
        duration: u64,
    },
    /// Note start.
    NoteOn {
        /// Tick.
        tick: u64,
        /// Channel.
        #[serde(default)]
        channel: u8,
        /// Note number.
        note: u8,
        /// Velocity.
        #[serde(default = "default_velocity")]
        velocity: u8,
    },
    /// Note release.
    NoteOff {
        /// Tick.
        tick: u64,
        /// Channel.
        #[serde(default)]
        channel: u8,
        /// Note number.
        note: u8,
    },
    /// Control change.
    Controller {
        /// Tick.
        tick: u64,
        /// Channel.
        #[serde(default)]
        channel: u8,
        /// Controller number.
        controller: u8,
        /// Value.
        value: u8,
    },
    /// Pitch bend, 8192 = center.
    PitchBend {
        /// Tick.
        tick: u64,
        /// Channel.
        #[serde(default)]
        channel: u8,
        /// 14-bit value.
        value: u16,
    },
    /// Program change.
    ProgramChange {
        /// Tick.
        tick: u64,
        /// Channel.
        #[serde(default)]
        channel: u8,
        /// Program.
        program: u8,
    },
    /// Tempo change.
    Tempo {
        /// Tick.
        tick: u64,
        /// Beats per minute.
        bpm: f64,
    },
}

impl EventConfig {
    /// Tick the event starts at.
    pub fn tick(&self) -> u64 {
        match *self {
            EventConfig::Note { tick, .. }
            | EventConfig::NoteOn { tick, .. }
            | EventConfig::NoteOff { tick, .. }
            | EventConfig::Controller { tick, .. }
            | EventConfig::PitchBend { tick, .. }
            | EventConfig::ProgramChange { tick, .. }
            | EventConfig::Tempo { tick, .. } => tick,
        }
    }

    /// Channel, for events that carry one.
    pub fn channel(&self) -> Option<u8> {
        match *self {
            EventConfig::Note { channel, .. }
            | EventConfig::NoteOn { channel, .. }
            | EventConfig::NoteOff { channel, .. }
            | EventConfig::Controller { channel, .. }
            | EventConfig::PitchBend { channel, .. }
            | EventConfig::ProgramChange { channel, .. } => Some(channel),
            EventConfig::Tempo { .. } => None,
        }
    }

    /// Append the sequencer events this expands to.
    pub fn push_events(&self, out: &mut Vec<Event>) {
        match *self {
            EventConfig::Note {
                tick,
                channel,
                note,
                velocity,
                duration,
            } => {
                out.push(Event::note_on(tick, channel, note, velocity));
                out.push(Event::note_off(tick + duration, channel, note));
            }
            EventConfig::NoteOn {
                tick,
                channel,
                note,
                velocity,
            } => out.push(Event::note_on(tick, channel, note, velocity)),
            EventConfig::NoteOff {
                tick,
                channel,
                note,
            } => out.push(Event::note_off(tick, channel, note)),
            EventConfig::Controller {
                tick,
                channel,
                controller,
                value,
            } => out.push(Event::channel(
                tick,
                ChannelMessage::Controller {
                    channel,
                    controller,
                    value,
                },
            )),
            EventConfig::PitchBend {
                tick,
                channel,
                value,
            } => out.push(Event::channel(
                tick,
                ChannelMessage::PitchBend { channel, value },
            )),
            EventConfig::ProgramChange {
                tick,
                channel,
                program,
            } => out.push(Event::channel(
                tick,
                ChannelMessage::ProgramChange { channel, program },
            )),
            EventConfig::Tempo { tick, bpm } => {
                out.push(Event::tempo(tick, bpm_to_micros_per_beat(bpm)));
            }
        }
    }
}

/// One track.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrackConfig {
    /// Optional display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Events in any order.
    pub events: Vec<EventConfig>,
}

impl TrackConfig {
    /// Sequencer track.
    pub fn to_track(&self) -> Track {
        let mut events = Vec::with_capacity(self.events.len() * 2);
        for event in &self.events {
            event.push_events(&mut events);
        }
        let track = Track::new(events);
        match &self.name {
            Some(name) => track.with_name(name.clone()),
            None => track,
        }
    }
}

/// Binds a patch to the channels and tracks it plays.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstrumentConfig {
    /// Patch name: one of the song's own patches or a factory patch.
    pub patch: String,
    /// Channels played; empty means all.
    #[serde(default)]
    pub channels: Vec<u8>,
    /// Tracks played; empty means all.
    #[serde(default)]
    pub tracks: Vec<u16>,
    /// Voice count override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polyphony: Option<usize>,
    /// Linear gain in the mix.
    #[serde(default = "unity")]
    pub gain: f32,
    /// Pan in the mix, -1 to 1.
    #[serde(default)]
    pub pan: f32,
}

impl InstrumentConfig {
    /// Instrument playing `patch` on every channel and track.
    pub fn new(patch: impl Into<String>) -> Self {
        Self {
            patch: patch.into(),
            channels: Vec::new(),
            tracks: Vec::new(),
            polyphony: None,
            gain: 1.0,
            pan: 0.0,
        }
    }

    /// Channel and track masks.
    pub fn routing(&self) -> Routing {
        let channel_mask = if self.channels.is_empty() {
            u16::MAX
        } else {
            self.channels
                .iter()
                .fold(0, |mask, &ch| mask | 1 << (ch & 0x0F))
        };
        let track_mask = if self.tracks.is_empty() {
            u64::MAX
        } else {
            self.tracks
                .iter()
                .fold(0, |mask, &t| mask | 1 << u32::from(t).min(63))
        };
        Routing {
            channel_mask,
            track_mask,
        }
    }
}

/// A song: tracks, instruments, and optional song-local patches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SongConfig {
    /// Song name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Ticks per beat.
    #[serde(default = "default_ticks_per_beat")]
    pub ticks_per_beat: u16,
    /// Starting tempo; 120 BPM when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tempo_bpm: Option<f64>,
    /// Patches defined by the song, found before factory patches.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patches: Vec<PatchConfig>,
    /// Instruments.
    #[serde(default)]
    pub instruments: Vec<InstrumentConfig>,
    /// Tracks.
    #[serde(default)]
    pub tracks: Vec<TrackConfig>,
}

impl Default for SongConfig {
    fn default() -> Self {
        Self {
            name: None,
            ticks_per_beat: default_ticks_per_beat(),
            tempo_bpm: None,
            patches: Vec::new(),
            instruments: Vec::new(),
            tracks: Vec::new(),
        }
    }
}

impl SongConfig {
    /// Load a song from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml(&content)
    }

    /// Parse a song from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Save the song to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_toml()?).map_err(|e| ConfigError::write_file(path, e))
    }

    /// Convert the song to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Find a patch by name, song patches first, then factory patches.
    /// Case-insensitive.
    pub fn resolve_patch(&self, name: &str) -> Result<PatchConfig, ConfigError> {
        self.patches
            .iter()
            .find(|p| p.name().eq_ignore_ascii_case(name))
            .cloned()
            .or_else(|| get_factory_patch(name))
            .ok_or_else(|| ConfigError::PatchNotFound(name.to_string()))
    }

    /// Sequencer over the song's tracks.
    ///
    /// A starting tempo becomes a tempo event at tick 0 of the first track.
    pub fn to_sequencer(&self) -> Result<Sequencer, ConfigError> {
        let mut tracks: Vec<Track> = self.tracks.iter().map(TrackConfig::to_track).collect();
        if let Some(bpm) = self.tempo_bpm {
            let tempo = Event::tempo(0, bpm_to_micros_per_beat(bpm));
            match tracks.first_mut() {
                Some(first) => first.push(tempo),
                None => tracks.push(Track::new(vec![tempo])),
            }
        }
        Ok(Sequencer::new(self.ticks_per_beat, tracks)?)
    }

    /// Mixer holding one synth per instrument.
    pub fn build_mixer(
        &self,
        engine: &EngineConfig,
        tables: &SynthTables,
        loader: &mut SampleLoader<'_>,
    ) -> Result<Mixer, ConfigError> {
        let mut mixer = Mixer::new();
        for instrument in &self.instruments {
            let patch = self.resolve_patch(&instrument.patch)?;
            let engine = EngineConfig {
                polyphony: instrument.polyphony.unwrap_or(engine.polyphony),
                master_volume_db: 0.0,
                ..engine.clone()
            };
            let synth = patch.build_synth(tables, &engine, instrument.routing(), loader)?;
            mixer.add_input(synth, instrument.gain, instrument.pan);
        }
        mixer.set_master_volume(engine.master_volume_db);
        Ok(mixer)
    }

    /// Ready-to-render player for the whole song.
    pub fn build_player(
        &self,
        engine: &EngineConfig,
        tables: &SynthTables,
        loader: &mut SampleLoader<'_>,
    ) -> Result<Player<Mixer>, ConfigError> {
        let mixer = self.build_mixer(engine, tables, loader)?;
        Ok(Player::new(
            self.to_sequencer()?,
            mixer,
            engine.sample_rate_hz(),
        )?)
    }

    /// Total number of configured events.
    pub fn event_count(&self) -> usize {
        self.tracks.iter().map(|t| t.events.len()).sum()
    }
}
