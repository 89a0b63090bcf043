//! Polyvox Synth - voice graphs, instruments and the polyphonic voice pool
//!
//! This crate turns the primitives of `polyvox-core` into playable
//! instruments.
//!
//! # Core Components
//!
//! ## Nodes
//!
//! Every node implements [`SignalNode`](polyvox_core::SignalNode) and
//! memoizes its output per render flag:
//!
//! - [`TableOscillator`] - Wave table oscillator pitched from the note
//! - [`SampleGenerator`] - Sample playback with no-loop, one-shot,
//!   continuous and sustain loops
//! - [`Envelope`] - Delay/attack/hold/decay/sustain/release envelope,
//!   linear or decibel output
//! - [`Dx7Envelope`] - Four-rate, four-level operator envelope
//! - [`LfoNode`] - Delayed LFO, safe to read from many parents
//! - [`FilterNode`] - Biquad or one-pole filter with cents modulation
//! - [`Amplifier`] / [`MixerNode`] - Gain stages
//! - [`FmMatrix`] - Up to six FM operators routed by an [`FmAlgorithm`]
//!
//! ## Instruments
//!
//! An [`Instrument`] builds one graph per voice slot and binds it to notes:
//! [`OscillatorInstrument`], [`FmInstrument`] and [`SampleInstrument`]
//! (SoundFont-style zones, see [`zone`]).
//!
//! ## Voice Pool
//!
//! - [`Synth`] - Fixed pool of [`Voice`]s with stealing, sustain and
//!   16 channels of controller state
//! - [`Mixer`] - Sums several synths into one stereo output
//!
//! # no_std Support
//!
//! This crate is `no_std` compatible (it needs `alloc`). Disable the default
//! `std` feature:
//!
//! ```toml
//! [dependencies]
//! polyvox-synth = { version = "0.1", default-features = false }
//! ```
//!
//! # Example
//!
//! ```rust
//! use polyvox_core::SynthTables;
//! use polyvox_synth::{FmInstrument, Synth, StealingMode};
//!
//! let tables = SynthTables::new();
//! let mut synth = Synth::new(FmInstrument::default(), &tables, 48000.0, 16)
//!     .unwrap()
//!     .with_stealing(StealingMode::QuietestSameChannel);
//!
//! synth.note_on(0, 60, 100);
//! synth.note_on(0, 64, 100);
//!
//! let mut left = [0.0f32; 128];
//! let mut right = [0.0f32; 128];
//! synth.process(&mut left, &mut right);
//!
//! synth.note_off(0, 60, 0);
//! synth.note_off(0, 64, 0);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod channel;
pub mod instrument;
pub mod message;
pub mod mixer;
pub mod nodes;
pub mod synth;
pub mod voice;
pub mod zone;

pub use channel::{CHANNEL_COUNT, ChannelState};
pub use instrument::{
    FmInstrument, FmPatch, Instrument, OscillatorInstrument, OscillatorPatch, OscillatorSettings,
    SampleGraph, SampleInstrument, SampleZone, SubtractiveGraph,
};
pub use message::{AudioSource, ChannelMessage, MessageSink};
pub use mixer::{MIXER_CHUNK, Mixer, MixerInput};
pub use nodes::{
    Amplifier, DX7_BLOCK, Dx7Envelope, Dx7EnvelopeParams, ENVELOPE_DB_RANGE, Envelope,
    EnvelopeParams, EnvelopeStage, EnvelopeUnit, FilterNode, FilterSettings, FmAlgorithm,
    FmMatrix, FmOperator, FmOperatorParams, LfoNode, LfoSettings, LoopMode, LoopState,
    MAX_OPERATORS, MixerNode, SampleData, SampleGenerator, SampleRegion, TableOscillator,
};
pub use synth::{StealingMode, Synth};
pub use voice::Voice;
pub use zone::{Generator, GeneratorKind, GeneratorSet, SampleInfo, ZoneParams};
