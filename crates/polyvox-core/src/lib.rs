//! Polyvox Core - primitives for a sample-accurate polyphonic synthesis engine
//!
//! This crate provides the building blocks every voice graph is made of,
//! designed for real-time rendering with zero allocation in the audio path.
//!
//! # Core Abstractions
//!
//! ## Signal Graph
//!
//! - [`SignalNode`] - Pull-based node contract (`init`, `note_on`, `note_off`,
//!   `is_active`, `render`)
//! - [`RenderCache`] - Per-node `(last_flag, last_sample)` memoization cell
//! - [`RenderFlag`] - Per-voice flag flipped once per sample
//!
//! ## Lookup Tables
//!
//! - [`SynthTables`] - Immutable note, cents, gain, wave and DX7 tables built
//!   once at startup and passed by reference into every node
//! - [`WaveTable`] - Power-of-two single-cycle table with masked indexing
//!
//! ## Filters
//!
//! - [`Biquad`] - Transposed direct form II section with one-pole variants
//! - [`BiquadCoefficients`] - RBJ cookbook coefficient calculation
//!
//! ## Modulation
//!
//! - [`Lfo`] - Low-frequency oscillator (6 waveforms)
//!
//! ## Timing
//!
//! - [`TempoMap`] - Piecewise-constant tempo over MIDI ticks
//!
//! ## Utilities
//!
//! - Math functions: [`db_to_linear`], [`linear_to_db`], [`midi_to_freq`],
//!   [`pan_gains`], etc.
//!
//! # no_std Support
//!
//! This crate is `no_std` compatible (it needs `alloc`). Disable the default
//! `std` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! polyvox-core = { version = "0.1", default-features = false }
//! ```
//!
//! # Example
//!
//! ```rust
//! use polyvox_core::{Biquad, BiquadCoefficients, FilterType, SynthTables, Waveform};
//!
//! let tables = SynthTables::new();
//! let saw = tables.wave(Waveform::Saw);
//!
//! let mut filter = Biquad::new();
//! filter.set_coefficients(
//!     FilterType::LowPass,
//!     BiquadCoefficients::new(FilterType::LowPass, 2000.0, 0.707, 0.0, 44100.0),
//! );
//!
//! let freq = tables.note_to_freq(57);
//! let mut phase = 0.0;
//! for _ in 0..64 {
//!     let _out = filter.process(saw.lookup(phase));
//!     phase += freq / 44100.0;
//! }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod error;
pub mod filter;
pub mod lfo;
pub mod math;
pub mod node;
pub mod tables;
pub mod tempo;
pub mod wavetable;

pub use error::{EngineError, TableError, validate_sample_rate};
pub use filter::{Biquad, BiquadCoefficients, FilterType, MIN_Q};
pub use lfo::{Lfo, LfoWaveform};
pub use math::{
    SILENCE_DB, centibels_to_db, cents_to_ratio, db_to_linear, flush_denormal, freq_to_midi,
    lerp, linear_to_db, midi_to_freq, pan_gains, seconds_to_samples, soft_clip,
    timecents_to_seconds,
};
pub use node::{RenderCache, RenderFlag, SignalNode};
pub use tables::{DEFAULT_TABLE_LEN, SynthTables};
pub use tempo::{
    DEFAULT_MICROS_PER_BEAT, TempoChange, TempoMap, bpm_to_micros_per_beat,
    micros_per_beat_to_bpm, seconds_per_tick,
};
pub use wavetable::{WaveTable, Waveform};
