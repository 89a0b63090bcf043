//! Polyvox Seq - tick-ordered event tracks and tempo-aware playback
//!
//! Events arrive already parsed: absolute ticks with a channel message,
//! tempo change, or opaque payload. This crate orders them, converts
//! elapsed time to ticks under a changing tempo, and hands each channel
//! message to a [`MessageSink`](polyvox_synth::MessageSink) strictly before
//! the audio it affects is rendered.
//!
//! - [`Event`] / [`EventKind`] - Timed events, with decoding from raw MIDI
//!   bytes and meta payloads
//! - [`Track`] - Events sorted by tick, releases ahead of note starts
//! - [`Sequencer`] - Cursors over many tracks, driven by seconds
//! - [`Player`] - Splits render blocks at event frames
//!
//! # Example
//!
//! ```rust
//! use polyvox_core::SynthTables;
//! use polyvox_seq::{Event, Player, Sequencer, Track};
//! use polyvox_synth::{OscillatorInstrument, Synth};
//!
//! let tables = SynthTables::new();
//! let synth = Synth::new(OscillatorInstrument::default(), &tables, 44100.0, 8).unwrap();
//!
//! let track = Track::new(vec![
//!     Event::note_on(0, 0, 69, 127),
//!     Event::note_off(480, 0, 69),
//! ]);
//! let sequencer = Sequencer::new(480, vec![track]).unwrap();
//! let mut player = Player::new(sequencer, synth, 44100.0).unwrap();
//!
//! let (left, _right) = player.render_to_end(0.5);
//! assert!(left.len() >= 22050);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod event;
pub mod player;
pub mod sequencer;
pub mod track;

pub use event::{Event, EventKind, META_END_OF_TRACK, META_TEMPO, SequenceError};
pub use player::{Player, RENDER_BLOCK};
pub use sequencer::Sequencer;
pub use track::Track;
