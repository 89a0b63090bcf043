//! Instruments: how a voice graph is built and bound to a note.
//!
//! The [`Synth`](crate::Synth) calls [`Instrument::build_graph`] once per
//! voice slot when the pool is created. On every note it calls
//! [`Instrument::configure`] on an existing graph, which selects zone
//! parameters for the note without allocating, and only then sends
//! `note_on` down the graph.

mod fm;
mod oscillator;
mod sample;

pub use fm::{FmInstrument, FmPatch};
pub use oscillator::{OscillatorInstrument, OscillatorPatch, OscillatorSettings, SubtractiveGraph};
pub use sample::{SampleGraph, SampleInstrument, SampleZone};

use polyvox_core::SignalNode;

/// Builds and configures voice graphs.
pub trait Instrument: Send {
    /// Root node of one voice.
    type Graph: SignalNode;

    /// Build one voice graph. Called at pool creation only.
    fn build_graph(&self) -> Self::Graph;

    /// True if something would play for this note. Checked before a voice
    /// is taken, so an unplayable note never steals.
    fn plays(&self, _channel: u8, _note: u8, _velocity: u8) -> bool {
        true
    }

    /// Prepare `graph` for a note. Returns `false` if nothing should play,
    /// in which case the note is dropped.
    fn configure(&self, graph: &mut Self::Graph, channel: u8, note: u8, velocity: u8) -> bool;

    /// Stereo position of a configured graph, -1 to 1.
    fn pan(&self, _graph: &Self::Graph) -> f32 {
        0.0
    }

    /// Program change hook. Ignored by default.
    fn program_change(&mut self, _channel: u8, _program: u8) {}
}
