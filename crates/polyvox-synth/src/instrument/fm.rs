//! FM instrument.

use alloc::vec::Vec;

use super::Instrument;
use crate::nodes::{FmAlgorithm, FmMatrix, FmOperatorParams, LfoSettings};

/// Parameters of an FM voice.
#[derive(Debug, Clone, PartialEq)]
pub struct FmPatch {
    /// Operators, at most six; operator 0 is first.
    pub operators: Vec<FmOperatorParams>,
    /// Routing.
    pub algorithm: FmAlgorithm,
    /// Self-feedback amount, 0 to 7.
    pub feedback: u8,
    /// Shared LFO.
    pub lfo: LfoSettings,
}

impl Default for FmPatch {
    fn default() -> Self {
        let modulator = FmOperatorParams {
            ratio: 2.0,
            ..FmOperatorParams::default()
        };
        Self {
            operators: alloc::vec![FmOperatorParams::default(), modulator],
            algorithm: FmAlgorithm::builtin(1),
            feedback: 0,
            lfo: LfoSettings::default(),
        }
    }
}

/// Plays every note with one FM patch.
#[derive(Debug, Clone, Default)]
pub struct FmInstrument {
    patch: FmPatch,
}

impl FmInstrument {
    /// Create an instrument.
    pub fn new(patch: FmPatch) -> Self {
        Self { patch }
    }

    /// The patch.
    pub fn patch(&self) -> &FmPatch {
        &self.patch
    }
}

impl Instrument for FmInstrument {
    type Graph = FmMatrix;

    fn build_graph(&self) -> FmMatrix {
        FmMatrix::new(&self.patch.operators, self.patch.algorithm, self.patch.lfo)
            .with_feedback(self.patch.feedback)
    }

    fn configure(&self, _graph: &mut FmMatrix, _channel: u8, _note: u8, _velocity: u8) -> bool {
        true
    }
}
