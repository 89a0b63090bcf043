//! FM operator matrix.
//!
//! Up to [`MAX_OPERATORS`] sine operators, each with its own DX7 envelope.
//! An [`FmAlgorithm`] says which operators modulate which and which are
//! carriers. Higher-index operators modulate lower-index ones, so
//! evaluating from the highest index down sees every modulator's current
//! sample. One operator may feed back into itself; its input is the
//! average of its previous two outputs, a one-sample-delayed
//! self-reference rather than a live cycle.
//!
//! A single [`LfoNode`] is shared by every operator. Each operator reads it
//! through `render(flag)`, so it advances once per sample no matter how
//! many operators read it.

use core::f32::consts::TAU;

use polyvox_core::{RenderCache, SignalNode, SynthTables, Waveform};

use super::dx7::{Dx7Envelope, Dx7EnvelopeParams};
use super::lfo::{LfoNode, LfoSettings};

/// Maximum number of operators in a matrix.
pub const MAX_OPERATORS: usize = 6;

/// Phase deviation of a full-scale modulator, in radians.
pub const MOD_INDEX: f32 = 4.0 * core::f32::consts::PI;

/// Static parameters of one operator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FmOperatorParams {
    /// Frequency ratio to the note frequency.
    pub ratio: f32,
    /// Fixed frequency in Hz; overrides `ratio` when set.
    pub fixed_freq: Option<f32>,
    /// Detune in cents.
    pub detune_cents: f32,
    /// Velocity sensitivity, 0 to 7.
    pub velocity_sensitivity: u8,
    /// Vibrato depth at full LFO swing, in cents.
    pub lfo_pitch_depth: f32,
    /// Envelope and output level.
    pub envelope: Dx7EnvelopeParams,
}

impl Default for FmOperatorParams {
    fn default() -> Self {
        Self {
            ratio: 1.0,
            fixed_freq: None,
            detune_cents: 0.0,
            velocity_sensitivity: 0,
            lfo_pitch_depth: 0.0,
            envelope: Dx7EnvelopeParams::default(),
        }
    }
}

/// One sine operator with its envelope.
#[derive(Debug, Clone)]
pub struct FmOperator {
    params: FmOperatorParams,
    envelope: Dx7Envelope,
    tables: Option<SynthTables>,
    sample_rate: f32,
    base_freq: f32,
    phase: f32,
    increment: f32,
    velocity_gain: f32,
    modulation: f32,
    pitch_mod: f32,
    bend: f32,
    applied_cents: f32,
    cache: RenderCache,
}

impl FmOperator {
    /// Create an operator.
    pub fn new(params: FmOperatorParams) -> Self {
        Self {
            params,
            envelope: Dx7Envelope::new(params.envelope),
            tables: None,
            sample_rate: 44100.0,
            base_freq: 440.0,
            phase: 0.0,
            increment: 0.0,
            velocity_gain: 1.0,
            modulation: 0.0,
            pitch_mod: 0.0,
            bend: 0.0,
            applied_cents: f32::NAN,
            cache: RenderCache::new(),
        }
    }

    /// Current parameters.
    pub fn params(&self) -> &FmOperatorParams {
        &self.params
    }

    /// Replace the parameters; takes effect at the next `note_on`.
    pub fn set_params(&mut self, params: FmOperatorParams) {
        self.params = params;
        self.envelope.set_params(params.envelope);
    }

    /// Pushed phase modulation in radians.
    #[inline]
    pub fn set_modulation(&mut self, radians: f32) {
        self.modulation = radians;
    }

    /// Pushed pitch modulation in cents.
    #[inline]
    pub fn set_pitch_mod(&mut self, cents: f32) {
        self.pitch_mod = cents;
    }

    /// Current frequency in Hz.
    pub fn frequency(&self) -> f32 {
        self.increment * self.sample_rate
    }

    fn update_increment(&mut self) {
        let cents = self.params.detune_cents + self.pitch_mod + self.bend;
        if cents == self.applied_cents {
            return;
        }
        self.applied_cents = cents;
        let ratio = match &self.tables {
            Some(tables) => tables.cents_to_ratio(cents),
            None => polyvox_core::cents_to_ratio(cents),
        };
        self.increment = self.base_freq * ratio / self.sample_rate;
    }
}

impl SignalNode for FmOperator {
    fn init(&mut self, tables: &SynthTables, sample_rate: f32) {
        self.envelope.init(tables, sample_rate);
        self.tables = Some(tables.clone());
        self.sample_rate = sample_rate;
        self.applied_cents = f32::NAN;
    }

    fn note_on(&mut self, note: u8, velocity: u8) {
        self.envelope.note_on(note, velocity);
        let note_freq = match &self.tables {
            Some(tables) => tables.note_to_freq(note),
            None => polyvox_core::midi_to_freq(f32::from(note)),
        };
        self.base_freq = self
            .params
            .fixed_freq
            .unwrap_or(note_freq * self.params.ratio);
        self.velocity_gain = match &self.tables {
            Some(tables) => {
                let sens = f32::from(self.params.velocity_sensitivity.min(7)) / 7.0;
                tables.attenuation_to_gain(tables.velocity_to_atten(velocity) * sens)
            }
            None => 1.0,
        };
        self.phase = 0.0;
        self.modulation = 0.0;
        self.pitch_mod = 0.0;
        self.applied_cents = f32::NAN;
        self.cache.reset();
        self.update_increment();
    }

    fn note_off(&mut self, velocity: u8) {
        self.envelope.note_off(velocity);
    }

    fn is_active(&self) -> bool {
        self.envelope.is_active()
    }

    fn render(&mut self, flag: bool) -> f32 {
        if let Some(sample) = self.cache.hit(flag) {
            return sample;
        }
        let level = self.envelope.render(flag);
        self.update_increment();
        let out = match &self.tables {
            Some(tables) if level > 0.0 => {
                let phase = self.phase + self.modulation / TAU;
                tables.wave(Waveform::Sine).lookup(phase) * level * self.velocity_gain
            }
            _ => 0.0,
        };
        self.phase += self.increment;
        self.phase -= libm::floorf(self.phase);
        self.cache.store(flag, out)
    }

    fn set_pitch_offset(&mut self, cents: f32) {
        self.bend = cents;
    }
}

/// Routing between operators.
///
/// `modulators[i]` is a bit mask of the operators feeding operator `i`.
/// Only bits above `i` take effect within the same sample; lower bits see
/// the previous sample's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FmAlgorithm {
    /// Per-operator modulator masks.
    pub modulators: [u8; MAX_OPERATORS],
    /// Mask of operators summed into the output.
    pub carriers: u8,
    /// Operator that feeds back into itself.
    pub feedback_op: u8,
}

const fn bits(ops: &[usize]) -> u8 {
    let mut mask = 0;
    let mut i = 0;
    while i < ops.len() {
        mask |= 1 << ops[i];
        i += 1;
    }
    mask
}

impl FmAlgorithm {
    /// The built-in algorithms.
    pub const BUILTIN: [FmAlgorithm; 8] = [
        // 0 <- 1, 2 <- 3 <- 4 <- 5
        FmAlgorithm {
            modulators: [bits(&[1]), 0, bits(&[3]), bits(&[4]), bits(&[5]), 0],
            carriers: bits(&[0, 2]),
            feedback_op: 5,
        },
        // 0 <- 1 <- 2 <- 3 <- 4 <- 5
        FmAlgorithm {
            modulators: [bits(&[1]), bits(&[2]), bits(&[3]), bits(&[4]), bits(&[5]), 0],
            carriers: bits(&[0]),
            feedback_op: 5,
        },
        // 0 <- 1 <- 2, 3 <- 4 <- 5
        FmAlgorithm {
            modulators: [bits(&[1]), bits(&[2]), 0, bits(&[4]), bits(&[5]), 0],
            carriers: bits(&[0, 3]),
            feedback_op: 5,
        },
        // 0 <- 1, 2 <- 3, 4 <- 5
        FmAlgorithm {
            modulators: [bits(&[1]), 0, bits(&[3]), 0, bits(&[5]), 0],
            carriers: bits(&[0, 2, 4]),
            feedback_op: 5,
        },
        // 0 <- (1 + 2 + 3), 4 <- 5
        FmAlgorithm {
            modulators: [bits(&[1, 2, 3]), 0, 0, 0, bits(&[5]), 0],
            carriers: bits(&[0, 4]),
            feedback_op: 5,
        },
        // 5 -> every other operator
        FmAlgorithm {
            modulators: [bits(&[5]), bits(&[5]), bits(&[5]), bits(&[5]), bits(&[5]), 0],
            carriers: bits(&[0, 1, 2, 3, 4]),
            feedback_op: 5,
        },
        // Additive
        FmAlgorithm {
            modulators: [0; MAX_OPERATORS],
            carriers: bits(&[0, 1, 2, 3, 4, 5]),
            feedback_op: 5,
        },
        // 0 <- 1 <- 2, 3 <- 4, 5
        FmAlgorithm {
            modulators: [bits(&[1]), bits(&[2]), 0, bits(&[4]), 0, 0],
            carriers: bits(&[0, 3, 5]),
            feedback_op: 2,
        },
    ];

    /// Built-in algorithm by index, clamped to the table.
    pub fn builtin(index: usize) -> Self {
        Self::BUILTIN[index.min(Self::BUILTIN.len() - 1)]
    }

    /// True if operator `op` is a carrier.
    pub fn is_carrier(&self, op: usize) -> bool {
        op < MAX_OPERATORS && self.carriers & (1 << op) != 0
    }
}

impl Default for FmAlgorithm {
    fn default() -> Self {
        Self::BUILTIN[0]
    }
}

/// Operator matrix node: operators, algorithm, feedback and a shared LFO.
#[derive(Debug, Clone)]
pub struct FmMatrix {
    operators: [FmOperator; MAX_OPERATORS],
    count: usize,
    algorithm: FmAlgorithm,
    feedback: u8,
    feedback_mem: [f32; 2],
    outputs: [f32; MAX_OPERATORS],
    lfo: LfoNode,
    carrier_gain: f32,
    cache: RenderCache,
}

impl FmMatrix {
    /// Build a matrix from up to [`MAX_OPERATORS`] operators. Extra
    /// operators are ignored; missing ones are silent.
    pub fn new(ops: &[FmOperatorParams], algorithm: FmAlgorithm, lfo: LfoSettings) -> Self {
        let count = ops.len().min(MAX_OPERATORS);
        let operators = core::array::from_fn(|i| {
            let params = ops.get(i).copied().unwrap_or_default();
            FmOperator::new(params)
        });
        let mut matrix = Self {
            operators,
            count,
            algorithm,
            feedback: 0,
            feedback_mem: [0.0; 2],
            outputs: [0.0; MAX_OPERATORS],
            lfo: LfoNode::new(lfo),
            carrier_gain: 1.0,
            cache: RenderCache::new(),
        };
        matrix.set_algorithm(algorithm);
        matrix
    }

    /// Builder: feedback amount, 0 to 7.
    pub fn with_feedback(mut self, feedback: u8) -> Self {
        self.feedback = feedback.min(7);
        self
    }

    /// Change the routing.
    pub fn set_algorithm(&mut self, algorithm: FmAlgorithm) {
        self.algorithm = algorithm;
        let live = (0..self.count)
            .filter(|&op| algorithm.is_carrier(op))
            .count()
            .max(1);
        self.carrier_gain = 1.0 / live as f32;
    }

    /// Current routing.
    pub fn algorithm(&self) -> &FmAlgorithm {
        &self.algorithm
    }

    /// Number of configured operators.
    pub fn operator_count(&self) -> usize {
        self.count
    }

    /// Operator `index`, if configured.
    pub fn operator(&self, index: usize) -> Option<&FmOperator> {
        self.operators[..self.count].get(index)
    }

    /// Operator `index` mutably, if configured.
    pub fn operator_mut(&mut self, index: usize) -> Option<&mut FmOperator> {
        self.operators[..self.count].get_mut(index)
    }

    /// The shared LFO.
    pub fn lfo_mut(&mut self) -> &mut LfoNode {
        &mut self.lfo
    }

    fn feedback_radians(&self) -> f32 {
        if self.feedback == 0 {
            return 0.0;
        }
        let scale = libm::exp2f(f32::from(self.feedback) - 7.0) * core::f32::consts::PI;
        (self.feedback_mem[0] + self.feedback_mem[1]) * 0.5 * scale
    }
}

impl SignalNode for FmMatrix {
    fn init(&mut self, tables: &SynthTables, sample_rate: f32) {
        self.lfo.init(tables, sample_rate);
        for op in &mut self.operators[..self.count] {
            op.init(tables, sample_rate);
        }
    }

    fn note_on(&mut self, note: u8, velocity: u8) {
        self.lfo.note_on(note, velocity);
        for op in &mut self.operators[..self.count] {
            op.note_on(note, velocity);
        }
        self.feedback_mem = [0.0; 2];
        self.outputs = [0.0; MAX_OPERATORS];
        self.cache.reset();
    }

    fn note_off(&mut self, velocity: u8) {
        for op in &mut self.operators[..self.count] {
            op.note_off(velocity);
        }
    }

    fn is_active(&self) -> bool {
        self.operators[..self.count]
            .iter()
            .enumerate()
            .any(|(i, op)| self.algorithm.is_carrier(i) && op.is_active())
    }

    fn render(&mut self, flag: bool) -> f32 {
        if let Some(sample) = self.cache.hit(flag) {
            return sample;
        }
        let feedback = self.feedback_radians();
        let mut sum = 0.0;
        for i in (0..self.count).rev() {
            // Shared LFO: rendered once, read by every operator
            let depth = self.operators[i].params.lfo_pitch_depth;
            if depth != 0.0 {
                let vibrato = self.lfo.render(flag) * depth;
                self.operators[i].set_pitch_mod(vibrato);
            }

            let mask = self.algorithm.modulators[i];
            let mut modulation = 0.0;
            for (j, out) in self.outputs[..self.count].iter().enumerate() {
                if mask & (1 << j) != 0 {
                    modulation += out;
                }
            }
            modulation *= MOD_INDEX;
            if usize::from(self.algorithm.feedback_op) == i {
                modulation += feedback;
            }

            let op = &mut self.operators[i];
            op.set_modulation(modulation);
            let out = op.render(flag);
            self.outputs[i] = out;

            if usize::from(self.algorithm.feedback_op) == i {
                self.feedback_mem[1] = self.feedback_mem[0];
                self.feedback_mem[0] = out;
            }
            if self.algorithm.is_carrier(i) {
                sum += out;
            }
        }
        self.cache.store(flag, sum * self.carrier_gain)
    }

    fn set_pitch_offset(&mut self, cents: f32) {
        for op in &mut self.operators[..self.count] {
            op.set_pitch_offset(cents);
        }
    }
}
