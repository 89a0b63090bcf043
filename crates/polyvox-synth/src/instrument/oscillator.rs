//! Subtractive instrument: oscillators into a filter into an amplifier.

use alloc::vec::Vec;

use polyvox_core::{RenderCache, SignalNode, SynthTables, Waveform};

use super::Instrument;
use crate::nodes::{
    Amplifier, Envelope, EnvelopeParams, FilterNode, FilterSettings, LfoNode, LfoSettings,
    MixerNode, TableOscillator,
};

/// One oscillator of a subtractive patch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OscillatorSettings {
    /// Waveform.
    pub waveform: Waveform,
    /// Detune in cents.
    pub detune: f32,
    /// Mix gain.
    pub gain: f32,
}

impl Default for OscillatorSettings {
    fn default() -> Self {
        Self {
            waveform: Waveform::Saw,
            detune: 0.0,
            gain: 0.5,
        }
    }
}

/// Parameters of a subtractive voice.
#[derive(Debug, Clone, PartialEq)]
pub struct OscillatorPatch {
    /// Oscillators summed before the filter.
    pub oscillators: Vec<OscillatorSettings>,
    /// Filter.
    pub filter: FilterSettings,
    /// Filter envelope.
    pub filter_envelope: EnvelopeParams,
    /// Cutoff offset at full filter envelope, in cents.
    pub filter_env_amount: f32,
    /// Amplitude envelope.
    pub amp_envelope: EnvelopeParams,
    /// Vibrato LFO.
    pub lfo: LfoSettings,
    /// Pitch swing at full LFO, in cents.
    pub vibrato_depth: f32,
    /// Cutoff swing at full LFO, in cents.
    pub filter_lfo_depth: f32,
    /// Output gain.
    pub gain: f32,
    /// Velocity sensitivity, 0 to 1.
    pub velocity_sensitivity: f32,
}

impl Default for OscillatorPatch {
    fn default() -> Self {
        Self {
            oscillators: alloc::vec![
                OscillatorSettings::default(),
                OscillatorSettings {
                    detune: 7.0,
                    ..OscillatorSettings::default()
                },
            ],
            filter: FilterSettings {
                cutoff: 2000.0,
                ..FilterSettings::default()
            },
            filter_envelope: EnvelopeParams::adsr(0.01, 0.3, 0.3, 0.3),
            filter_env_amount: 2400.0,
            amp_envelope: EnvelopeParams::adsr(0.005, 0.2, 0.7, 0.3),
            lfo: LfoSettings::default(),
            vibrato_depth: 0.0,
            filter_lfo_depth: 0.0,
            gain: 0.5,
            velocity_sensitivity: 1.0,
        }
    }
}

/// Voice graph of an [`OscillatorInstrument`].
///
/// The LFO and filter envelope render first and their values are pushed
/// into the oscillators and the filter before the audio chain renders. The
/// LFO is read twice per sample (pitch and cutoff) and computes once.
#[derive(Debug, Clone)]
pub struct SubtractiveGraph {
    lfo: LfoNode,
    vibrato_depth: f32,
    filter_lfo_depth: f32,
    filter_env: Envelope,
    filter_env_amount: f32,
    chain: Amplifier<FilterNode<MixerNode<TableOscillator>>, Envelope>,
    cache: RenderCache,
}

impl SubtractiveGraph {
    /// Build a graph from a patch.
    pub fn new(patch: &OscillatorPatch) -> Self {
        let mut mixer = MixerNode::new();
        for osc in &patch.oscillators {
            mixer.push(TableOscillator::new(osc.waveform).with_detune(osc.detune), osc.gain);
        }
        let filter = FilterNode::new(mixer, patch.filter);
        let chain = Amplifier::new(filter, Envelope::new(patch.amp_envelope))
            .with_gain(patch.gain)
            .with_velocity_sensitivity(patch.velocity_sensitivity);
        Self {
            lfo: LfoNode::new(patch.lfo),
            vibrato_depth: patch.vibrato_depth,
            filter_lfo_depth: patch.filter_lfo_depth,
            filter_env: Envelope::new(patch.filter_envelope),
            filter_env_amount: patch.filter_env_amount,
            chain,
            cache: RenderCache::new(),
        }
    }

    /// The amplifier at the end of the chain.
    pub fn amplifier(&self) -> &Amplifier<FilterNode<MixerNode<TableOscillator>>, Envelope> {
        &self.chain
    }

    /// The filter, for inspecting the effective cutoff.
    pub fn filter_mut(&mut self) -> &mut FilterNode<MixerNode<TableOscillator>> {
        self.chain.source_mut()
    }
}

impl SignalNode for SubtractiveGraph {
    fn init(&mut self, tables: &SynthTables, sample_rate: f32) {
        self.lfo.init(tables, sample_rate);
        self.filter_env.init(tables, sample_rate);
        self.chain.init(tables, sample_rate);
    }

    fn note_on(&mut self, note: u8, velocity: u8) {
        self.lfo.note_on(note, velocity);
        self.filter_env.note_on(note, velocity);
        self.chain.note_on(note, velocity);
        self.cache.reset();
    }

    fn note_off(&mut self, velocity: u8) {
        self.filter_env.note_off(velocity);
        self.chain.note_off(velocity);
    }

    fn is_active(&self) -> bool {
        self.chain.is_active()
    }

    fn render(&mut self, flag: bool) -> f32 {
        if let Some(sample) = self.cache.hit(flag) {
            return sample;
        }
        let env = self.filter_env.render(flag);
        let filter = self.chain.source_mut();
        if self.vibrato_depth != 0.0 {
            let vibrato = self.lfo.render(flag) * self.vibrato_depth;
            for osc in filter.source_mut().inputs_mut() {
                osc.set_pitch_mod(vibrato);
            }
        }
        let sweep = if self.filter_lfo_depth != 0.0 {
            self.lfo.render(flag) * self.filter_lfo_depth
        } else {
            0.0
        };
        filter.set_modulation(env * self.filter_env_amount + sweep);
        let out = self.chain.render(flag);
        self.cache.store(flag, out)
    }

    fn set_pitch_offset(&mut self, cents: f32) {
        self.chain.set_pitch_offset(cents);
    }
}

/// Plays every note on every channel with one subtractive patch.
#[derive(Debug, Clone, Default)]
pub struct OscillatorInstrument {
    patch: OscillatorPatch,
}

impl OscillatorInstrument {
    /// Create an instrument.
    pub fn new(patch: OscillatorPatch) -> Self {
        Self { patch }
    }

    /// The patch.
    pub fn patch(&self) -> &OscillatorPatch {
        &self.patch
    }
}

impl Instrument for OscillatorInstrument {
    type Graph = SubtractiveGraph;

    fn build_graph(&self) -> SubtractiveGraph {
        SubtractiveGraph::new(&self.patch)
    }

    fn configure(&self, _graph: &mut SubtractiveGraph, _channel: u8, _note: u8, _velocity: u8) -> bool {
        true
    }
}
