//! Amplifier and summing nodes.

use alloc::vec::Vec;

use polyvox_core::{RenderCache, SignalNode, SynthTables};

/// Applies an envelope, a static gain and velocity scaling to a source.
///
/// The voice is considered active exactly as long as the envelope is; once
/// the envelope reports `Done` the source is no longer rendered.
#[derive(Debug, Clone)]
pub struct Amplifier<S, E> {
    source: S,
    envelope: E,
    gain: f32,
    velocity_sensitivity: f32,
    velocity_gain: f32,
    gain_mod_db: f32,
    mod_gain: f32,
    tables: Option<SynthTables>,
    cache: RenderCache,
}

impl<S: SignalNode, E: SignalNode> Amplifier<S, E> {
    /// Wrap `source` with an amplitude envelope.
    pub fn new(source: S, envelope: E) -> Self {
        Self {
            source,
            envelope,
            gain: 1.0,
            velocity_sensitivity: 1.0,
            velocity_gain: 1.0,
            gain_mod_db: 0.0,
            mod_gain: 1.0,
            tables: None,
            cache: RenderCache::new(),
        }
    }

    /// Builder: static linear gain.
    pub fn with_gain(mut self, gain: f32) -> Self {
        self.gain = gain;
        self
    }

    /// Builder: velocity sensitivity, 0 (ignore velocity) to 1 (full
    /// 40·log10 curve).
    pub fn with_velocity_sensitivity(mut self, amount: f32) -> Self {
        self.velocity_sensitivity = amount.clamp(0.0, 1.0);
        self
    }

    /// Static linear gain.
    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain;
    }

    /// Pushed gain modulation in dB (tremolo).
    #[inline]
    pub fn set_gain_mod_db(&mut self, db: f32) {
        if db != self.gain_mod_db {
            self.gain_mod_db = db;
            self.mod_gain = match &self.tables {
                Some(tables) => tables.db_to_gain(db),
                None => polyvox_core::db_to_linear(db),
            };
        }
    }

    /// Velocity gain computed at the last `note_on`.
    pub fn velocity_gain(&self) -> f32 {
        self.velocity_gain
    }

    /// The wrapped source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// The wrapped source, mutably.
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// The amplitude envelope.
    pub fn envelope(&self) -> &E {
        &self.envelope
    }

    /// The amplitude envelope, mutably.
    pub fn envelope_mut(&mut self) -> &mut E {
        &mut self.envelope
    }
}

impl<S: SignalNode, E: SignalNode> SignalNode for Amplifier<S, E> {
    fn init(&mut self, tables: &SynthTables, sample_rate: f32) {
        self.source.init(tables, sample_rate);
        self.envelope.init(tables, sample_rate);
        self.tables = Some(tables.clone());
    }

    fn note_on(&mut self, note: u8, velocity: u8) {
        self.source.note_on(note, velocity);
        self.envelope.note_on(note, velocity);
        self.velocity_gain = match &self.tables {
            Some(tables) => {
                tables.attenuation_to_gain(tables.velocity_to_atten(velocity) * self.velocity_sensitivity)
            }
            None => 1.0,
        };
        self.gain_mod_db = 0.0;
        self.mod_gain = 1.0;
        self.cache.reset();
    }

    fn note_off(&mut self, velocity: u8) {
        self.source.note_off(velocity);
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
        if level == 0.0 && !self.envelope.is_active() {
            return self.cache.store(flag, 0.0);
        }
        let input = self.source.render(flag);
        let out = input * level * self.gain * self.velocity_gain * self.mod_gain;
        self.cache.store(flag, out)
    }

    fn set_pitch_offset(&mut self, cents: f32) {
        self.source.set_pitch_offset(cents);
    }
}

/// Sums owned child nodes with per-child gain.
#[derive(Debug, Clone, Default)]
pub struct MixerNode<N> {
    inputs: Vec<N>,
    gains: Vec<f32>,
    cache: RenderCache,
}

impl<N: SignalNode> MixerNode<N> {
    /// Empty mixer.
    pub fn new() -> Self {
        Self {
            inputs: Vec::new(),
            gains: Vec::new(),
            cache: RenderCache::new(),
        }
    }

    /// Builder: add an input with a gain.
    pub fn with_input(mut self, node: N, gain: f32) -> Self {
        self.push(node, gain);
        self
    }

    /// Add an input with a gain. Allocates; call at graph build time only.
    pub fn push(&mut self, node: N, gain: f32) {
        self.inputs.push(node);
        self.gains.push(gain);
    }

    /// Number of inputs.
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    /// True with no inputs.
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Change the gain of input `index`. Out-of-range indices are ignored.
    pub fn set_gain(&mut self, index: usize, gain: f32) {
        if let Some(g) = self.gains.get_mut(index) {
            *g = gain;
        }
    }

    /// Inputs, mutably (for pushing modulation).
    pub fn inputs_mut(&mut self) -> &mut [N] {
        &mut self.inputs
    }
}

impl<N: SignalNode> SignalNode for MixerNode<N> {
    fn init(&mut self, tables: &SynthTables, sample_rate: f32) {
        for node in &mut self.inputs {
            node.init(tables, sample_rate);
        }
    }

    fn note_on(&mut self, note: u8, velocity: u8) {
        for node in &mut self.inputs {
            node.note_on(note, velocity);
        }
        self.cache.reset();
    }

    fn note_off(&mut self, velocity: u8) {
        for node in &mut self.inputs {
            node.note_off(velocity);
        }
    }

    fn is_active(&self) -> bool {
        self.inputs.iter().any(SignalNode::is_active)
    }

    fn render(&mut self, flag: bool) -> f32 {
        if let Some(sample) = self.cache.hit(flag) {
            return sample;
        }
        let mut sum = 0.0;
        for (node, gain) in self.inputs.iter_mut().zip(&self.gains) {
            sum += node.render(flag) * gain;
        }
        self.cache.store(flag, sum)
    }

    fn set_pitch_offset(&mut self, cents: f32) {
        for node in &mut self.inputs {
            node.set_pitch_offset(cents);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::{Envelope, EnvelopeParams, TableOscillator};
    use polyvox_core::Waveform;

    struct Dc(f32);

    impl SignalNode for Dc {
        fn init(&mut self, _tables: &SynthTables, _sample_rate: f32) {}
        fn note_on(&mut self, _note: u8, _velocity: u8) {}
        fn note_off(&mut self, _velocity: u8) {}
        fn is_active(&self) -> bool {
            true
        }
        fn render(&mut self, _flag: bool) -> f32 {
            self.0
        }
    }

    fn amp(sensitivity: f32) -> Amplifier<Dc, Envelope> {
        let tables = SynthTables::new();
        let env = Envelope::new(EnvelopeParams::adsr(0.0, 0.0, 1.0, 0.01));
        let mut amp = Amplifier::new(Dc(1.0), env).with_velocity_sensitivity(sensitivity);
        amp.init(&tables, 1000.0);
        amp
    }

    #[test]
    fn test_velocity_scaling() {
        let mut loud = amp(1.0);
        let mut soft = amp(1.0);
        loud.note_on(60, 127);
        soft.note_on(60, 64);
        assert!((loud.velocity_gain() - 1.0).abs() < 1e-3);
        // 40·log10(127/64) ≈ 11.9 dB
        let expected = polyvox_core::db_to_linear(-11.9);
        assert!(
            (soft.velocity_gain() - expected).abs() < 0.01,
            "expected {}, got {}",
            expected,
            soft.velocity_gain()
        );
    }

    #[test]
    fn test_zero_sensitivity_ignores_velocity() {
        let mut a = amp(0.0);
        a.note_on(60, 1);
        assert!((a.velocity_gain() - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_inactive_after_release() {
        let mut a = amp(0.0);
        a.note_on(60, 127);
        let mut flag = false;
        for _ in 0..10 {
            flag = !flag;
            a.render(flag);
        }
        assert!(a.is_active());
        a.note_off(0);
        for _ in 0..20 {
            flag = !flag;
            a.render(flag);
        }
        assert!(!a.is_active());
        flag = !flag;
        assert_eq!(a.render(flag), 0.0);
    }

    #[test]
    fn test_gain_mod_db() {
        let mut a = amp(0.0);
        a.note_on(60, 127);
        a.set_gain_mod_db(-6.0);
        let out = a.render(true);
        assert!((out - 0.501).abs() < 0.01, "-6 dB should halve, got {}", out);
    }

    #[test]
    fn test_mixer_sums_with_gains() {
        let tables = SynthTables::new();
        let mut mix = MixerNode::new().with_input(Dc(1.0), 0.25).with_input(Dc(2.0), 0.5);
        mix.init(&tables, 44100.0);
        mix.note_on(60, 100);
        assert!((mix.render(true) - 1.25).abs() < 1e-6);
        mix.set_gain(1, 0.0);
        assert!((mix.render(false) - 0.25).abs() < 1e-6);
        assert_eq!(mix.len(), 2);
    }

    #[test]
    fn test_mixer_forwards_pitch_offset() {
        let tables = SynthTables::new();
        let mut mix = MixerNode::new()
            .with_input(TableOscillator::new(Waveform::Sine), 0.5)
            .with_input(TableOscillator::new(Waveform::Sine).with_detune(1200.0), 0.5);
        mix.init(&tables, 44100.0);
        mix.note_on(69, 100);
        mix.set_pitch_offset(1200.0);
        mix.render(true);
        let freqs: Vec<f32> = mix.inputs_mut().iter().map(TableOscillator::frequency).collect();
        assert!((freqs[0] - 880.0).abs() < 1.0, "got {}", freqs[0]);
        assert!((freqs[1] - 1760.0).abs() < 2.0, "got {}", freqs[1]);
    }
}
