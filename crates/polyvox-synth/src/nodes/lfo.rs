//! LFO node with a start delay.

use polyvox_core::{Lfo, LfoWaveform, RenderCache, SignalNode, SynthTables, seconds_to_samples};

/// Rate, shape and start delay of a modulation LFO.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LfoSettings {
    /// Waveform.
    pub waveform: LfoWaveform,
    /// Rate in Hz.
    pub frequency: f32,
    /// Silent time after `note_on` before the LFO starts.
    pub delay: f32,
}

impl Default for LfoSettings {
    fn default() -> Self {
        Self {
            waveform: LfoWaveform::Sine,
            frequency: 5.0,
            delay: 0.0,
        }
    }
}

/// Bipolar LFO as a graph node. Output is `[-1, 1]`; consumers scale it
/// into their own unit (cents, dB).
#[derive(Debug, Clone)]
pub struct LfoNode {
    settings: LfoSettings,
    lfo: Lfo,
    sample_rate: f32,
    delay_samples: u32,
    remaining: u32,
    cache: RenderCache,
}

impl LfoNode {
    /// Create a node.
    pub fn new(settings: LfoSettings) -> Self {
        let mut lfo = Lfo::new(44100.0, settings.frequency);
        lfo.set_waveform(settings.waveform);
        Self {
            settings,
            lfo,
            sample_rate: 44100.0,
            delay_samples: 0,
            remaining: 0,
            cache: RenderCache::new(),
        }
    }

    /// Current settings.
    pub fn settings(&self) -> &LfoSettings {
        &self.settings
    }

    /// Replace settings; the delay applies from the next `note_on`.
    pub fn set_settings(&mut self, settings: LfoSettings) {
        self.settings = settings;
        self.lfo.set_frequency(settings.frequency);
        self.lfo.set_waveform(settings.waveform);
        self.delay_samples = seconds_to_samples(settings.delay, self.sample_rate);
    }
}

impl Default for LfoNode {
    fn default() -> Self {
        Self::new(LfoSettings::default())
    }
}

impl SignalNode for LfoNode {
    fn init(&mut self, _tables: &SynthTables, sample_rate: f32) {
        self.lfo.set_sample_rate(sample_rate);
        self.sample_rate = sample_rate;
        self.delay_samples = seconds_to_samples(self.settings.delay, sample_rate);
    }

    fn note_on(&mut self, _note: u8, _velocity: u8) {
        self.lfo.reset();
        self.remaining = self.delay_samples;
        self.cache.reset();
    }

    fn note_off(&mut self, _velocity: u8) {}

    fn is_active(&self) -> bool {
        true
    }

    fn render(&mut self, flag: bool) -> f32 {
        if let Some(value) = self.cache.hit(flag) {
            return value;
        }
        let value = if self.remaining > 0 {
            self.remaining -= 1;
            0.0
        } else {
            self.lfo.next()
        };
        self.cache.store(flag, value)
    }
}
