//! Table-driven oscillator node.

use polyvox_core::{RenderCache, SignalNode, SynthTables, Waveform};

/// Wave table oscillator pitched from the note number.
///
/// Frequency is `note_freq × ratio(detune + pitch_mod + bend)` where all
/// three offsets are in cents. The phase increment is only recomputed when
/// the summed offset changes.
///
/// # Example
///
/// ```rust
/// use polyvox_core::{SignalNode, SynthTables, Waveform};
/// use polyvox_synth::TableOscillator;
///
/// let tables = SynthTables::new();
/// let mut osc = TableOscillator::new(Waveform::Sine);
/// osc.init(&tables, 44100.0);
/// osc.note_on(69, 100);
///
/// let first = osc.render(true);
/// let second = osc.render(false);
/// assert_eq!(first, 0.0);
/// assert!(second > 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct TableOscillator {
    waveform: Waveform,
    detune_cents: f32,
    fixed_freq: Option<f32>,
    tables: Option<SynthTables>,
    sample_rate: f32,
    base_freq: f32,
    phase: f32,
    increment: f32,
    pitch_mod: f32,
    bend: f32,
    applied_cents: f32,
    cache: RenderCache,
}

impl TableOscillator {
    /// Create an oscillator for a waveform.
    pub fn new(waveform: Waveform) -> Self {
        Self {
            waveform,
            detune_cents: 0.0,
            fixed_freq: None,
            tables: None,
            sample_rate: 44100.0,
            base_freq: 440.0,
            phase: 0.0,
            increment: 0.0,
            pitch_mod: 0.0,
            bend: 0.0,
            applied_cents: f32::NAN,
            cache: RenderCache::new(),
        }
    }

    /// Builder: static detune in cents.
    pub fn with_detune(mut self, cents: f32) -> Self {
        self.detune_cents = cents;
        self
    }

    /// Builder: ignore the note and play a fixed frequency.
    pub fn with_fixed_frequency(mut self, freq: f32) -> Self {
        self.fixed_freq = Some(freq);
        self
    }

    /// Change the waveform.
    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }

    /// Static detune in cents.
    pub fn set_detune(&mut self, cents: f32) {
        self.detune_cents = cents;
    }

    /// Pushed pitch modulation in cents (LFO, pitch envelope), applied on
    /// the next render.
    #[inline]
    pub fn set_pitch_mod(&mut self, cents: f32) {
        self.pitch_mod = cents;
    }

    /// Current frequency in Hz, including every offset.
    pub fn frequency(&self) -> f32 {
        self.increment * self.sample_rate
    }

    fn update_increment(&mut self) {
        let cents = self.detune_cents + self.pitch_mod + self.bend;
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

impl SignalNode for TableOscillator {
    fn init(&mut self, tables: &SynthTables, sample_rate: f32) {
        self.tables = Some(tables.clone());
        self.sample_rate = sample_rate;
        self.applied_cents = f32::NAN;
    }

    fn note_on(&mut self, note: u8, _velocity: u8) {
        self.base_freq = match (self.fixed_freq, &self.tables) {
            (Some(freq), _) => freq,
            (None, Some(tables)) => tables.note_to_freq(note),
            (None, None) => polyvox_core::midi_to_freq(f32::from(note)),
        };
        self.phase = 0.0;
        self.pitch_mod = 0.0;
        self.applied_cents = f32::NAN;
        self.cache.reset();
        self.update_increment();
    }

    fn note_off(&mut self, _velocity: u8) {}

    fn is_active(&self) -> bool {
        true
    }

    fn render(&mut self, flag: bool) -> f32 {
        if let Some(sample) = self.cache.hit(flag) {
            return sample;
        }
        self.update_increment();
        let sample = match &self.tables {
            Some(tables) => tables.wave(self.waveform).lookup(self.phase),
            None => 0.0,
        };
        self.phase += self.increment;
        self.phase -= libm::floorf(self.phase);
        self.cache.store(flag, sample)
    }

    fn set_pitch_offset(&mut self, cents: f32) {
        self.bend = cents;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_rising_zero_crossings(osc: &mut TableOscillator, samples: usize) -> usize {
        let mut flag = false;
        let mut prev = 0.0;
        let mut crossings = 0;
        for _ in 0..samples {
            flag = !flag;
            let s = osc.render(flag);
            if prev < 0.0 && s >= 0.0 {
                crossings += 1;
            }
            prev = s;
        }
        crossings
    }

    #[test]
    fn test_a4_frequency() {
        let tables = SynthTables::new();
        let mut osc = TableOscillator::new(Waveform::Sine);
        osc.init(&tables, 44100.0);
        osc.note_on(69, 100);
        assert!(
            (osc.frequency() - 440.0).abs() < 0.1,
            "A4 should be 440 Hz, got {}",
            osc.frequency()
        );
        let crossings = count_rising_zero_crossings(&mut osc, 44100);
        assert!((439..=441).contains(&crossings), "got {} cycles", crossings);
    }

    #[test]
    fn test_bend_and_modulation_shift_pitch() {
        let tables = SynthTables::new();
        let mut osc = TableOscillator::new(Waveform::Saw).with_detune(1200.0);
        osc.init(&tables, 44100.0);
        osc.note_on(57, 100);
        osc.render(true);
        assert!((osc.frequency() - 440.0).abs() < 0.1);

        osc.set_pitch_offset(-1200.0);
        osc.render(false);
        assert!((osc.frequency() - 220.0).abs() < 0.1);

        osc.set_pitch_mod(100.0);
        osc.render(true);
        assert!((osc.frequency() - 233.08).abs() < 0.1);
    }

    #[test]
    fn test_fixed_frequency_ignores_note() {
        let tables = SynthTables::new();
        let mut osc = TableOscillator::new(Waveform::Sine).with_fixed_frequency(100.0);
        osc.init(&tables, 48000.0);
        osc.note_on(20, 100);
        assert!((osc.frequency() - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_same_flag_does_not_advance() {
        let tables = SynthTables::new();
        let mut osc = TableOscillator::new(Waveform::Triangle);
        osc.init(&tables, 44100.0);
        osc.note_on(60, 100);
        osc.render(true);
        let a = osc.render(false);
        let b = osc.render(false);
        assert_eq!(a.to_bits(), b.to_bits());
        assert_ne!(osc.render(true), a);
    }
}
