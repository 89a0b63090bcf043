//! Low-frequency phase accumulator for vibrato, tremolo and filter sweeps.
//!
//! [`Lfo`] is the raw oscillator; the voice-graph node that adds a start
//! delay and depth lives in `polyvox-synth`.

use core::f32::consts::TAU;
use libm::sinf;

/// LFO waveform.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LfoWaveform {
    /// Sine.
    #[default]
    Sine,
    /// Symmetric triangle starting at 0 and rising.
    Triangle,
    /// Rising ramp.
    SawUp,
    /// Falling ramp.
    SawDown,
    /// ±1 square.
    Square,
    /// New random level each cycle.
    SampleAndHold,
}

/// Bipolar low-frequency oscillator, output in `[-1, 1]`.
///
/// # Example
///
/// ```rust
/// use polyvox_core::{Lfo, LfoWaveform};
///
/// let mut lfo = Lfo::new(1000.0, 5.0);
/// lfo.set_waveform(LfoWaveform::Triangle);
/// assert_eq!(lfo.next(), 0.0);
/// assert!(lfo.next() > 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct Lfo {
    phase: f32,
    increment: f32,
    frequency: f32,
    sample_rate: f32,
    waveform: LfoWaveform,
    held: f32,
    rng: u32,
}

impl Lfo {
    /// Create an LFO at `frequency` Hz.
    pub fn new(sample_rate: f32, frequency: f32) -> Self {
        Self {
            phase: 0.0,
            increment: frequency / sample_rate,
            frequency,
            sample_rate,
            waveform: LfoWaveform::Sine,
            held: 0.0,
            rng: 0x9E37_79B9,
        }
    }

    /// Change the rate. Phase is preserved.
    pub fn set_frequency(&mut self, frequency: f32) {
        self.frequency = frequency.max(0.0);
        self.increment = self.frequency / self.sample_rate;
    }

    /// Current rate in Hz.
    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Rebind to a new sample rate, keeping the rate in Hz.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.set_frequency(self.frequency);
    }

    /// Select the waveform.
    pub fn set_waveform(&mut self, waveform: LfoWaveform) {
        self.waveform = waveform;
    }

    /// Current waveform.
    pub fn waveform(&self) -> LfoWaveform {
        self.waveform
    }

    /// Restart the cycle at phase 0.
    pub fn reset(&mut self) {
        self.phase = 0.0;
        self.held = self.random();
    }

    /// Current phase in `[0, 1)`.
    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Next value in `[-1, 1]`.
    #[inline]
    pub fn next(&mut self) -> f32 {
        let p = self.phase;
        let out = match self.waveform {
            LfoWaveform::Sine => sinf(TAU * p),
            LfoWaveform::Triangle => {
                // 0 → 1 → -1 → 0 over one cycle
                if p < 0.25 {
                    4.0 * p
                } else if p < 0.75 {
                    2.0 - 4.0 * p
                } else {
                    4.0 * p - 4.0
                }
            }
            LfoWaveform::SawUp => 2.0 * p - 1.0,
            LfoWaveform::SawDown => 1.0 - 2.0 * p,
            LfoWaveform::Square => {
                if p < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            LfoWaveform::SampleAndHold => self.held,
        };

        self.phase += self.increment;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
            if self.waveform == LfoWaveform::SampleAndHold {
                self.held = self.random();
            }
        }
        out
    }

    /// Next value mapped to `[0, 1]`.
    #[inline]
    pub fn next_unipolar(&mut self) -> f32 {
        (self.next() + 1.0) * 0.5
    }

    fn random(&mut self) -> f32 {
        // xorshift32
        let mut x = self.rng;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.rng = x;
        (x as f32 / u32::MAX as f32) * 2.0 - 1.0
    }
}

impl Default for Lfo {
    fn default() -> Self {
        Self::new(44100.0, 1.0)
    }
}
