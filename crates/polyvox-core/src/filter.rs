//! Biquad and one-pole filter sections.
//!
//! Coefficient calculation uses the RBJ Audio EQ Cookbook formulas. The
//! section runs in transposed direct form II with the feedforward
//! coefficients named `a0..a2` and the feedback coefficients `b1, b2`:
//!
//! ```text
//! out = in*a0 + z1
//! z1  = in*a1 + z2 - b1*out
//! z2  = in*a2      - b2*out
//! ```
//!
//! One-pole sections use the single-coefficient exponential form
//! `z1 = in*a0 + z1*b1` with `b1 = exp(-2π f / sr)`.

use core::f32::consts::PI;
use libm::{cosf, expf, powf, sinf, sqrtf};

use crate::math::flush_denormal;

/// Lowest Q accepted; smaller values blow up `alpha`.
pub const MIN_Q: f32 = 0.05;

/// Filter response shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterType {
    /// 12 dB/oct low-pass.
    #[default]
    LowPass,
    /// 12 dB/oct high-pass.
    HighPass,
    /// Constant 0 dB peak band-pass.
    BandPass,
    /// Band-reject.
    Notch,
    /// Peaking EQ; uses `gain_db`.
    Peak,
    /// Low shelf; uses `gain_db`.
    LowShelf,
    /// High shelf; uses `gain_db`.
    HighShelf,
    /// 6 dB/oct one-pole low-pass.
    OnePoleLowPass,
    /// 6 dB/oct one-pole high-pass.
    OnePoleHighPass,
}

impl FilterType {
    /// Whether this type runs the single-coefficient one-pole form.
    pub fn is_one_pole(self) -> bool {
        matches!(self, Self::OnePoleLowPass | Self::OnePoleHighPass)
    }
}

/// Normalized section coefficients.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoefficients {
    /// Feedforward, current input.
    pub a0: f32,
    /// Feedforward, one sample back.
    pub a1: f32,
    /// Feedforward, two samples back.
    pub a2: f32,
    /// Feedback, one sample back.
    pub b1: f32,
    /// Feedback, two samples back.
    pub b2: f32,
}

impl BiquadCoefficients {
    /// Coefficients that pass the input through unchanged.
    pub const PASSTHROUGH: Self = Self {
        a0: 1.0,
        a1: 0.0,
        a2: 0.0,
        b1: 0.0,
        b2: 0.0,
    };

    /// Compute coefficients for a filter type.
    ///
    /// # Arguments
    /// * `filter_type` - Response shape
    /// * `cutoff` - Cutoff or center frequency in Hz, clamped to (10 Hz, 0.49·sr)
    /// * `q` - Resonance, clamped to at least [`MIN_Q`]; ignored by one-pole types
    /// * `gain_db` - Boost/cut for peak and shelf types
    /// * `sample_rate` - Sample rate in Hz
    pub fn new(
        filter_type: FilterType,
        cutoff: f32,
        q: f32,
        gain_db: f32,
        sample_rate: f32,
    ) -> Self {
        let cutoff = cutoff.clamp(10.0, sample_rate * 0.49);
        let q = q.max(MIN_Q);

        let omega = 2.0 * PI * cutoff / sample_rate;
        let cos_omega = cosf(omega);
        let sin_omega = sinf(omega);
        let alpha = sin_omega / (2.0 * q);
        // sqrt(10^(dB/20))
        let a = powf(10.0, gain_db / 40.0);

        // (feedforward b0..b2, feedback a0..a2) in cookbook naming
        let (n0, n1, n2, d0, d1, d2) = match filter_type {
            FilterType::LowPass => (
                (1.0 - cos_omega) / 2.0,
                1.0 - cos_omega,
                (1.0 - cos_omega) / 2.0,
                1.0 + alpha,
                -2.0 * cos_omega,
                1.0 - alpha,
            ),
            FilterType::HighPass => (
                (1.0 + cos_omega) / 2.0,
                -(1.0 + cos_omega),
                (1.0 + cos_omega) / 2.0,
                1.0 + alpha,
                -2.0 * cos_omega,
                1.0 - alpha,
            ),
            FilterType::BandPass => (
                alpha,
                0.0,
                -alpha,
                1.0 + alpha,
                -2.0 * cos_omega,
                1.0 - alpha,
            ),
            FilterType::Notch => (
                1.0,
                -2.0 * cos_omega,
                1.0,
                1.0 + alpha,
                -2.0 * cos_omega,
                1.0 - alpha,
            ),
            FilterType::Peak => (
                1.0 + alpha * a,
                -2.0 * cos_omega,
                1.0 - alpha * a,
                1.0 + alpha / a,
                -2.0 * cos_omega,
                1.0 - alpha / a,
            ),
            FilterType::LowShelf => {
                let two_sqrt_a_alpha = 2.0 * sqrtf(a) * alpha;
                (
                    a * ((a + 1.0) - (a - 1.0) * cos_omega + two_sqrt_a_alpha),
                    2.0 * a * ((a - 1.0) - (a + 1.0) * cos_omega),
                    a * ((a + 1.0) - (a - 1.0) * cos_omega - two_sqrt_a_alpha),
                    (a + 1.0) + (a - 1.0) * cos_omega + two_sqrt_a_alpha,
                    -2.0 * ((a - 1.0) + (a + 1.0) * cos_omega),
                    (a + 1.0) + (a - 1.0) * cos_omega - two_sqrt_a_alpha,
                )
            }
            FilterType::HighShelf => {
                let two_sqrt_a_alpha = 2.0 * sqrtf(a) * alpha;
                (
                    a * ((a + 1.0) + (a - 1.0) * cos_omega + two_sqrt_a_alpha),
                    -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_omega),
                    a * ((a + 1.0) + (a - 1.0) * cos_omega - two_sqrt_a_alpha),
                    (a + 1.0) - (a - 1.0) * cos_omega + two_sqrt_a_alpha,
                    2.0 * ((a - 1.0) - (a + 1.0) * cos_omega),
                    (a + 1.0) - (a - 1.0) * cos_omega - two_sqrt_a_alpha,
                )
            }
            FilterType::OnePoleLowPass | FilterType::OnePoleHighPass => {
                return Self::one_pole(cutoff, sample_rate);
            }
        };

        let inv = 1.0 / d0;
        Self {
            a0: n0 * inv,
            a1: n1 * inv,
            a2: n2 * inv,
            b1: d1 * inv,
            b2: d2 * inv,
        }
    }
}

impl BiquadCoefficients {
    fn one_pole(cutoff: f32, sample_rate: f32) -> Self {
        let b1 = expf(-2.0 * PI * cutoff / sample_rate);
        Self {
            a0: 1.0 - b1,
            a1: 0.0,
            a2: 0.0,
            b1,
            b2: 0.0,
        }
    }
}

impl Default for BiquadCoefficients {
    fn default() -> Self {
        Self::PASSTHROUGH
    }
}

/// Filter delay registers plus the coefficients they run with.
#[derive(Debug, Clone)]
pub struct Biquad {
    filter_type: FilterType,
    coeffs: BiquadCoefficients,
    z1: f32,
    z2: f32,
}

impl Biquad {
    /// Passthrough section.
    pub fn new() -> Self {
        Self {
            filter_type: FilterType::LowPass,
            coeffs: BiquadCoefficients::PASSTHROUGH,
            z1: 0.0,
            z2: 0.0,
        }
    }

    /// Install coefficients computed for `filter_type`. State is kept so
    /// cutoff sweeps stay continuous.
    pub fn set_coefficients(&mut self, filter_type: FilterType, coeffs: BiquadCoefficients) {
        self.filter_type = filter_type;
        self.coeffs = coeffs;
    }

    /// Current coefficients.
    pub fn coefficients(&self) -> &BiquadCoefficients {
        &self.coeffs
    }

    /// Process one sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let c = &self.coeffs;
        match self.filter_type {
            FilterType::OnePoleLowPass => {
                self.z1 = flush_denormal(input * c.a0 + self.z1 * c.b1);
                self.z1
            }
            FilterType::OnePoleHighPass => {
                self.z1 = flush_denormal(input * c.a0 + self.z1 * c.b1);
                input - self.z1
            }
            _ => {
                let out = input * c.a0 + self.z1;
                self.z1 = flush_denormal(input * c.a1 + self.z2 - c.b1 * out);
                self.z2 = flush_denormal(input * c.a2 - c.b2 * out);
                out
            }
        }
    }

    /// Zero the delay registers.
    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }

    /// Delay register contents `(z1, z2)`.
    pub fn state(&self) -> (f32, f32) {
        (self.z1, self.z2)
    }
}

impl Default for Biquad {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settle(filter: &mut Biquad, input: f32, n: usize) -> f32 {
        let mut out = 0.0;
        for _ in 0..n {
            out = filter.process(input);
        }
        out
    }

    fn run(filter_type: FilterType, cutoff: f32) -> Biquad {
        let mut f = Biquad::new();
        f.set_coefficients(
            filter_type,
            BiquadCoefficients::new(filter_type, cutoff, 0.707, 0.0, 44100.0),
        );
        f
    }

    #[test]
    fn test_passthrough() {
        let mut biquad = Biquad::new();
        for i in 0..10 {
            let input = i as f32 * 0.1;
            assert!((biquad.process(input) - input).abs() < 1e-6);
        }
    }

    #[test]
    fn test_lowpass_dc_pass() {
        let mut f = run(FilterType::LowPass, 1000.0);
        let out = settle(&mut f, 1.0, 1000);
        assert!((out - 1.0).abs() < 0.01, "DC should pass, got {}", out);
    }

    #[test]
    fn test_highpass_blocks_dc() {
        let mut f = run(FilterType::HighPass, 1000.0);
        let out = settle(&mut f, 1.0, 2000);
        assert!(out.abs() < 0.01, "DC should be blocked, got {}", out);
    }

    #[test]
    fn test_one_pole_variants() {
        let mut lp = run(FilterType::OnePoleLowPass, 500.0);
        let first = lp.process(1.0);
        assert!(first > 0.0 && first < 1.0);
        assert!((settle(&mut lp, 1.0, 5000) - 1.0).abs() < 1e-3);

        let mut hp = run(FilterType::OnePoleHighPass, 500.0);
        assert!(settle(&mut hp, 1.0, 5000).abs() < 1e-3);
    }

    #[test]
    fn test_peak_with_zero_gain_is_flat() {
        let c = BiquadCoefficients::new(FilterType::Peak, 1000.0, 1.0, 0.0, 44100.0);
        assert!((c.a0 - 1.0).abs() < 1e-5);
        assert!((c.a1 - c.b1).abs() < 1e-5);
        assert!((c.a2 - c.b2).abs() < 1e-5);
    }

    #[test]
    fn test_low_shelf_dc_gain() {
        let mut f = Biquad::new();
        f.set_coefficients(
            FilterType::LowShelf,
            BiquadCoefficients::new(FilterType::LowShelf, 200.0, 0.707, 6.0, 44100.0),
        );
        let out = settle(&mut f, 1.0, 5000);
        assert!((out - 1.995).abs() < 0.02, "+6 dB shelf at DC, got {}", out);
    }

    #[test]
    fn test_reset_clears_registers() {
        let mut f = run(FilterType::LowPass, 1000.0);
        settle(&mut f, 1.0, 10);
        assert_ne!(f.state(), (0.0, 0.0));
        f.reset();
        assert_eq!(f.state(), (0.0, 0.0));
    }

    #[test]
    fn test_extreme_cutoff_is_clamped() {
        let c = BiquadCoefficients::new(FilterType::LowPass, 1e9, 0.0, 0.0, 44100.0);
        assert!(c.a0.is_finite() && c.b1.is_finite() && c.b2.is_finite());
    }
}
