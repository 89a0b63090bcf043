//! Mathematical utility functions for synthesis.
//!
//! Provides the unit conversions used throughout the engine. All functions
//! are allocation-free and suitable for `no_std`.
//!
//! # Level Conversions
//!
//! - [`db_to_linear`] / [`linear_to_db`] - Convert between dB and linear gain
//! - [`centibels_to_db`] - SoundFont attenuation units to dB
//!
//! # Pitch and Time
//!
//! - [`midi_to_freq`] / [`freq_to_midi`] - Equal temperament, A4 = 440 Hz
//! - [`cents_to_ratio`] - Pitch offset to frequency ratio
//! - [`timecents_to_seconds`] - SoundFont envelope time units
//!
//! # Utilities
//!
//! - [`lerp`] - Linear interpolation
//! - [`pan_gains`] - Constant-power stereo pan law
//! - [`soft_clip`] - Output stage saturation

use libm::{expf, exp2f, log2f, logf, sincosf, tanhf};

/// Lowest dB value treated as audible; anything below is silence.
pub const SILENCE_DB: f32 = -144.0;

/// Convert decibels to linear gain.
///
/// # Arguments
/// * `db` - Value in decibels
///
/// # Returns
/// Linear gain value (e.g., 0 dB → 1.0, -6 dB → 0.5, +6 dB → 2.0)
///
/// # Example
/// ```rust
/// use polyvox_core::db_to_linear;
///
/// assert!((db_to_linear(0.0) - 1.0).abs() < 0.001);
/// assert!((db_to_linear(-6.02) - 0.5).abs() < 0.01);
/// ```
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    // 10^(dB/20) = e^(dB * ln(10)/20)
    const FACTOR: f32 = core::f32::consts::LN_10 / 20.0;
    expf(db * FACTOR)
}

/// Convert linear gain to decibels.
///
/// Non-positive input maps to [`SILENCE_DB`] instead of `-inf`.
///
/// # Example
/// ```rust
/// use polyvox_core::linear_to_db;
///
/// assert!((linear_to_db(1.0) - 0.0).abs() < 0.001);
/// assert!((linear_to_db(0.5) - (-6.02)).abs() < 0.01);
/// ```
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    // 20 * log10(linear) = 20 * ln(linear) / ln(10)
    const FACTOR: f32 = 20.0 / core::f32::consts::LN_10;
    (logf(linear.max(1e-10)) * FACTOR).max(SILENCE_DB)
}

/// Convert SoundFont centibels of attenuation to dB of gain.
///
/// 10 centibels = 1 dB. The result is negative (attenuation) for
/// positive input.
#[inline]
pub fn centibels_to_db(centibels: f32) -> f32 {
    -centibels / 10.0
}

/// Convert MIDI note number to frequency in Hz.
///
/// Uses standard tuning: A4 (note 69) = 440 Hz.
#[inline]
pub fn midi_to_freq(note: f32) -> f32 {
    440.0 * exp2f((note - 69.0) / 12.0)
}

/// Convert frequency in Hz to a (fractional) MIDI note number.
#[inline]
pub fn freq_to_midi(freq: f32) -> f32 {
    69.0 + 12.0 * log2f(freq.max(1e-3) / 440.0)
}

/// Convert cents to frequency ratio.
///
/// 100 cents = 1 semitone, 1200 cents = 1 octave.
///
/// For per-sample use prefer [`SynthTables::cents_to_ratio`](crate::SynthTables::cents_to_ratio),
/// which avoids the transcendental call.
#[inline]
pub fn cents_to_ratio(cents: f32) -> f32 {
    exp2f(cents / 1200.0)
}

/// Convert SoundFont timecents to seconds.
///
/// `seconds = 2^(timecents / 1200)`. The conventional "instant" value of
/// -12000 timecents (≈ 1 ms) and below maps to zero.
#[inline]
pub fn timecents_to_seconds(timecents: f32) -> f32 {
    if timecents <= -12000.0 {
        0.0
    } else {
        exp2f(timecents / 1200.0)
    }
}

/// Linear interpolation between two values.
///
/// # Arguments
/// * `a` - Start value (at t=0)
/// * `b` - End value (at t=1)
/// * `t` - Interpolation factor (0.0 to 1.0)
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Convert seconds to a whole number of samples (at least zero).
#[inline]
pub fn seconds_to_samples(seconds: f32, sample_rate: f32) -> u32 {
    (seconds.max(0.0) * sample_rate + 0.5) as u32
}

/// Constant-power pan law.
///
/// `pan` ranges from -1.0 (hard left) to 1.0 (hard right); out-of-range
/// values are clamped. Returns `(left_gain, right_gain)` with
/// `left² + right² = 1`.
///
/// # Example
/// ```rust
/// use polyvox_core::pan_gains;
///
/// let (l, r) = pan_gains(0.0);
/// assert!((l - r).abs() < 1e-6);
/// assert!((l * l + r * r - 1.0).abs() < 1e-5);
/// ```
#[inline]
pub fn pan_gains(pan: f32) -> (f32, f32) {
    // angle = (pan + 1) * pi/4 maps [-1,1] to [0, pi/2]
    let angle = (pan.clamp(-1.0, 1.0) + 1.0) * core::f32::consts::FRAC_PI_4;
    let (sin_a, cos_a) = sincosf(angle);
    (cos_a, sin_a)
}

/// Soft clip using hyperbolic tangent.
///
/// Smooth saturation that approaches ±1 asymptotically. Used on the final
/// mix so summed voices never wrap when written as integers.
#[inline]
pub fn soft_clip(x: f32) -> f32 {
    tanhf(x)
}

/// Flush subnormal (denormalized) floats to zero.
///
/// Subnormal floats cause severe CPU slowdowns on most architectures.
/// Values below 1e-20 are replaced with zero. Used in filter feedback
/// registers where the signal decays indefinitely toward zero.
#[allow(clippy::inline_always)]
#[inline(always)]
pub fn flush_denormal(x: f32) -> f32 {
    if x.abs() < 1e-20 { 0.0 } else { x }
}
