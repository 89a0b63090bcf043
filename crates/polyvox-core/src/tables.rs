//! Precomputed lookup tables shared by every node in the engine.
//!
//! [`SynthTables`] is built once at startup and passed by reference into
//! each node's `init`. Nothing in the render path recomputes a
//! transcendental function that one of these tables already covers.
//!
//! Contents:
//! - note number → frequency for all 128 MIDI notes
//! - one octave of cents → frequency ratio at 1-cent resolution
//! - attenuation (0 to 144 dB, 0.1 dB steps) → linear gain
//! - band-limited sine, saw, square and triangle wave tables
//! - DX7 output level → attenuation and rate → slope tables

use alloc::sync::Arc;
use alloc::vec::Vec;
use libm::{exp2f, ldexpf, log10f};

use crate::error::TableError;
use crate::math::{SILENCE_DB, db_to_linear, midi_to_freq};
use crate::wavetable::{WaveTable, Waveform, build_power_of_two};

/// Default wave table length.
pub const DEFAULT_TABLE_LEN: usize = 2048;

/// Entries in the fractional-octave cents table.
const CENTS_PER_OCTAVE: usize = 1200;

/// Attenuation table resolution, in steps per dB.
const ATTEN_STEPS_PER_DB: f32 = 10.0;

/// Attenuation table span in dB.
const ATTEN_RANGE_DB: f32 = -SILENCE_DB;

/// Slope multiplier applied to the DX7 rate curve, in dB per second.
const DX7_RATE_SCALE: f32 = 0.84;

/// Low output levels on the DX7 follow a steeper curve than the
/// linear 0.75 dB-per-step region above 20.
const DX7_LOW_LEVELS: [u8; 20] = [
    0, 5, 9, 13, 17, 20, 23, 25, 27, 29, 31, 33, 35, 37, 39, 41, 42, 43, 45, 46,
];

/// Immutable lookup tables built once and shared read-only.
///
/// Cloning is cheap: the tables live behind an [`Arc`], so a node that
/// needs them during render keeps its own handle from `init`.
#[derive(Debug, Clone)]
pub struct SynthTables {
    data: Arc<TableData>,
}

#[derive(Debug)]
struct TableData {
    note_freq: [f32; 128],
    cents: Vec<f32>,
    atten: Vec<f32>,
    waves: [WaveTable; 4],
    dx7_level: [f32; 100],
    dx7_rate: [f32; 100],
}

impl SynthTables {
    /// Build the tables with the default wave table length.
    pub fn new() -> Self {
        Self::build(
            Waveform::ALL.map(|waveform| build_power_of_two(waveform, DEFAULT_TABLE_LEN)),
        )
    }

    /// Build the tables with a custom wave table length.
    ///
    /// Fails fast if `len` is not a power of two.
    pub fn with_table_len(len: usize) -> Result<Self, TableError> {
        if len == 0 {
            return Err(TableError::Empty);
        }
        if !len.is_power_of_two() {
            return Err(TableError::NotPowerOfTwo(len));
        }
        Ok(Self::build(
            Waveform::ALL.map(|waveform| build_power_of_two(waveform, len)),
        ))
    }

    fn build(waves: [WaveTable; 4]) -> Self {
        let note_freq = core::array::from_fn(|n| midi_to_freq(n as f32));

        let cents = (0..CENTS_PER_OCTAVE)
            .map(|c| exp2f(c as f32 / CENTS_PER_OCTAVE as f32))
            .collect();

        let atten_len = (ATTEN_RANGE_DB * ATTEN_STEPS_PER_DB) as usize + 1;
        let atten = (0..atten_len)
            .map(|i| db_to_linear(-(i as f32) / ATTEN_STEPS_PER_DB))
            .collect();

        let dx7_level = core::array::from_fn(|level| {
            let scaled = if level < DX7_LOW_LEVELS.len() {
                f32::from(DX7_LOW_LEVELS[level])
            } else {
                28.0 + level as f32
            };
            // 127 scaled units is full level; each unit is 0.75 dB
            (127.0 - scaled) * 0.75
        });

        let dx7_rate = core::array::from_fn(|rate| {
            let qrate = (rate * 41) >> 6;
            let mantissa = 4 + (qrate & 3);
            DX7_RATE_SCALE * mantissa as f32 * exp2f((qrate >> 2) as f32) / 4.0
        });

        #[cfg(feature = "tracing")]
        tracing::debug!(
            table_len = waves[0].len(),
            atten_entries = atten_len,
            "synth tables built"
        );

        Self {
            data: Arc::new(TableData {
                note_freq,
                cents,
                atten,
                waves,
                dx7_level,
                dx7_rate,
            }),
        }
    }

    /// Frequency in Hz of a MIDI note (A4 = 440 Hz).
    #[inline]
    pub fn note_to_freq(&self, note: u8) -> f32 {
        self.data.note_freq[usize::from(note & 0x7F)]
    }

    /// Frequency ratio for a pitch offset in cents.
    ///
    /// Splits the offset into whole octaves (applied as a power-of-two
    /// exponent) and a remainder looked up at 1-cent resolution.
    #[inline]
    pub fn cents_to_ratio(&self, cents: f32) -> f32 {
        let cents = cents.clamp(-120_000.0, 120_000.0);
        let total = cents as i32;
        let octave = total.div_euclid(CENTS_PER_OCTAVE as i32);
        let rem = total.rem_euclid(CENTS_PER_OCTAVE as i32) as usize;
        // Fractional cent is below audible resolution; linear correction
        // keeps sweeps smooth.
        let frac = cents - total as f32;
        let ratio = self.data.cents[rem] * (1.0 + frac * 0.000_577_8);
        ldexpf(ratio, octave)
    }

    /// Linear gain for an attenuation in dB (positive = quieter).
    ///
    /// Attenuation at or beyond 144 dB is silence; negative attenuation
    /// (boost) is clamped to unity.
    #[inline]
    pub fn attenuation_to_gain(&self, atten_db: f32) -> f32 {
        if atten_db >= ATTEN_RANGE_DB {
            return 0.0;
        }
        let index = (atten_db.max(0.0) * ATTEN_STEPS_PER_DB + 0.5) as usize;
        self.data.atten[index.min(self.data.atten.len() - 1)]
    }

    /// Linear gain for a signed dB value. Boosts above 0 dB fall back
    /// to the direct formula.
    #[inline]
    pub fn db_to_gain(&self, db: f32) -> f32 {
        if db > 0.0 {
            db_to_linear(db)
        } else {
            self.attenuation_to_gain(-db)
        }
    }

    /// Band-limited wave table for a waveform.
    #[inline]
    pub fn wave(&self, waveform: Waveform) -> &WaveTable {
        &self.data.waves[waveform as usize]
    }

    /// Attenuation in dB for a DX7 output level (0 to 99).
    #[inline]
    pub fn dx7_level_to_atten(&self, level: u8) -> f32 {
        self.data.dx7_level[usize::from(level.min(99))]
    }

    /// Envelope slope in dB per second for a DX7 rate (0 to 99).
    #[inline]
    pub fn dx7_rate_to_slope(&self, rate: u8) -> f32 {
        self.data.dx7_rate[usize::from(rate.min(99))]
    }

    /// Velocity attenuation in dB using the conventional concave curve
    /// `40 * log10(127 / velocity)`. Velocity 0 is silence.
    pub fn velocity_to_atten(&self, velocity: u8) -> f32 {
        if velocity == 0 {
            return ATTEN_RANGE_DB;
        }
        40.0 * log10f(127.0 / f32::from(velocity.min(127)))
    }
}

impl Default for SynthTables {
    fn default() -> Self {
        Self::new()
    }
}
