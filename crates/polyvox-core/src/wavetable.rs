//! Single-cycle wave tables with masked indexing.
//!
//! A [`WaveTable`] stores one period of a waveform. Its length must be a
//! power of two so that wrap-around is a bitwise AND instead of a modulo,
//! which keeps per-sample lookup branch-free.
//!
//! ```rust
//! use polyvox_core::{WaveTable, Waveform};
//!
//! let sine = WaveTable::for_waveform(Waveform::Sine, 1024).unwrap();
//! assert!(sine.lookup(0.25) > 0.99);
//! assert!(WaveTable::new(vec![0.0; 1000]).is_err());
//! ```

use alloc::vec::Vec;
use core::f32::consts::TAU;
use libm::{floorf, sinf};

use crate::error::TableError;

/// Number of partials summed when building the band-limited tables.
const PARTIALS: usize = 48;

/// Basic waveform shapes available as tables.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Waveform {
    /// Sine waveform, pure fundamental.
    #[default]
    Sine,
    /// Sawtooth, all harmonics at 1/n.
    Saw,
    /// Square, odd harmonics at 1/n.
    Square,
    /// Triangle, odd harmonics at 1/n² with alternating sign.
    Triangle,
}

impl Waveform {
    /// All table waveforms in a fixed order.
    pub const ALL: [Waveform; 4] = [
        Waveform::Sine,
        Waveform::Saw,
        Waveform::Square,
        Waveform::Triangle,
    ];
}

/// One cycle of a waveform, length a power of two.
#[derive(Debug, Clone)]
pub struct WaveTable {
    data: Vec<f32>,
    mask: usize,
}

impl WaveTable {
    /// Wrap raw table data.
    ///
    /// Returns [`TableError::Empty`] for an empty vector and
    /// [`TableError::NotPowerOfTwo`] when the length cannot be masked.
    pub fn new(data: Vec<f32>) -> Result<Self, TableError> {
        if data.is_empty() {
            return Err(TableError::Empty);
        }
        if !data.len().is_power_of_two() {
            return Err(TableError::NotPowerOfTwo(data.len()));
        }
        let mask = data.len() - 1;
        Ok(Self { data, mask })
    }

    /// Wrap data whose length is already known to be a power of two.
    pub(crate) fn from_power_of_two(data: Vec<f32>) -> Self {
        debug_assert!(data.len().is_power_of_two());
        let mask = data.len() - 1;
        Self { data, mask }
    }

    /// Build a table by evaluating `f` at normalized phases `i / len`.
    pub fn from_fn(len: usize, f: impl Fn(f32) -> f32) -> Result<Self, TableError> {
        let data = (0..len).map(|i| f(i as f32 / len as f32)).collect();
        Self::new(data)
    }

    /// Build an additive, band-limited table for one of the basic waveforms.
    ///
    /// Output is normalized to a peak of 1.0.
    pub fn for_waveform(waveform: Waveform, len: usize) -> Result<Self, TableError> {
        let mut table = Self::from_fn(len, |phase| waveform_sample(waveform, phase))?;
        table.normalize();
        Ok(table)
    }

    fn normalize(&mut self) {
        let peak = self.data.iter().fold(0.0_f32, |acc, s| acc.max(s.abs()));
        if peak > 0.0 {
            for sample in &mut self.data {
                *sample /= peak;
            }
        }
    }

    /// Number of entries in the table.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always false; construction rejects empty tables.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Read an entry; any index is wrapped into range.
    #[inline]
    pub fn at(&self, index: usize) -> f32 {
        self.data[index & self.mask]
    }

    /// Interpolated read at a normalized phase (1.0 = one full cycle).
    ///
    /// Phases outside `[0, 1)` wrap.
    #[inline]
    pub fn lookup(&self, phase: f32) -> f32 {
        let pos = phase * self.data.len() as f32;
        let floor = floorf(pos);
        let frac = pos - floor;
        let i = (floor as i64) as usize;
        let a = self.data[i & self.mask];
        let b = self.data[(i.wrapping_add(1)) & self.mask];
        a + (b - a) * frac
    }

    /// Raw table contents.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}

/// Evaluate the additive series for `waveform` at a normalized phase.
pub(crate) fn waveform_sample(waveform: Waveform, phase: f32) -> f32 {
    match waveform {
        Waveform::Sine => sinf(TAU * phase),
        Waveform::Saw => (1..=PARTIALS)
            .map(|n| {
                let sign = if n % 2 == 0 { -1.0 } else { 1.0 };
                let n = n as f32;
                sign * sinf(TAU * n * phase) / n
            })
            .sum(),
        Waveform::Square => (1..=PARTIALS)
            .step_by(2)
            .map(|n| {
                let n = n as f32;
                sinf(TAU * n * phase) / n
            })
            .sum(),
        Waveform::Triangle => (1..=PARTIALS)
            .step_by(2)
            .enumerate()
            .map(|(k, n)| {
                let n = n as f32;
                let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
                sign * sinf(TAU * n * phase) / (n * n)
            })
            .sum(),
    }
}

/// Build a normalized waveform table of a length known to be a power of two.
pub(crate) fn build_power_of_two(waveform: Waveform, len: usize) -> WaveTable {
    let data = (0..len)
        .map(|i| waveform_sample(waveform, i as f32 / len as f32))
        .collect();
    let mut table = WaveTable::from_power_of_two(data);
    table.normalize();
    table
}

#[cfg(test)]
mod tests {
    extern crate alloc;
    use alloc::vec;

    use super::*;

    #[test]
    fn test_rejects_non_power_of_two() {
        assert_eq!(
            WaveTable::new(vec![0.0; 1000]).unwrap_err(),
            TableError::NotPowerOfTwo(1000)
        );
        assert_eq!(WaveTable::new(Vec::new()).unwrap_err(), TableError::Empty);
        assert!(WaveTable::new(vec![0.0; 1024]).is_ok());
    }

    #[test]
    fn test_masked_index_wraps() {
        let table = WaveTable::new(vec![0.0, 1.0, 2.0, 3.0]).unwrap();
        assert_eq!(table.at(5), 1.0);
        assert_eq!(table.at(usize::MAX), 3.0);
    }

    #[test]
    fn test_lookup_interpolates_and_wraps() {
        let table = WaveTable::new(vec![0.0, 1.0, 2.0, 3.0]).unwrap();
        assert!((table.lookup(0.125) - 0.5).abs() < 1e-6);
        // Between last and first entry
        assert!((table.lookup(0.875) - 1.5).abs() < 1e-6);
        assert!((table.lookup(1.25) - table.lookup(0.25)).abs() < 1e-6);
        assert!((table.lookup(-0.75) - table.lookup(0.25)).abs() < 1e-6);
    }

    #[test]
    fn test_waveform_tables_are_normalized() {
        for waveform in Waveform::ALL {
            let table = WaveTable::for_waveform(waveform, 2048).unwrap();
            let peak = table.as_slice().iter().fold(0.0_f32, |a, s| a.max(s.abs()));
            assert!(
                (peak - 1.0).abs() < 1e-4,
                "{:?} peak should be 1.0, got {}",
                waveform,
                peak
            );
        }
    }

    #[test]
    fn test_sine_quarter_cycle() {
        let sine = WaveTable::for_waveform(Waveform::Sine, 2048).unwrap();
        assert!((sine.lookup(0.25) - 1.0).abs() < 1e-3);
        assert!(sine.lookup(0.0).abs() < 1e-3);
        assert!((sine.lookup(0.75) + 1.0).abs() < 1e-3);
    }
}
