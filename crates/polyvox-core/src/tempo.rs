//! Tick ↔ time conversion under a piecewise-constant tempo.
//!
//! Tempo is expressed the way MIDI files carry it: microseconds per beat
//! (quarter note), with `ticks_per_beat` ticks per beat. A [`TempoMap`]
//! holds every tempo change in tick order; exactly one tempo is in effect
//! at any tick, and it only changes at a change point.
//!
//! ```rust
//! use polyvox_core::TempoMap;
//!
//! let mut map = TempoMap::new(480);
//! map.push_change(480, 1_000_000);
//!
//! // 120 BPM for the first beat, 60 BPM after
//! assert!((map.tick_to_seconds(480) - 0.5).abs() < 1e-9);
//! assert!((map.tick_to_seconds(960) - 1.5).abs() < 1e-9);
//! ```

use alloc::vec::Vec;

/// 500 000 µs per beat = 120 BPM.
pub const DEFAULT_MICROS_PER_BEAT: u32 = 500_000;

/// Convert microseconds per beat to beats per minute.
#[inline]
pub fn micros_per_beat_to_bpm(micros_per_beat: u32) -> f64 {
    60_000_000.0 / f64::from(micros_per_beat.max(1))
}

/// Convert beats per minute to microseconds per beat.
#[inline]
pub fn bpm_to_micros_per_beat(bpm: f64) -> u32 {
    (60_000_000.0 / bpm.max(1e-3)).round() as u32
}

/// Seconds that one tick lasts at a given tempo.
#[inline]
pub fn seconds_per_tick(micros_per_beat: u32, ticks_per_beat: u16) -> f64 {
    f64::from(micros_per_beat) / 1_000_000.0 / f64::from(ticks_per_beat.max(1))
}

/// A tempo change point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TempoChange {
    /// Tick at which the tempo takes effect.
    pub tick: u64,
    /// New tempo in microseconds per beat.
    pub micros_per_beat: u32,
}

/// Piecewise-constant tempo over ticks.
///
/// Always starts with an implicit 120 BPM segment at tick 0, which a
/// change at tick 0 replaces.
#[derive(Debug, Clone)]
pub struct TempoMap {
    ticks_per_beat: u16,
    changes: Vec<TempoChange>,
}

impl TempoMap {
    /// Empty map at the default tempo.
    pub fn new(ticks_per_beat: u16) -> Self {
        Self {
            ticks_per_beat: ticks_per_beat.max(1),
            changes: alloc::vec![TempoChange {
                tick: 0,
                micros_per_beat: DEFAULT_MICROS_PER_BEAT,
            }],
        }
    }

    /// Build a map from unordered `(tick, micros_per_beat)` pairs.
    pub fn from_changes(
        ticks_per_beat: u16,
        changes: impl IntoIterator<Item = (u64, u32)>,
    ) -> Self {
        let mut map = Self::new(ticks_per_beat);
        let mut sorted: Vec<(u64, u32)> = changes.into_iter().collect();
        sorted.sort_by_key(|&(tick, _)| tick);
        for (tick, micros) in sorted {
            map.push_change(tick, micros);
        }
        map
    }

    /// Add a change at or after the last change point.
    ///
    /// A change at the same tick as the previous one overrides it. A change
    /// earlier than the last point is placed in order.
    pub fn push_change(&mut self, tick: u64, micros_per_beat: u32) {
        let change = TempoChange {
            tick,
            micros_per_beat: micros_per_beat.max(1),
        };
        match self.changes.binary_search_by_key(&tick, |c| c.tick) {
            Ok(i) => self.changes[i] = change,
            Err(i) => self.changes.insert(i, change),
        }
    }

    /// Ticks per beat (PPQN).
    pub fn ticks_per_beat(&self) -> u16 {
        self.ticks_per_beat
    }

    /// All change points in tick order.
    pub fn changes(&self) -> &[TempoChange] {
        &self.changes
    }

    fn segment_index(&self, tick: u64) -> usize {
        // changes[0].tick is always 0
        self.changes.partition_point(|c| c.tick <= tick).saturating_sub(1)
    }

    /// Tempo in effect at `tick`.
    pub fn micros_per_beat_at(&self, tick: u64) -> u32 {
        self.changes[self.segment_index(tick)].micros_per_beat
    }

    /// Duration of one tick at `tick`.
    pub fn seconds_per_tick_at(&self, tick: u64) -> f64 {
        seconds_per_tick(self.micros_per_beat_at(tick), self.ticks_per_beat)
    }

    /// Elapsed seconds from tick 0 to `tick`.
    pub fn tick_to_seconds(&self, tick: u64) -> f64 {
        let mut seconds = 0.0;
        for (i, change) in self.changes.iter().enumerate() {
            if change.tick >= tick {
                break;
            }
            let end = self
                .changes
                .get(i + 1)
                .map_or(tick, |next| next.tick.min(tick));
            seconds += (end - change.tick) as f64
                * seconds_per_tick(change.micros_per_beat, self.ticks_per_beat);
        }
        seconds
    }

    /// Fractional tick reached after `seconds` from tick 0.
    pub fn seconds_to_tick(&self, seconds: f64) -> f64 {
        let mut remaining = seconds.max(0.0);
        for (i, change) in self.changes.iter().enumerate() {
            let spt = seconds_per_tick(change.micros_per_beat, self.ticks_per_beat);
            match self.changes.get(i + 1) {
                Some(next) => {
                    let span = (next.tick - change.tick) as f64 * spt;
                    if remaining < span {
                        return change.tick as f64 + remaining / spt;
                    }
                    remaining -= span;
                }
                None => return change.tick as f64 + remaining / spt,
            }
        }
        0.0
    }
}

impl Default for TempoMap {
    fn default() -> Self {
        Self::new(480)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_120_bpm() {
        let map = TempoMap::new(480);
        assert_eq!(map.micros_per_beat_at(12345), DEFAULT_MICROS_PER_BEAT);
        assert!((micros_per_beat_to_bpm(DEFAULT_MICROS_PER_BEAT) - 120.0).abs() < 1e-9);
        assert_eq!(bpm_to_micros_per_beat(120.0), 500_000);
    }

    #[test]
    fn test_tempo_change_doubles_seconds_per_tick() {
        let map = TempoMap::from_changes(480, [(480, 1_000_000)]);
        let before = map.seconds_per_tick_at(479);
        let after = map.seconds_per_tick_at(480);
        assert!(
            (after / before - 2.0).abs() < 1e-12,
            "tick duration should double, got {} -> {}",
            before,
            after
        );
    }

    #[test]
    fn test_change_at_zero_replaces_default() {
        let map = TempoMap::from_changes(96, [(0, 250_000)]);
        assert_eq!(map.changes().len(), 1);
        assert!((map.tick_to_seconds(96) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_seconds_tick_inverse() {
        let map = TempoMap::from_changes(480, [(960, 250_000), (480, 1_000_000)]);
        for tick in [0u64, 100, 480, 700, 960, 5000] {
            let secs = map.tick_to_seconds(tick);
            let back = map.seconds_to_tick(secs);
            assert!(
                (back - tick as f64).abs() < 1e-6,
                "tick {} -> {} s -> {}",
                tick,
                secs,
                back
            );
        }
    }
}
