//! DX7-style four-rate, four-level operator envelope.
//!
//! The level moves in decibels. Falling segments are linear in dB at the
//! slope given by the rate; rising segments get faster as the amplitude
//! grows, which gives the characteristic snappy DX7 attack. The dB level is
//! updated once per [`DX7_BLOCK`] samples and the linear gain is
//! interpolated in between.
//!
//! Stage 0..=2 run on `note_on`; the envelope then holds at level 3 of the
//! sequence (L3) until `note_off` sends it toward L4.

use polyvox_core::{RenderCache, SignalNode, SynthTables};

/// Samples per coarse envelope update.
pub const DX7_BLOCK: u32 = 64;

/// Attenuation treated as silence.
const MAX_ATTEN_DB: f32 = 96.0;

/// Attenuation at or above which a finished release counts as inactive.
/// A release ending louder than this keeps falling at R4 to silence.
const RELEASE_FLOOR_DB: f32 = 60.0;

/// Four rates and four levels, each 0 to 99, plus the operator's output
/// level and keyboard rate scaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dx7EnvelopeParams {
    /// Segment rates R1..R4.
    pub rates: [u8; 4],
    /// Segment target levels L1..L4.
    pub levels: [u8; 4],
    /// Operator output level.
    pub output_level: u8,
    /// Keyboard rate scaling, 0 to 7.
    pub rate_scaling: u8,
}

impl Default for Dx7EnvelopeParams {
    fn default() -> Self {
        Self {
            rates: [99, 50, 35, 50],
            levels: [99, 90, 80, 0],
            output_level: 99,
            rate_scaling: 0,
        }
    }
}

/// DX7-style envelope node. Output is linear gain.
#[derive(Debug, Clone)]
pub struct Dx7Envelope {
    params: Dx7EnvelopeParams,
    tables: Option<SynthTables>,
    sample_rate: f32,
    stage: usize,
    atten: f32,
    target: f32,
    rate_bonus: u8,
    gain: f32,
    gain_step: f32,
    block_pos: u32,
    done: bool,
    cache: RenderCache,
}

impl Dx7Envelope {
    /// Create an idle envelope.
    pub fn new(params: Dx7EnvelopeParams) -> Self {
        Self {
            params,
            tables: None,
            sample_rate: 44100.0,
            stage: 3,
            atten: MAX_ATTEN_DB,
            target: MAX_ATTEN_DB,
            rate_bonus: 0,
            gain: 0.0,
            gain_step: 0.0,
            block_pos: 0,
            done: true,
            cache: RenderCache::new(),
        }
    }

    /// Replace parameters; takes effect at the next `note_on`.
    pub fn set_params(&mut self, params: Dx7EnvelopeParams) {
        self.params = params;
    }

    /// Current parameters.
    pub fn params(&self) -> &Dx7EnvelopeParams {
        &self.params
    }

    /// Current segment, 0 to 3.
    pub fn stage(&self) -> usize {
        self.stage
    }

    /// Current attenuation in dB.
    pub fn attenuation(&self) -> f32 {
        self.atten
    }

    fn level_atten(&self, level: u8) -> f32 {
        let Some(tables) = &self.tables else {
            return MAX_ATTEN_DB;
        };
        (tables.dx7_level_to_atten(level) + tables.dx7_level_to_atten(self.params.output_level))
            .min(MAX_ATTEN_DB)
    }

    fn enter(&mut self, stage: usize) {
        self.stage = stage;
        self.target = self.level_atten(self.params.levels[stage]);
    }

    fn gain_for(&self, atten: f32) -> f32 {
        if atten >= MAX_ATTEN_DB {
            return 0.0;
        }
        match &self.tables {
            Some(tables) => tables.attenuation_to_gain(atten),
            None => 0.0,
        }
    }

    /// Move the dB level one block toward the current target.
    fn advance_block(&mut self) {
        let Some(tables) = &self.tables else {
            return;
        };
        let rate = self.params.rates[self.stage].saturating_add(self.rate_bonus);
        let step = tables.dx7_rate_to_slope(rate) * DX7_BLOCK as f32 / self.sample_rate;

        if self.target < self.atten {
            // Rising: speed up with amplitude
            let boost = 1.0 + 3.0 * tables.attenuation_to_gain(self.atten);
            self.atten = (self.atten - step * boost).max(self.target);
        } else {
            self.atten = (self.atten + step).min(self.target);
        }

        if self.atten == self.target {
            match self.stage {
                0 | 1 => self.enter(self.stage + 1),
                3 => {
                    if self.atten >= RELEASE_FLOOR_DB {
                        self.done = true;
                    } else {
                        self.target = MAX_ATTEN_DB;
                    }
                }
                _ => {}
            }
        }

        let next_gain = if self.done { 0.0 } else { self.gain_for(self.atten) };
        self.gain_step = (next_gain - self.gain) / DX7_BLOCK as f32;
    }
}

impl SignalNode for Dx7Envelope {
    fn init(&mut self, tables: &SynthTables, sample_rate: f32) {
        self.tables = Some(tables.clone());
        self.sample_rate = sample_rate;
    }

    fn note_on(&mut self, note: u8, _velocity: u8) {
        // Every 3 keys above A-1 adds rate, scaled by rate_scaling/7
        let keys = u32::from(note.saturating_sub(21)) / 3;
        self.rate_bonus = (keys * u32::from(self.params.rate_scaling.min(7)) / 7).min(99) as u8;

        // Restart from L4 unless still sounding
        if self.done {
            self.atten = self.level_atten(self.params.levels[3]);
            self.gain = self.gain_for(self.atten);
        }
        self.done = false;
        self.block_pos = 0;
        self.cache.reset();
        self.enter(0);

        #[cfg(feature = "tracing")]
        tracing::trace!(note, rate_bonus = self.rate_bonus, "dx7 envelope start");
    }

    fn note_off(&mut self, _velocity: u8) {
        if !self.done {
            self.enter(3);
        }
    }

    fn is_active(&self) -> bool {
        !self.done
    }

    fn render(&mut self, flag: bool) -> f32 {
        if let Some(gain) = self.cache.hit(flag) {
            return gain;
        }
        if self.done && self.gain_step == 0.0 {
            return self.cache.store(flag, 0.0);
        }
        if self.block_pos == 0 {
            self.advance_block();
        }
        let out = self.gain.max(0.0);
        self.gain += self.gain_step;
        self.block_pos = (self.block_pos + 1) % DX7_BLOCK;
        if self.done && self.block_pos == 0 {
            self.gain = 0.0;
            self.gain_step = 0.0;
        }
        self.cache.store(flag, out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(env: &mut Dx7Envelope, flag: &mut bool, n: usize) -> f32 {
        let mut last = 0.0;
        for _ in 0..n {
            *flag = !*flag;
            last = env.render(*flag);
        }
        last
    }

    fn started(params: Dx7EnvelopeParams) -> Dx7Envelope {
        let tables = SynthTables::new();
        let mut env = Dx7Envelope::new(params);
        env.init(&tables, 44100.0);
        env.note_on(60, 100);
        env
    }

    #[test]
    fn test_fast_attack_reaches_full_level() {
        let mut env = started(Dx7EnvelopeParams {
            rates: [99, 99, 99, 99],
            levels: [99, 99, 99, 0],
            ..Dx7EnvelopeParams::default()
        });
        let mut flag = false;
        let level = run(&mut env, &mut flag, 2048);
        assert!((level - 1.0).abs() < 0.01, "expected full level, got {}", level);
        assert_eq!(env.stage(), 2);
    }

    #[test]
    fn test_sustains_at_l3_until_release() {
        let mut env = started(Dx7EnvelopeParams {
            rates: [99, 99, 99, 99],
            levels: [99, 99, 75, 0],
            ..Dx7EnvelopeParams::default()
        });
        let tables = SynthTables::new();
        let mut flag = false;
        let level = run(&mut env, &mut flag, 44100);
        let expected = tables.attenuation_to_gain(tables.dx7_level_to_atten(75));
        assert!(
            (level - expected).abs() < 0.01,
            "sustain should be {}, got {}",
            expected,
            level
        );
        assert!(env.is_active());

        env.note_off(0);
        run(&mut env, &mut flag, 44100);
        assert!(!env.is_active());
        assert_eq!(run(&mut env, &mut flag, 10), 0.0);
    }

    #[test]
    fn test_loud_l4_release_still_finishes() {
        let mut env = started(Dx7EnvelopeParams {
            rates: [99, 99, 99, 50],
            levels: [99, 99, 99, 50],
            ..Dx7EnvelopeParams::default()
        });
        let mut flag = false;
        run(&mut env, &mut flag, 4410);
        env.note_off(0);

        // Passes L4 on the way down instead of parking there
        let tables = SynthTables::new();
        let l4 = tables.attenuation_to_gain(tables.dx7_level_to_atten(50));
        let soon = run(&mut env, &mut flag, 8820);
        assert!(soon < l4, "release should fall below L4 ({}), got {}", l4, soon);

        run(&mut env, &mut flag, 44100 * 2);
        assert!(!env.is_active(), "attenuation stuck at {}", env.attenuation());
        assert_eq!(run(&mut env, &mut flag, 10), 0.0);
    }

    #[test]
    fn test_output_level_attenuates() {
        let mut loud = started(Dx7EnvelopeParams {
            rates: [99; 4],
            levels: [99, 99, 99, 0],
            output_level: 99,
            rate_scaling: 0,
        });
        let mut quiet = started(Dx7EnvelopeParams {
            rates: [99; 4],
            levels: [99, 99, 99, 0],
            output_level: 70,
            rate_scaling: 0,
        });
        let mut f1 = false;
        let mut f2 = false;
        let a = run(&mut loud, &mut f1, 4096);
        let b = run(&mut quiet, &mut f2, 4096);
        assert!(b < a * 0.5, "output level 70 should be well below 99: {} vs {}", b, a);
    }

    #[test]
    fn test_slow_decay_is_gradual() {
        let mut env = started(Dx7EnvelopeParams {
            rates: [99, 40, 99, 99],
            levels: [99, 0, 0, 0],
            ..Dx7EnvelopeParams::default()
        });
        let mut flag = false;
        let peak = run(&mut env, &mut flag, 256);
        let later = run(&mut env, &mut flag, 4410);
        assert!(later < peak && later > 0.0, "{} -> {}", peak, later);
    }
}
