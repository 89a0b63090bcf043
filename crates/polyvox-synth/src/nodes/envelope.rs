//! Multi-stage DAHDSR envelope.
//!
//! Stages run strictly forward, Delay → Attack → Hold → Decay → Sustain,
//! except that `note_off` jumps to Release from wherever the envelope is.
//! Every ramp is linear in the envelope's native unit. For amplitude
//! envelopes in [`EnvelopeUnit::Decibel`] mode the decay and release ramps
//! are linear in dB (exponential in amplitude) and only the attack is linear
//! in amplitude.
//!
//! Release has a fixed duration: from whatever level `note_off` captures,
//! the envelope reaches exactly 0 after `release` seconds.

use polyvox_core::{RenderCache, SignalNode, SynthTables, seconds_to_samples};

/// Dynamic range covered by a decibel envelope.
pub const ENVELOPE_DB_RANGE: f32 = 96.0;

/// Envelope stage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EnvelopeStage {
    /// Silent wait before the attack.
    Delay,
    /// Rising from the start level to 1.
    Attack,
    /// Holding at 1.
    Hold,
    /// Falling from 1 to the sustain level.
    Decay,
    /// Holding at the sustain level while the key is down.
    Sustain,
    /// Falling to 0 after `note_off`.
    Release,
    /// Finished; output is 0.
    #[default]
    Done,
}

/// How the 0..1 envelope position maps to the output value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EnvelopeUnit {
    /// Output is the position itself (modulation envelopes).
    #[default]
    Linear,
    /// Position spans [`ENVELOPE_DB_RANGE`] dB below full scale.
    Decibel,
}

/// Envelope times in seconds, levels as 0..1 fractions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnvelopeParams {
    /// Delay before the attack starts.
    pub delay: f32,
    /// Attack time.
    pub attack: f32,
    /// Hold time at peak.
    pub hold: f32,
    /// Decay time from peak to sustain.
    pub decay: f32,
    /// Sustain level.
    pub sustain: f32,
    /// Release time to silence.
    pub release: f32,
    /// Level the attack starts from.
    pub start_level: f32,
    /// Start level added at full velocity, scaled linearly below.
    pub velocity_to_start: f32,
    /// Attack time change at full velocity, in timecents (negative = faster).
    pub velocity_to_attack: f32,
    /// Decay time change at full velocity, in timecents.
    pub velocity_to_decay: f32,
    /// Release time change at full velocity, in timecents.
    pub velocity_to_release: f32,
    /// Hold time change per key above middle C, in timecents.
    pub key_to_hold: f32,
    /// Decay time change per key above middle C, in timecents.
    pub key_to_decay: f32,
    /// Output mapping.
    pub unit: EnvelopeUnit,
}

impl Default for EnvelopeParams {
    fn default() -> Self {
        Self {
            delay: 0.0,
            attack: 0.005,
            hold: 0.0,
            decay: 0.1,
            sustain: 1.0,
            release: 0.1,
            start_level: 0.0,
            velocity_to_start: 0.0,
            velocity_to_attack: 0.0,
            velocity_to_decay: 0.0,
            velocity_to_release: 0.0,
            key_to_hold: 0.0,
            key_to_decay: 0.0,
            unit: EnvelopeUnit::Linear,
        }
    }
}

impl EnvelopeParams {
    /// Plain ADSR with linear output.
    pub fn adsr(attack: f32, decay: f32, sustain: f32, release: f32) -> Self {
        Self {
            attack,
            decay,
            sustain,
            release,
            ..Self::default()
        }
    }
}

/// Scale a time by a timecent offset.
fn scale_time(seconds: f32, timecents: f32) -> f32 {
    if timecents == 0.0 {
        seconds
    } else {
        seconds * libm::exp2f(timecents / 1200.0)
    }
}

/// DAHDSR envelope node.
///
/// # Example
///
/// ```rust
/// use polyvox_core::{SignalNode, SynthTables};
/// use polyvox_synth::{Envelope, EnvelopeParams, EnvelopeStage};
///
/// let tables = SynthTables::new();
/// let mut env = Envelope::new(EnvelopeParams::adsr(0.01, 0.1, 0.5, 0.2));
/// env.init(&tables, 1000.0);
/// env.note_on(60, 127);
/// assert_eq!(env.stage(), EnvelopeStage::Attack);
///
/// let mut flag = false;
/// for _ in 0..200 {
///     flag = !flag;
///     env.render(flag);
/// }
/// assert_eq!(env.stage(), EnvelopeStage::Sustain);
///
/// env.note_off(0);
/// for _ in 0..200 {
///     flag = !flag;
///     env.render(flag);
/// }
/// assert!(!env.is_active());
/// ```
#[derive(Debug, Clone)]
pub struct Envelope {
    params: EnvelopeParams,
    tables: Option<SynthTables>,
    sample_rate: f32,
    stage: EnvelopeStage,
    level: f32,
    from: f32,
    to: f32,
    len: u32,
    pos: u32,
    attack: u32,
    hold: u32,
    decay: u32,
    release: u32,
    cache: RenderCache,
}

impl Envelope {
    /// Create an idle envelope.
    pub fn new(params: EnvelopeParams) -> Self {
        Self {
            params,
            tables: None,
            sample_rate: 44100.0,
            stage: EnvelopeStage::Done,
            level: 0.0,
            from: 0.0,
            to: 0.0,
            len: 0,
            pos: 0,
            attack: 0,
            hold: 0,
            decay: 0,
            release: 0,
            cache: RenderCache::new(),
        }
    }

    /// Replace the parameters; takes effect at the next `note_on`.
    pub fn set_params(&mut self, params: EnvelopeParams) {
        self.params = params;
    }

    /// Current parameters.
    pub fn params(&self) -> &EnvelopeParams {
        &self.params
    }

    /// Current stage.
    pub fn stage(&self) -> EnvelopeStage {
        self.stage
    }

    /// Current 0..1 position.
    pub fn level(&self) -> f32 {
        self.level
    }

    fn samples(&self, seconds: f32) -> u32 {
        seconds_to_samples(seconds, self.sample_rate)
    }

    fn enter(&mut self, stage: EnvelopeStage) {
        self.stage = stage;
        self.pos = 0;
        self.from = self.level;
        match stage {
            EnvelopeStage::Attack => {
                self.to = 1.0;
                self.len = self.attack;
            }
            EnvelopeStage::Hold => {
                self.to = 1.0;
                self.len = self.hold;
            }
            EnvelopeStage::Decay => {
                self.to = self.params.sustain.clamp(0.0, 1.0);
                self.len = self.decay;
            }
            EnvelopeStage::Release => {
                self.to = 0.0;
                self.len = self.release;
            }
            EnvelopeStage::Delay | EnvelopeStage::Sustain | EnvelopeStage::Done => {
                self.to = self.level;
                self.len = 0;
            }
        }
    }

    #[inline]
    fn ramp(&self) -> f32 {
        self.from + (self.to - self.from) * (self.pos as f32 / self.len as f32)
    }

    /// Advance one sample and return the 0..1 position.
    fn advance(&mut self) -> f32 {
        loop {
            match self.stage {
                EnvelopeStage::Delay => {
                    if self.pos < self.len {
                        self.pos += 1;
                        return 0.0;
                    }
                    self.enter(EnvelopeStage::Attack);
                }
                EnvelopeStage::Attack | EnvelopeStage::Decay => {
                    if self.pos < self.len {
                        self.level = self.ramp();
                        self.pos += 1;
                        return self.level;
                    }
                    self.level = self.to;
                    if self.stage == EnvelopeStage::Attack {
                        self.enter(EnvelopeStage::Hold);
                    } else if self.level <= 0.0 {
                        self.stage = EnvelopeStage::Done;
                    } else {
                        self.enter(EnvelopeStage::Sustain);
                    }
                }
                EnvelopeStage::Hold => {
                    if self.pos < self.len {
                        self.pos += 1;
                        return self.level;
                    }
                    self.enter(EnvelopeStage::Decay);
                }
                EnvelopeStage::Sustain => return self.level,
                EnvelopeStage::Release => {
                    if self.pos < self.len {
                        self.pos += 1;
                        self.level = self.ramp();
                        if self.pos == self.len {
                            self.level = 0.0;
                            self.stage = EnvelopeStage::Done;
                        }
                        return self.level;
                    }
                    self.level = 0.0;
                    self.stage = EnvelopeStage::Done;
                }
                EnvelopeStage::Done => return 0.0,
            }
        }
    }

    fn output(&self, position: f32) -> f32 {
        match self.params.unit {
            EnvelopeUnit::Linear => position,
            EnvelopeUnit::Decibel if self.stage == EnvelopeStage::Attack => position,
            EnvelopeUnit::Decibel => {
                if position <= 0.0 {
                    return 0.0;
                }
                let atten = (1.0 - position) * ENVELOPE_DB_RANGE;
                match &self.tables {
                    Some(tables) => tables.attenuation_to_gain(atten),
                    None => polyvox_core::db_to_linear(-atten),
                }
            }
        }
    }
}

impl SignalNode for Envelope {
    fn init(&mut self, tables: &SynthTables, sample_rate: f32) {
        self.tables = Some(tables.clone());
        self.sample_rate = sample_rate;
    }

    fn note_on(&mut self, note: u8, velocity: u8) {
        let p = self.params;
        let vel = f32::from(velocity.min(127)) / 127.0;
        let key = f32::from(note) - 60.0;

        self.attack = self.samples(scale_time(p.attack, p.velocity_to_attack * vel));
        self.hold = self.samples(scale_time(p.hold, p.key_to_hold * key));
        self.decay = self.samples(scale_time(
            p.decay,
            p.velocity_to_decay * vel + p.key_to_decay * key,
        ));
        self.release = self.samples(scale_time(p.release, p.velocity_to_release * vel));

        self.level = (p.start_level + p.velocity_to_start * vel).clamp(0.0, 1.0);
        self.cache.reset();
        self.enter(EnvelopeStage::Delay);
        self.len = self.samples(p.delay);
        if self.len == 0 {
            self.enter(EnvelopeStage::Attack);
        }

        #[cfg(feature = "tracing")]
        tracing::trace!(
            note,
            velocity,
            attack = self.attack,
            decay = self.decay,
            release = self.release,
            "envelope start"
        );
    }

    fn note_off(&mut self, _velocity: u8) {
        if matches!(self.stage, EnvelopeStage::Release | EnvelopeStage::Done) {
            return;
        }
        if self.stage == EnvelopeStage::Attack && self.params.unit == EnvelopeUnit::Decibel {
            // Attack is linear in amplitude; convert to the dB position so
            // release starts at the same loudness
            let db = polyvox_core::linear_to_db(self.level);
            self.level = (1.0 + db / ENVELOPE_DB_RANGE).max(0.0);
        }
        if self.level <= 0.0 {
            self.level = 0.0;
            self.stage = EnvelopeStage::Done;
            return;
        }
        self.enter(EnvelopeStage::Release);
    }

    fn is_active(&self) -> bool {
        self.stage != EnvelopeStage::Done
    }

    fn render(&mut self, flag: bool) -> f32 {
        if let Some(value) = self.cache.hit(flag) {
            return value;
        }
        let position = self.advance();
        let value = self.output(position);
        self.cache.store(flag, value)
    }
}

#[cfg(test)]
mod tests {
    extern crate alloc;
    use alloc::vec::Vec;

    use super::*;

    fn started(params: EnvelopeParams, sample_rate: f32) -> Envelope {
        let tables = SynthTables::new();
        let mut env = Envelope::new(params);
        env.init(&tables, sample_rate);
        env.note_on(60, 127);
        env
    }

    fn run(env: &mut Envelope, flag: &mut bool, n: usize) -> Vec<f32> {
        (0..n)
            .map(|_| {
                *flag = !*flag;
                env.render(*flag)
            })
            .collect()
    }

    #[test]
    fn test_attack_decay_release_timing() {
        let mut env = started(EnvelopeParams::adsr(1.0, 1.0, 0.5, 1.0), 1000.0);
        let mut flag = false;

        let attack = run(&mut env, &mut flag, 1000);
        assert_eq!(attack[0], 0.0, "level at sample 0 should be the start level");
        assert!(
            (attack[999] - 1.0).abs() < 0.01,
            "end of attack should be ~1.0, got {}",
            attack[999]
        );
        for pair in attack.windows(2) {
            assert!(pair[1] > pair[0]);
        }

        let decay = run(&mut env, &mut flag, 500);
        let mid = decay[499];
        assert!(mid < 1.0 && mid > 0.5, "mid-decay level {} out of range", mid);

        env.note_off(0);
        assert_eq!(env.stage(), EnvelopeStage::Release);
        let release = run(&mut env, &mut flag, 1000);
        let mut prev = mid;
        for (i, &level) in release.iter().enumerate() {
            assert!(level < prev, "release not strictly decreasing at {}", i);
            prev = level;
        }
        assert_eq!(release[999], 0.0);
        assert!(release[998] > 0.0, "should not reach 0 early");
        assert!(!env.is_active());
    }

    #[test]
    fn test_release_duration_independent_of_stage() {
        for cut in [10, 300, 1500, 3000] {
            let mut env = started(EnvelopeParams::adsr(0.5, 1.0, 0.3, 0.25), 1000.0);
            let mut flag = false;
            run(&mut env, &mut flag, cut);
            env.note_off(0);
            let tail = run(&mut env, &mut flag, 250);
            assert_eq!(tail[249], 0.0, "cut at {} should end after 250 samples", cut);
            assert!(!env.is_active());
        }
    }

    #[test]
    fn test_delay_and_hold() {
        let params = EnvelopeParams {
            delay: 0.01,
            attack: 0.0,
            hold: 0.005,
            decay: 0.0,
            sustain: 0.25,
            ..EnvelopeParams::default()
        };
        let mut env = started(params, 1000.0);
        assert_eq!(env.stage(), EnvelopeStage::Delay);
        let mut flag = false;
        let out = run(&mut env, &mut flag, 20);
        assert!(out[..10].iter().all(|&v| v == 0.0));
        assert!(out[10..15].iter().all(|&v| v == 1.0));
        assert_eq!(out[15], 0.25);
        assert_eq!(env.stage(), EnvelopeStage::Sustain);
    }

    #[test]
    fn test_zero_sustain_finishes() {
        let mut env = started(EnvelopeParams::adsr(0.0, 0.01, 0.0, 0.1), 1000.0);
        let mut flag = false;
        run(&mut env, &mut flag, 20);
        assert!(!env.is_active());
    }

    #[test]
    fn test_velocity_shortens_attack() {
        let params = EnvelopeParams {
            attack: 0.1,
            velocity_to_attack: -1200.0,
            ..EnvelopeParams::default()
        };
        let tables = SynthTables::new();
        let mut env = Envelope::new(params);
        env.init(&tables, 1000.0);
        env.note_on(60, 127);
        let mut flag = false;
        run(&mut env, &mut flag, 60);
        assert_ne!(env.stage(), EnvelopeStage::Attack, "full velocity halves the attack");

        env.note_on(60, 0);
        run(&mut env, &mut flag, 60);
        assert_eq!(env.stage(), EnvelopeStage::Attack);
    }

    #[test]
    fn test_note_on_restarts() {
        let mut env = started(EnvelopeParams::adsr(0.01, 0.01, 0.5, 0.01), 1000.0);
        let mut flag = false;
        run(&mut env, &mut flag, 100);
        env.note_off(0);
        run(&mut env, &mut flag, 100);
        assert!(!env.is_active());
        env.note_on(60, 100);
        assert!(env.is_active());
        assert_eq!(env.stage(), EnvelopeStage::Attack);
    }

    #[test]
    fn test_decibel_release_is_exponential() {
        let params = EnvelopeParams {
            attack: 0.0,
            decay: 0.0,
            sustain: 1.0,
            release: 0.1,
            unit: EnvelopeUnit::Decibel,
            ..EnvelopeParams::default()
        };
        let mut env = started(params, 1000.0);
        let mut flag = false;
        let held = run(&mut env, &mut flag, 5);
        assert_eq!(held[4], 1.0);
        env.note_off(0);
        let tail = run(&mut env, &mut flag, 100);
        // Half way through a 96 dB ramp is -48 dB
        assert!((tail[49] - 0.004).abs() < 0.001, "got {}", tail[49]);
        assert_eq!(tail[99], 0.0);
    }
}
