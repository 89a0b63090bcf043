//! SoundFont-style zones and generators.
//!
//! A [`GeneratorSet`] holds raw generator amounts in their native units
//! (timecents, centibels, absolute cents, frame offsets). Instrument-level
//! ("global") sets supply defaults; [`GeneratorSet::merge`] overlays a local
//! zone so every generator present locally wins and every absent one is
//! inherited. [`ZoneParams::resolve`] converts a merged set into node
//! parameters, clamping anything malformed to a usable default.

use polyvox_core::{FilterType, LfoWaveform, centibels_to_db, timecents_to_seconds};

use crate::nodes::{
    ENVELOPE_DB_RANGE, EnvelopeParams, EnvelopeUnit, FilterSettings, LfoSettings, LoopMode,
    SampleRegion,
};

/// Generator identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum GeneratorKind {
    /// Frames added to the sample start.
    StartOffset,
    /// Frames added to the sample end.
    EndOffset,
    /// Frames added to the loop start.
    LoopStartOffset,
    /// Frames added to the loop end.
    LoopEndOffset,
    /// Filter cutoff, absolute cents.
    FilterCutoff,
    /// Filter resonance, centibels.
    FilterQ,
    /// Vibrato depth, cents.
    VibratoToPitch,
    /// Vibrato delay, timecents.
    VibratoDelay,
    /// Vibrato rate, absolute cents.
    VibratoFrequency,
    /// Volume envelope delay, timecents.
    DelayVolEnv,
    /// Volume envelope attack, timecents.
    AttackVolEnv,
    /// Volume envelope hold, timecents.
    HoldVolEnv,
    /// Volume envelope decay, timecents.
    DecayVolEnv,
    /// Volume envelope sustain, centibels of attenuation.
    SustainVolEnv,
    /// Volume envelope release, timecents.
    ReleaseVolEnv,
    /// Hold change per key, timecents.
    KeyToVolEnvHold,
    /// Decay change per key, timecents.
    KeyToVolEnvDecay,
    /// Attenuation, centibels.
    InitialAttenuation,
    /// Pan, tenths of a percent (-500 left to 500 right).
    Pan,
    /// Semitones.
    CoarseTune,
    /// Cents.
    FineTune,
    /// 0 or 2 = no loop, 1 = continuous, 3 = sustain loop.
    SampleModes,
    /// Cents per key.
    ScaleTuning,
    /// Root key override; -1 uses the sample's own root.
    OverridingRootKey,
    /// Packed `low | high << 8`.
    KeyRange,
    /// Packed `low | high << 8`.
    VelocityRange,
}

impl GeneratorKind {
    /// Number of generator kinds.
    pub const COUNT: usize = 26;

    /// Every kind, in declaration order.
    pub const ALL: [GeneratorKind; Self::COUNT] = [
        Self::StartOffset,
        Self::EndOffset,
        Self::LoopStartOffset,
        Self::LoopEndOffset,
        Self::FilterCutoff,
        Self::FilterQ,
        Self::VibratoToPitch,
        Self::VibratoDelay,
        Self::VibratoFrequency,
        Self::DelayVolEnv,
        Self::AttackVolEnv,
        Self::HoldVolEnv,
        Self::DecayVolEnv,
        Self::SustainVolEnv,
        Self::ReleaseVolEnv,
        Self::KeyToVolEnvHold,
        Self::KeyToVolEnvDecay,
        Self::InitialAttenuation,
        Self::Pan,
        Self::CoarseTune,
        Self::FineTune,
        Self::SampleModes,
        Self::ScaleTuning,
        Self::OverridingRootKey,
        Self::KeyRange,
        Self::VelocityRange,
    ];

    /// Snake-case name used in configuration files.
    pub const fn name(self) -> &'static str {
        match self {
            Self::StartOffset => "start_offset",
            Self::EndOffset => "end_offset",
            Self::LoopStartOffset => "loop_start_offset",
            Self::LoopEndOffset => "loop_end_offset",
            Self::FilterCutoff => "filter_cutoff",
            Self::FilterQ => "filter_q",
            Self::VibratoToPitch => "vibrato_to_pitch",
            Self::VibratoDelay => "vibrato_delay",
            Self::VibratoFrequency => "vibrato_frequency",
            Self::DelayVolEnv => "delay_vol_env",
            Self::AttackVolEnv => "attack_vol_env",
            Self::HoldVolEnv => "hold_vol_env",
            Self::DecayVolEnv => "decay_vol_env",
            Self::SustainVolEnv => "sustain_vol_env",
            Self::ReleaseVolEnv => "release_vol_env",
            Self::KeyToVolEnvHold => "key_to_vol_env_hold",
            Self::KeyToVolEnvDecay => "key_to_vol_env_decay",
            Self::InitialAttenuation => "initial_attenuation",
            Self::Pan => "pan",
            Self::CoarseTune => "coarse_tune",
            Self::FineTune => "fine_tune",
            Self::SampleModes => "sample_modes",
            Self::ScaleTuning => "scale_tuning",
            Self::OverridingRootKey => "overriding_root_key",
            Self::KeyRange => "key_range",
            Self::VelocityRange => "velocity_range",
        }
    }

    /// Look up a kind by its snake-case name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// SoundFont default amount.
    pub const fn default_amount(self) -> i32 {
        match self {
            Self::FilterCutoff => 13500,
            Self::VibratoDelay
            | Self::DelayVolEnv
            | Self::AttackVolEnv
            | Self::HoldVolEnv
            | Self::DecayVolEnv
            | Self::ReleaseVolEnv => -12000,
            Self::ScaleTuning => 100,
            Self::OverridingRootKey => -1,
            Self::KeyRange | Self::VelocityRange => 127 << 8,
            _ => 0,
        }
    }
}

/// One generator amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Generator {
    /// What it sets.
    pub kind: GeneratorKind,
    /// Raw amount in the generator's native unit.
    pub amount: i32,
}

impl Generator {
    /// A generator.
    pub const fn new(kind: GeneratorKind, amount: i32) -> Self {
        Self { kind, amount }
    }

    /// Key range generator.
    pub const fn key_range(low: u8, high: u8) -> Self {
        Self::new(GeneratorKind::KeyRange, low as i32 | (high as i32) << 8)
    }

    /// Velocity range generator.
    pub const fn velocity_range(low: u8, high: u8) -> Self {
        Self::new(GeneratorKind::VelocityRange, low as i32 | (high as i32) << 8)
    }
}

/// Sparse set of generator amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorSet {
    amounts: [Option<i32>; GeneratorKind::COUNT],
}

impl Default for GeneratorSet {
    fn default() -> Self {
        Self::new()
    }
}

impl GeneratorSet {
    /// Empty set.
    pub const fn new() -> Self {
        Self {
            amounts: [None; GeneratorKind::COUNT],
        }
    }

    /// Set from a list; later entries overwrite earlier ones.
    pub fn from_generators(generators: &[Generator]) -> Self {
        let mut set = Self::new();
        for g in generators {
            set.set(g.kind, g.amount);
        }
        set
    }

    /// Set an amount.
    pub fn set(&mut self, kind: GeneratorKind, amount: i32) {
        self.amounts[kind as usize] = Some(amount);
    }

    /// Remove an amount.
    pub fn clear(&mut self, kind: GeneratorKind) {
        self.amounts[kind as usize] = None;
    }

    /// Amount if present.
    pub fn get(&self, kind: GeneratorKind) -> Option<i32> {
        self.amounts[kind as usize]
    }

    /// Amount, or the default for the kind.
    pub fn get_or_default(&self, kind: GeneratorKind) -> i32 {
        self.get(kind).unwrap_or(kind.default_amount())
    }

    /// Overlay `local` on `global`: local amounts win, absent ones inherit.
    pub fn merge(global: &Self, local: &Self) -> Self {
        let mut merged = *global;
        for (slot, value) in merged.amounts.iter_mut().zip(&local.amounts) {
            if value.is_some() {
                *slot = *value;
            }
        }
        merged
    }

    fn range(&self, kind: GeneratorKind) -> (u8, u8) {
        let packed = self.get_or_default(kind);
        let low = (packed & 0xFF).clamp(0, 127) as u8;
        let high = ((packed >> 8) & 0xFF).clamp(0, 127) as u8;
        if low > high { (0, 127) } else { (low, high) }
    }

    /// Inclusive key range; missing or inverted ranges mean 0..=127.
    pub fn key_range(&self) -> (u8, u8) {
        self.range(GeneratorKind::KeyRange)
    }

    /// Inclusive velocity range; missing or inverted ranges mean 0..=127.
    pub fn velocity_range(&self) -> (u8, u8) {
        self.range(GeneratorKind::VelocityRange)
    }
}

/// Positions and pitch data carried by a sample header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleInfo {
    /// Number of frames.
    pub len: u32,
    /// Loop start frame.
    pub loop_start: u32,
    /// Loop end frame.
    pub loop_end: u32,
    /// Recorded pitch.
    pub root_key: u8,
    /// Pitch correction in cents.
    pub correction: i8,
}

/// Node parameters for one zone after unit conversion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneParams {
    /// Inclusive key range.
    pub key_range: (u8, u8),
    /// Inclusive velocity range.
    pub velocity_range: (u8, u8),
    /// Playback window and pitch.
    pub region: SampleRegion,
    /// Volume envelope, dB-mapped.
    pub amp_envelope: EnvelopeParams,
    /// Filter.
    pub filter: FilterSettings,
    /// Vibrato LFO.
    pub vibrato: LfoSettings,
    /// Vibrato depth at full swing, in cents.
    pub vibrato_depth: f32,
    /// Output gain in dB (zero or negative).
    pub gain_db: f32,
    /// Pan, -1 to 1.
    pub pan: f32,
}

/// Absolute cents (8.176 Hz = 0) to Hz.
fn absolute_cents_to_hz(cents: i32) -> f32 {
    8.175_799 * libm::exp2f(cents as f32 / 1200.0)
}

fn offset(base: u32, amount: i32) -> u32 {
    (i64::from(base) + i64::from(amount)).clamp(0, i64::from(u32::MAX)) as u32
}

impl ZoneParams {
    /// Convert a merged generator set for a sample into node parameters.
    pub fn resolve(generators: &GeneratorSet, sample: &SampleInfo) -> Self {
        use GeneratorKind as G;
        let amount = |kind| generators.get_or_default(kind);
        let seconds = |kind| timecents_to_seconds(amount(kind) as f32);

        let loop_mode = match amount(G::SampleModes) {
            1 => LoopMode::Continuous,
            3 => LoopMode::Sustain,
            _ => LoopMode::NoLoop,
        };
        let root_key = match amount(G::OverridingRootKey) {
            key @ 0..=127 => key as u8,
            _ => sample.root_key.min(127),
        };
        let region = SampleRegion {
            start: offset(0, amount(G::StartOffset)),
            end: offset(sample.len, amount(G::EndOffset)),
            loop_start: offset(sample.loop_start, amount(G::LoopStartOffset)),
            loop_end: offset(sample.loop_end, amount(G::LoopEndOffset)),
            loop_mode,
            root_key,
            tune_cents: (amount(G::CoarseTune) * 100 + amount(G::FineTune)) as f32
                + f32::from(sample.correction),
            key_track: amount(G::ScaleTuning) as f32,
            velocity_track: 0.0,
        }
        .sanitized(sample.len as usize);

        let sustain_db = -centibels_to_db(amount(G::SustainVolEnv).max(0) as f32);
        let amp_envelope = EnvelopeParams {
            delay: seconds(G::DelayVolEnv),
            attack: seconds(G::AttackVolEnv),
            hold: seconds(G::HoldVolEnv),
            decay: seconds(G::DecayVolEnv),
            sustain: (1.0 - sustain_db / ENVELOPE_DB_RANGE).clamp(0.0, 1.0),
            release: seconds(G::ReleaseVolEnv),
            key_to_hold: amount(G::KeyToVolEnvHold) as f32,
            key_to_decay: amount(G::KeyToVolEnvDecay) as f32,
            unit: EnvelopeUnit::Decibel,
            ..EnvelopeParams::default()
        };

        let q_db = -centibels_to_db(amount(G::FilterQ).clamp(0, 960) as f32);
        let filter = FilterSettings {
            filter_type: FilterType::LowPass,
            cutoff: absolute_cents_to_hz(amount(G::FilterCutoff)).clamp(20.0, 20_000.0),
            q: polyvox_core::db_to_linear(q_db).max(core::f32::consts::FRAC_1_SQRT_2),
            ..FilterSettings::default()
        };

        let vibrato = LfoSettings {
            waveform: LfoWaveform::Triangle,
            frequency: absolute_cents_to_hz(amount(G::VibratoFrequency)).clamp(0.001, 100.0),
            delay: seconds(G::VibratoDelay),
        };

        Self {
            key_range: generators.key_range(),
            velocity_range: generators.velocity_range(),
            region,
            amp_envelope,
            filter,
            vibrato,
            vibrato_depth: amount(G::VibratoToPitch) as f32,
            gain_db: centibels_to_db(amount(G::InitialAttenuation).clamp(0, 1440) as f32),
            pan: (amount(G::Pan).clamp(-500, 500) as f32) / 500.0,
        }
    }

    /// True if the zone plays `note` at `velocity`.
    pub fn matches(&self, note: u8, velocity: u8) -> bool {
        (self.key_range.0..=self.key_range.1).contains(&note)
            && (self.velocity_range.0..=self.velocity_range.1).contains(&velocity)
    }
}
