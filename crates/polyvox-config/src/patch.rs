//! Patch file format: oscillator, FM, and sample instruments.
//!
//! A patch describes one timbre. The `type` key selects the instrument
//! kind; every other field has a default, so a patch file only needs to
//! name what it changes.
//!
//! ```toml
//! type = "oscillator"
//! name = "Soft Saw"
//!
//! [[oscillators]]
//! waveform = "saw"
//!
//! [[oscillators]]
//! waveform = "saw"
//! detune = 9.0
//!
//! [filter]
//! cutoff = 1800.0
//! key_track = 50.0
//!
//! [amp_envelope]
//! attack = 0.02
//! release = 0.4
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use polyvox_core::{FilterType, LfoWaveform, SynthTables, Waveform, midi_to_freq};
use polyvox_synth::{
    Dx7EnvelopeParams, EnvelopeParams, EnvelopeUnit, FilterSettings, FmAlgorithm, FmInstrument,
    FmOperatorParams, FmPatch, Generator, GeneratorKind, GeneratorSet, Instrument, LfoSettings,
    MixerInput, OscillatorInstrument, OscillatorPatch, OscillatorSettings, SampleData,
    SampleInstrument, SampleZone, Synth,
};

use crate::engine::EngineConfig;
use crate::error::ConfigError;

/// Loads a sample file referenced by a sample patch.
pub type SampleLoader<'a> = dyn FnMut(&Path) -> Result<SampleData, ConfigError> + 'a;

/// Oscillator waveform.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum WaveformConfig {
    /// Sine.
    Sine,
    /// Sawtooth.
    #[default]
    Saw,
    /// Square.
    Square,
    /// Triangle.
    Triangle,
}

impl From<WaveformConfig> for Waveform {
    fn from(config: WaveformConfig) -> Self {
        match config {
            WaveformConfig::Sine => Waveform::Sine,
            WaveformConfig::Saw => Waveform::Saw,
            WaveformConfig::Square => Waveform::Square,
            WaveformConfig::Triangle => Waveform::Triangle,
        }
    }
}

/// Filter response.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FilterTypeConfig {
    /// Two-pole low-pass.
    #[default]
    LowPass,
    /// Two-pole high-pass.
    HighPass,
    /// Band-pass.
    BandPass,
    /// Notch.
    Notch,
    /// Peaking EQ.
    Peak,
    /// Low shelf.
    LowShelf,
    /// High shelf.
    HighShelf,
    /// One-pole low-pass.
    OnePoleLowPass,
    /// One-pole high-pass.
    OnePoleHighPass,
}

impl From<FilterTypeConfig> for FilterType {
    fn from(config: FilterTypeConfig) -> Self {
        match config {
            FilterTypeConfig::LowPass => FilterType::LowPass,
            FilterTypeConfig::HighPass => FilterType::HighPass,
            FilterTypeConfig::BandPass => FilterType::BandPass,
            FilterTypeConfig::Notch => FilterType::Notch,
            FilterTypeConfig::Peak => FilterType::Peak,
            FilterTypeConfig::LowShelf => FilterType::LowShelf,
            FilterTypeConfig::HighShelf => FilterType::HighShelf,
            FilterTypeConfig::OnePoleLowPass => FilterType::OnePoleLowPass,
            FilterTypeConfig::OnePoleHighPass => FilterType::OnePoleHighPass,
        }
    }
}

/// LFO waveform.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LfoWaveformConfig {
    /// Sine.
    #[default]
    Sine,
    /// Triangle.
    Triangle,
    /// Rising ramp.
    SawUp,
    /// Falling ramp.
    SawDown,
    /// Square.
    Square,
    /// Random level per cycle.
    SampleAndHold,
}

impl From<LfoWaveformConfig> for LfoWaveform {
    fn from(config: LfoWaveformConfig) -> Self {
        match config {
            LfoWaveformConfig::Sine => LfoWaveform::Sine,
            LfoWaveformConfig::Triangle => LfoWaveform::Triangle,
            LfoWaveformConfig::SawUp => LfoWaveform::SawUp,
            LfoWaveformConfig::SawDown => LfoWaveform::SawDown,
            LfoWaveformConfig::Square => LfoWaveform::Square,
            LfoWaveformConfig::SampleAndHold => LfoWaveform::SampleAndHold,
        }
    }
}

/// Multi-stage envelope in seconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EnvelopeConfig {
    /// Delay before attack.
    pub delay: f32,
    /// Attack time.
    pub attack: f32,
    /// Hold time.
    pub hold: f32,
    /// Decay time.
    pub decay: f32,
    /// Sustain level, 0 to 1.
    pub sustain: f32,
    /// Release time.
    pub release: f32,
    /// Attack time change at full velocity, in timecents.
    pub velocity_to_attack: f32,
    /// Release time change at full velocity, in timecents.
    pub velocity_to_release: f32,
    /// Ramp in decibels instead of linear gain.
    pub decibel: bool,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            delay: 0.0,
            attack: 0.005,
            hold: 0.0,
            decay: 0.1,
            sustain: 1.0,
            release: 0.1,
            velocity_to_attack: 0.0,
            velocity_to_release: 0.0,
            decibel: false,
        }
    }
}

impl EnvelopeConfig {
    /// Node parameters.
    pub fn to_params(&self) -> EnvelopeParams {
        EnvelopeParams {
            delay: self.delay,
            attack: self.attack,
            hold: self.hold,
            decay: self.decay,
            sustain: self.sustain,
            release: self.release,
            velocity_to_attack: self.velocity_to_attack,
            velocity_to_release: self.velocity_to_release,
            unit: if self.decibel {
                EnvelopeUnit::Decibel
            } else {
                EnvelopeUnit::Linear
            },
            ..EnvelopeParams::default()
        }
    }
}

/// Filter settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FilterConfig {
    /// Response.
    #[serde(rename = "type")]
    pub filter_type: FilterTypeConfig,
    /// Cutoff in Hz.
    pub cutoff: f32,
    /// Resonance.
    pub q: f32,
    /// Gain for peak and shelf responses, in dB.
    pub gain_db: f32,
    /// Cents per key above middle C.
    pub key_track: f32,
    /// Cents at velocity 0 relative to full velocity.
    pub velocity_track: f32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            filter_type: FilterTypeConfig::LowPass,
            cutoff: 20000.0,
            q: 0.707,
            gain_db: 0.0,
            key_track: 0.0,
            velocity_track: 0.0,
        }
    }
}

impl FilterConfig {
    /// Node settings.
    pub fn to_settings(&self) -> FilterSettings {
        FilterSettings {
            filter_type: self.filter_type.into(),
            cutoff: self.cutoff,
            q: self.q,
            gain_db: self.gain_db,
            key_track: self.key_track,
            velocity_track: self.velocity_track,
        }
    }
}

/// LFO settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LfoConfig {
    /// Waveform.
    pub waveform: LfoWaveformConfig,
    /// Rate in Hz.
    pub frequency: f32,
    /// Delay after note start, in seconds.
    pub delay: f32,
}

impl Default for LfoConfig {
    fn default() -> Self {
        Self {
            waveform: LfoWaveformConfig::Sine,
            frequency: 5.0,
            delay: 0.0,
        }
    }
}

impl LfoConfig {
    /// Node settings.
    pub fn to_settings(&self) -> LfoSettings {
        LfoSettings {
            waveform: self.waveform.into(),
            frequency: self.frequency,
            delay: self.delay,
        }
    }
}

/// One table oscillator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OscillatorConfig {
    /// Waveform.
    pub waveform: WaveformConfig,
    /// Detune in cents.
    pub detune: f32,
    /// Mix level.
    pub gain: f32,
}

impl Default for OscillatorConfig {
    fn default() -> Self {
        Self {
            waveform: WaveformConfig::Saw,
            detune: 0.0,
            gain: 1.0,
        }
    }
}

/// Subtractive patch: oscillators into a filter into an amplifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OscillatorPatchConfig {
    /// Patch name.
    pub name: String,
    /// Optional description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Oscillators, mixed.
    pub oscillators: Vec<OscillatorConfig>,
    /// Filter.
    pub filter: FilterConfig,
    /// Filter envelope.
    pub filter_envelope: EnvelopeConfig,
    /// Cutoff offset at full filter envelope, in cents.
    pub filter_env_amount: f32,
    /// Amplitude envelope.
    pub amp_envelope: EnvelopeConfig,
    /// Vibrato LFO.
    pub lfo: LfoConfig,
    /// Pitch swing at full LFO, in cents.
    pub vibrato_depth: f32,
    /// Cutoff swing at full LFO, in cents.
    pub filter_lfo_depth: f32,
    /// Output gain.
    pub gain: f32,
    /// Velocity sensitivity, 0 to 1.
    pub velocity_sensitivity: f32,
}

impl Default for OscillatorPatchConfig {
    fn default() -> Self {
        Self {
            name: "Untitled".to_string(),
            description: None,
            oscillators: vec![
                OscillatorConfig::default(),
                OscillatorConfig {
                    detune: 7.0,
                    ..OscillatorConfig::default()
                },
            ],
            filter: FilterConfig {
                cutoff: 2000.0,
                ..FilterConfig::default()
            },
            filter_envelope: EnvelopeConfig {
                attack: 0.01,
                decay: 0.3,
                sustain: 0.3,
                release: 0.3,
                ..EnvelopeConfig::default()
            },
            filter_env_amount: 2400.0,
            amp_envelope: EnvelopeConfig {
                decay: 0.2,
                sustain: 0.7,
                release: 0.3,
                ..EnvelopeConfig::default()
            },
            lfo: LfoConfig::default(),
            vibrato_depth: 0.0,
            filter_lfo_depth: 0.0,
            gain: 0.5,
            velocity_sensitivity: 1.0,
        }
    }
}

impl OscillatorPatchConfig {
    /// Instrument patch.
    pub fn to_patch(&self) -> OscillatorPatch {
        OscillatorPatch {
            oscillators: self
                .oscillators
                .iter()
                .map(|osc| OscillatorSettings {
                    waveform: osc.waveform.into(),
                    detune: osc.detune,
                    gain: osc.gain,
                })
                .collect(),
            filter: self.filter.to_settings(),
            filter_envelope: self.filter_envelope.to_params(),
            filter_env_amount: self.filter_env_amount,
            amp_envelope: self.amp_envelope.to_params(),
            lfo: self.lfo.to_settings(),
            vibrato_depth: self.vibrato_depth,
            filter_lfo_depth: self.filter_lfo_depth,
            gain: self.gain,
            velocity_sensitivity: self.velocity_sensitivity,
        }
    }
}

/// Four-rate, four-level operator envelope in 0-99 units.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Dx7EnvelopeConfig {
    /// Rates R1..R4.
    pub rates: [u8; 4],
    /// Levels L1..L4.
    pub levels: [u8; 4],
    /// Keyboard rate scaling, 0 to 7.
    pub rate_scaling: u8,
}

impl Default for Dx7EnvelopeConfig {
    fn default() -> Self {
        let params = Dx7EnvelopeParams::default();
        Self {
            rates: params.rates,
            levels: params.levels,
            rate_scaling: params.rate_scaling,
        }
    }
}

/// One FM operator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FmOperatorConfig {
    /// Frequency ratio to the note.
    pub ratio: f32,
    /// Fixed frequency in Hz, overriding `ratio`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed_freq: Option<f32>,
    /// Detune in cents.
    pub detune: f32,
    /// Output level, 0 to 99.
    pub level: u8,
    /// Velocity sensitivity, 0 to 7.
    pub velocity_sensitivity: u8,
    /// Vibrato depth at full LFO, in cents.
    pub lfo_pitch_depth: f32,
    /// Envelope.
    pub envelope: Dx7EnvelopeConfig,
}

impl Default for FmOperatorConfig {
    fn default() -> Self {
        Self {
            ratio: 1.0,
            fixed_freq: None,
            detune: 0.0,
            level: 99,
            velocity_sensitivity: 0,
            lfo_pitch_depth: 0.0,
            envelope: Dx7EnvelopeConfig::default(),
        }
    }
}

impl FmOperatorConfig {
    /// Operator parameters.
    pub fn to_params(&self) -> FmOperatorParams {
        FmOperatorParams {
            ratio: self.ratio,
            fixed_freq: self.fixed_freq,
            detune_cents: self.detune,
            velocity_sensitivity: self.velocity_sensitivity,
            lfo_pitch_depth: self.lfo_pitch_depth,
            envelope: Dx7EnvelopeParams {
                rates: self.envelope.rates,
                levels: self.envelope.levels,
                output_level: self.level,
                rate_scaling: self.envelope.rate_scaling,
            },
        }
    }
}

/// FM patch: operators routed by a built-in algorithm.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FmPatchConfig {
    /// Patch name.
    pub name: String,
    /// Optional description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Operators; the first is operator 0.
    pub operators: Vec<FmOperatorConfig>,
    /// Index into the built-in algorithm table.
    pub algorithm: usize,
    /// Self-feedback, 0 to 7.
    pub feedback: u8,
    /// Shared LFO.
    pub lfo: LfoConfig,
}

impl Default for FmPatchConfig {
    fn default() -> Self {
        Self {
            name: "Untitled".to_string(),
            description: None,
            operators: vec![
                FmOperatorConfig::default(),
                FmOperatorConfig {
                    ratio: 2.0,
                    ..FmOperatorConfig::default()
                },
            ],
            algorithm: 1,
            feedback: 0,
            lfo: LfoConfig::default(),
        }
    }
}

impl FmPatchConfig {
    /// Instrument patch.
    pub fn to_patch(&self) -> FmPatch {
        FmPatch {
            operators: self.operators.iter().map(FmOperatorConfig::to_params).collect(),
            algorithm: FmAlgorithm::builtin(self.algorithm),
            feedback: self.feedback.min(7),
            lfo: self.lfo.to_settings(),
        }
    }
}

/// Waveforms that can stand in for a recorded sample.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GeneratedWave {
    /// Sine.
    Sine,
    /// Sawtooth.
    Saw,
    /// White noise.
    Noise,
}

/// Cycles rendered for a generated sample; the second half loops.
const GENERATED_CYCLES: u32 = 200;

impl GeneratedWave {
    /// Render a sample pitched at `root_key`, with loop points covering
    /// whole cycles of the second half.
    pub fn render(self, root_key: u8, sample_rate: f32) -> (SampleData, u32, u32) {
        let period = (sample_rate / midi_to_freq(f32::from(root_key))).round().max(2.0) as u32;
        let len = period * GENERATED_CYCLES;
        let mut seed = 0x2545_F491_u32;
        let frames: Vec<f32> = (0..len)
            .map(|i| {
                let phase = (i % period) as f32 / period as f32;
                match self {
                    GeneratedWave::Sine => libm::sinf(phase * core::f32::consts::TAU),
                    GeneratedWave::Saw => 2.0 * phase - 1.0,
                    GeneratedWave::Noise => {
                        seed ^= seed << 13;
                        seed ^= seed >> 17;
                        seed ^= seed << 5;
                        seed as f32 / u32::MAX as f32 * 2.0 - 1.0
                    }
                }
            })
            .collect();
        let loop_start = period * (GENERATED_CYCLES / 2);
        (SampleData::new(frames, sample_rate), loop_start, len)
    }
}

/// Where a zone's audio comes from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum SampleSource {
    /// WAV file, relative to the current directory.
    Wav(PathBuf),
    /// Built-in waveform, for asset-free patches.
    Generated(GeneratedWave),
}

/// Loop behavior of a zone.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LoopModeConfig {
    /// Play once.
    #[default]
    None,
    /// Loop while the voice sounds.
    Continuous,
    /// Loop while held, then play out.
    Sustain,
}

impl LoopModeConfig {
    fn sample_modes(self) -> i32 {
        match self {
            LoopModeConfig::None => 0,
            LoopModeConfig::Continuous => 1,
            LoopModeConfig::Sustain => 3,
        }
    }
}

/// One key/velocity zone of a sample patch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SampleZoneConfig {
    /// Audio source.
    pub source: SampleSource,
    /// Recorded pitch.
    #[serde(default = "default_root_key")]
    pub root_key: u8,
    /// Inclusive key range.
    #[serde(default = "full_range")]
    pub key_range: [u8; 2],
    /// Inclusive velocity range.
    #[serde(default = "full_range")]
    pub velocity_range: [u8; 2],
    /// Tuning in cents.
    #[serde(default)]
    pub tune: i32,
    /// Loop behavior.
    #[serde(default)]
    pub loop_mode: LoopModeConfig,
    /// Loop start frame; generated sources pick their own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loop_start: Option<u32>,
    /// Loop end frame.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loop_end: Option<u32>,
    /// Raw generator amounts by name, applied last.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub generators: BTreeMap<String, i32>,
}

fn default_root_key() -> u8 {
    60
}

fn full_range() -> [u8; 2] {
    [0, 127]
}

/// Parse named generator amounts into a set.
pub fn parse_generators(named: &BTreeMap<String, i32>) -> Result<GeneratorSet, ConfigError> {
    let mut set = GeneratorSet::new();
    for (name, &amount) in named {
        let kind = GeneratorKind::from_name(name)
            .ok_or_else(|| ConfigError::UnknownGenerator(name.clone()))?;
        set.set(kind, amount);
    }
    Ok(set)
}

impl SampleZoneConfig {
    /// Local generator set: ranges, tuning, and loop mode, then the raw
    /// overrides.
    pub fn generator_set(&self) -> Result<GeneratorSet, ConfigError> {
        let mut set = GeneratorSet::from_generators(&[
            Generator::key_range(self.key_range[0], self.key_range[1]),
            Generator::velocity_range(self.velocity_range[0], self.velocity_range[1]),
            Generator::new(GeneratorKind::CoarseTune, self.tune / 100),
            Generator::new(GeneratorKind::FineTune, self.tune % 100),
            Generator::new(GeneratorKind::SampleModes, self.loop_mode.sample_modes()),
        ]);
        let overrides = parse_generators(&self.generators)?;
        for kind in GeneratorKind::ALL {
            if let Some(amount) = overrides.get(kind) {
                set.set(kind, amount);
            }
        }
        Ok(set)
    }

    /// Build the zone, loading its audio through `loader` when it is a file.
    pub fn to_zone(
        &self,
        sample_rate: f32,
        loader: &mut SampleLoader<'_>,
    ) -> Result<SampleZone, ConfigError> {
        let (data, default_loop) = match &self.source {
            SampleSource::Wav(path) => (loader(path)?, None),
            SampleSource::Generated(wave) => {
                let (data, start, end) = wave.render(self.root_key, sample_rate);
                (data, Some((start, end)))
            }
        };
        let mut zone = SampleZone::new(data, self.root_key, self.generator_set()?);
        let (start, end) = default_loop.unwrap_or((zone.info.loop_start, zone.info.loop_end));
        zone = zone.with_loop(
            self.loop_start.unwrap_or(start),
            self.loop_end.unwrap_or(end),
        );
        Ok(zone)
    }
}

/// Sample patch: zones over recorded or generated audio.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SamplePatchConfig {
    /// Patch name.
    pub name: String,
    /// Optional description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Rate generated sources are rendered at.
    pub sample_rate: u32,
    /// Generator amounts every zone inherits unless it sets its own.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub global: BTreeMap<String, i32>,
    /// Zones, searched in order.
    pub zones: Vec<SampleZoneConfig>,
}

impl Default for SamplePatchConfig {
    fn default() -> Self {
        Self {
            name: "Untitled".to_string(),
            description: None,
            sample_rate: 44100,
            global: BTreeMap::new(),
            zones: Vec::new(),
        }
    }
}

impl SamplePatchConfig {
    /// Build the instrument, loading file sources through `loader`.
    pub fn to_instrument(
        &self,
        loader: &mut SampleLoader<'_>,
    ) -> Result<SampleInstrument, ConfigError> {
        let global = parse_generators(&self.global)?;
        let zones = self
            .zones
            .iter()
            .map(|zone| zone.to_zone(self.sample_rate as f32, loader))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(SampleInstrument::new(&global, zones))
    }
}

/// Which channels and tracks a synth answers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Routing {
    /// Bit per MIDI channel.
    pub channel_mask: u16,
    /// Bit per sequencer track.
    pub track_mask: u64,
}

impl Default for Routing {
    fn default() -> Self {
        Self {
            channel_mask: u16::MAX,
            track_mask: u64::MAX,
        }
    }
}

/// A patch of any instrument kind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PatchConfig {
    /// Subtractive oscillator patch.
    Oscillator(OscillatorPatchConfig),
    /// FM patch.
    Fm(FmPatchConfig),
    /// Sample patch.
    Sample(SamplePatchConfig),
}

impl PatchConfig {
    /// Load a patch from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml(&content)
    }

    /// Parse a patch from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Save the patch to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_toml()?).map_err(|e| ConfigError::write_file(path, e))
    }

    /// Convert the patch to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Patch name.
    pub fn name(&self) -> &str {
        match self {
            PatchConfig::Oscillator(p) => &p.name,
            PatchConfig::Fm(p) => &p.name,
            PatchConfig::Sample(p) => &p.name,
        }
    }

    /// Patch description.
    pub fn description(&self) -> Option<&str> {
        match self {
            PatchConfig::Oscillator(p) => p.description.as_deref(),
            PatchConfig::Fm(p) => p.description.as_deref(),
            PatchConfig::Sample(p) => p.description.as_deref(),
        }
    }

    /// Instrument kind as written in the `type` key.
    pub fn kind(&self) -> &'static str {
        match self {
            PatchConfig::Oscillator(_) => "oscillator",
            PatchConfig::Fm(_) => "fm",
            PatchConfig::Sample(_) => "sample",
        }
    }

    /// Build a voice pool playing this patch.
    pub fn build_synth(
        &self,
        tables: &SynthTables,
        engine: &EngineConfig,
        routing: Routing,
        loader: &mut SampleLoader<'_>,
    ) -> Result<Box<dyn MixerInput>, ConfigError> {
        match self {
            PatchConfig::Oscillator(p) => {
                boxed_synth(OscillatorInstrument::new(p.to_patch()), tables, engine, routing)
            }
            PatchConfig::Fm(p) => boxed_synth(FmInstrument::new(p.to_patch()), tables, engine, routing),
            PatchConfig::Sample(p) => {
                boxed_synth(p.to_instrument(loader)?, tables, engine, routing)
            }
        }
    }
}

fn boxed_synth<I: Instrument + 'static>(
    instrument: I,
    tables: &SynthTables,
    engine: &EngineConfig,
    routing: Routing,
) -> Result<Box<dyn MixerInput>, ConfigError> {
    let mut synth = Synth::new(instrument, tables, engine.sample_rate_hz(), engine.polyphony)?
        .with_stealing(engine.stealing.into())
        .with_channel_mask(routing.channel_mask)
        .with_track_mask(routing.track_mask);
    synth.set_master_volume(engine.master_volume_db);
    Ok(Box::new(synth))
}

/// Loader for patches that reference no files.
pub fn no_files(path: &Path) -> Result<SampleData, ConfigError> {
    Err(ConfigError::sample_load(path, "file samples are not available here"))
}
