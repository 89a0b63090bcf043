//! Engine, patch, and song validation.
//!
//! Parsing only checks shape; these functions check that values are in the
//! ranges the engine can honor and that names resolve. Every problem is
//! collected, so a single call reports all of them.
//!
//! # Example
//!
//! ```rust
//! use polyvox_config::{EngineConfig, ValidationError, validate_engine};
//!
//! let config = EngineConfig { polyphony: 0, block_size: 0, ..EngineConfig::default() };
//! match validate_engine(&config) {
//!     Err(ValidationError::Multiple(errors)) => assert_eq!(errors.len(), 2),
//!     other => panic!("unexpected: {other:?}"),
//! }
//! ```

use thiserror::Error;

use polyvox_synth::{FmAlgorithm, GeneratorKind, MAX_OPERATORS};

use crate::engine::EngineConfig;
use crate::patch::{
    EnvelopeConfig, FilterConfig, FmPatchConfig, LfoConfig, OscillatorPatchConfig, PatchConfig,
    SamplePatchConfig,
};
use crate::song::{EventConfig, SongConfig};

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// Value out of range.
    #[error("'{field}' value {value} out of range [{min}, {max}]")]
    OutOfRange {
        /// Path of the offending field.
        field: String,
        /// The value that was out of range.
        value: f64,
        /// Minimum allowed value.
        min: f64,
        /// Maximum allowed value.
        max: f64,
    },

    /// Value has the right type but makes no sense.
    #[error("invalid '{field}': {reason}")]
    Invalid {
        /// Path of the offending field.
        field: String,
        /// What is wrong with it.
        reason: String,
    },

    /// An instrument names a patch that does not exist.
    #[error("unknown patch: {0}")]
    UnknownPatch(String),

    /// A generator name is not recognized.
    #[error("unknown generator '{name}' in '{field}'")]
    UnknownGenerator {
        /// Path of the generator table.
        field: String,
        /// The unrecognized name.
        name: String,
    },

    /// Multiple validation errors.
    #[error("multiple validation errors: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Collects errors under a field path prefix.
struct Checker<'a> {
    prefix: String,
    errors: &'a mut Vec<ValidationError>,
}

impl<'a> Checker<'a> {
    fn new(prefix: impl Into<String>, errors: &'a mut Vec<ValidationError>) -> Self {
        Self {
            prefix: prefix.into(),
            errors,
        }
    }

    fn field(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}.{name}", self.prefix)
        }
    }

    fn nested(&mut self, name: &str) -> Checker<'_> {
        let prefix = self.field(name);
        Checker {
            prefix,
            errors: &mut *self.errors,
        }
    }

    fn range(&mut self, name: &str, value: impl Into<f64>, min: f64, max: f64) {
        let value = value.into();
        if !(min..=max).contains(&value) {
            self.errors.push(ValidationError::OutOfRange {
                field: self.field(name),
                value,
                min,
                max,
            });
        }
    }

    fn invalid(&mut self, name: &str, reason: impl Into<String>) {
        self.errors.push(ValidationError::Invalid {
            field: self.field(name),
            reason: reason.into(),
        });
    }

    fn generators<'n>(&mut self, name: &str, names: impl IntoIterator<Item = &'n String>) {
        for generator in names {
            if GeneratorKind::from_name(generator).is_none() {
                self.errors.push(ValidationError::UnknownGenerator {
                    field: self.field(name),
                    name: generator.clone(),
                });
            }
        }
    }
}

fn finish(mut errors: Vec<ValidationError>) -> ValidationResult<()> {
    match errors.len() {
        0 => Ok(()),
        1 => match errors.pop() {
            Some(e) => Err(e),
            None => Ok(()),
        },
        _ => Err(ValidationError::Multiple(errors)),
    }
}

/// Validate engine settings.
pub fn validate_engine(config: &EngineConfig) -> ValidationResult<()> {
    let mut errors = Vec::new();
    let mut check = Checker::new("", &mut errors);
    check.range("sample_rate", config.sample_rate, 8000.0, 192_000.0);
    check.range("block_size", config.block_size as f64, 1.0, 8192.0);
    check.range("polyphony", config.polyphony as f64, 1.0, 256.0);
    check.range("master_volume_db", config.master_volume_db, -96.0, 24.0);
    finish(errors)
}

/// Validate a patch of any kind.
pub fn validate_patch(patch: &PatchConfig) -> ValidationResult<()> {
    let mut errors = Vec::new();
    check_patch(&mut Checker::new("", &mut errors), patch);
    finish(errors)
}

/// Validate a song, the patches it defines, and the patches its
/// instruments name.
pub fn validate_song(song: &SongConfig) -> ValidationResult<()> {
    let mut errors = Vec::new();
    let mut check = Checker::new("", &mut errors);

    if song.ticks_per_beat == 0 {
        check.invalid("ticks_per_beat", "must be at least 1");
    }
    if let Some(bpm) = song.tempo_bpm {
        check.range("tempo_bpm", bpm, 1.0, 1000.0);
    }

    for (i, patch) in song.patches.iter().enumerate() {
        check_patch(&mut check.nested(&format!("patches[{i}]")), patch);
    }

    for (i, instrument) in song.instruments.iter().enumerate() {
        let mut check = check.nested(&format!("instruments[{i}]"));
        if song.resolve_patch(&instrument.patch).is_err() {
            check.errors.push(ValidationError::UnknownPatch(instrument.patch.clone()));
        }
        for &channel in &instrument.channels {
            check.range("channels", channel, 0.0, 15.0);
        }
        for &track in &instrument.tracks {
            check.range("tracks", track, 0.0, 63.0);
        }
        if let Some(polyphony) = instrument.polyphony {
            check.range("polyphony", polyphony as f64, 1.0, 256.0);
        }
        check.range("gain", instrument.gain, 0.0, 4.0);
        check.range("pan", instrument.pan, -1.0, 1.0);
    }

    for (t, track) in song.tracks.iter().enumerate() {
        for (e, event) in track.events.iter().enumerate() {
            check_event(
                &mut check.nested(&format!("tracks[{t}].events[{e}]")),
                event,
            );
        }
    }

    finish(errors)
}

fn check_event(check: &mut Checker<'_>, event: &EventConfig) {
    if let Some(channel) = event.channel() {
        check.range("channel", channel, 0.0, 15.0);
    }
    match *event {
        EventConfig::Note {
            note,
            velocity,
            duration,
            ..
        } => {
            check.range("note", note, 0.0, 127.0);
            check.range("velocity", velocity, 1.0, 127.0);
            if duration == 0 {
                check.invalid("duration", "must be at least one tick");
            }
        }
        EventConfig::NoteOn { note, velocity, .. } => {
            check.range("note", note, 0.0, 127.0);
            check.range("velocity", velocity, 0.0, 127.0);
        }
        EventConfig::NoteOff { note, .. } => check.range("note", note, 0.0, 127.0),
        EventConfig::Controller {
            controller, value, ..
        } => {
            check.range("controller", controller, 0.0, 127.0);
            check.range("value", value, 0.0, 127.0);
        }
        EventConfig::PitchBend { value, .. } => check.range("value", value, 0.0, 16383.0),
        EventConfig::ProgramChange { program, .. } => check.range("program", program, 0.0, 127.0),
        EventConfig::Tempo { bpm, .. } => check.range("bpm", bpm, 1.0, 1000.0),
    }
}

fn check_patch(check: &mut Checker<'_>, patch: &PatchConfig) {
    if patch.name().trim().is_empty() {
        check.invalid("name", "must not be empty");
    }
    match patch {
        PatchConfig::Oscillator(p) => check_oscillator(check, p),
        PatchConfig::Fm(p) => check_fm(check, p),
        PatchConfig::Sample(p) => check_sample(check, p),
    }
}

fn check_envelope(check: &mut Checker<'_>, env: &EnvelopeConfig) {
    for (name, time) in [
        ("delay", env.delay),
        ("attack", env.attack),
        ("hold", env.hold),
        ("decay", env.decay),
        ("release", env.release),
    ] {
        check.range(name, time, 0.0, 100.0);
    }
    check.range("sustain", env.sustain, 0.0, 1.0);
    check.range("velocity_to_attack", env.velocity_to_attack, -12000.0, 12000.0);
    check.range("velocity_to_release", env.velocity_to_release, -12000.0, 12000.0);
}

fn check_filter(check: &mut Checker<'_>, filter: &FilterConfig) {
    check.range("cutoff", filter.cutoff, 10.0, 22000.0);
    check.range("q", filter.q, 0.05, 40.0);
    check.range("gain_db", filter.gain_db, -48.0, 48.0);
    check.range("key_track", filter.key_track, -1200.0, 1200.0);
    check.range("velocity_track", filter.velocity_track, -9600.0, 9600.0);
}

fn check_lfo(check: &mut Checker<'_>, lfo: &LfoConfig) {
    check.range("frequency", lfo.frequency, 0.0, 100.0);
    check.range("delay", lfo.delay, 0.0, 20.0);
}

fn check_oscillator(check: &mut Checker<'_>, p: &OscillatorPatchConfig) {
    if p.oscillators.is_empty() {
        check.invalid("oscillators", "need at least one oscillator");
    }
    for (i, osc) in p.oscillators.iter().enumerate() {
        let mut check = check.nested(&format!("oscillators[{i}]"));
        check.range("detune", osc.detune, -2400.0, 2400.0);
        check.range("gain", osc.gain, 0.0, 4.0);
    }
    check_filter(&mut check.nested("filter"), &p.filter);
    check_envelope(&mut check.nested("filter_envelope"), &p.filter_envelope);
    check_envelope(&mut check.nested("amp_envelope"), &p.amp_envelope);
    check_lfo(&mut check.nested("lfo"), &p.lfo);
    check.range("filter_env_amount", p.filter_env_amount, -12000.0, 12000.0);
    check.range("vibrato_depth", p.vibrato_depth, 0.0, 1200.0);
    check.range("filter_lfo_depth", p.filter_lfo_depth, 0.0, 4800.0);
    check.range("gain", p.gain, 0.0, 4.0);
    check.range("velocity_sensitivity", p.velocity_sensitivity, 0.0, 1.0);
}

fn check_fm(check: &mut Checker<'_>, p: &FmPatchConfig) {
    check.range("operators", p.operators.len() as f64, 1.0, MAX_OPERATORS as f64);
    check.range(
        "algorithm",
        p.algorithm as f64,
        0.0,
        (FmAlgorithm::BUILTIN.len() - 1) as f64,
    );
    check.range("feedback", p.feedback, 0.0, 7.0);
    check_lfo(&mut check.nested("lfo"), &p.lfo);
    for (i, op) in p.operators.iter().enumerate() {
        let mut check = check.nested(&format!("operators[{i}]"));
        check.range("ratio", op.ratio, 0.0, 64.0);
        if let Some(freq) = op.fixed_freq {
            check.range("fixed_freq", freq, 0.0, 20000.0);
        }
        check.range("level", op.level, 0.0, 99.0);
        check.range("velocity_sensitivity", op.velocity_sensitivity, 0.0, 7.0);
        let mut env = check.nested("envelope");
        for (r, &rate) in op.envelope.rates.iter().enumerate() {
            env.range(&format!("rates[{r}]"), rate, 0.0, 99.0);
        }
        for (l, &level) in op.envelope.levels.iter().enumerate() {
            env.range(&format!("levels[{l}]"), level, 0.0, 99.0);
        }
        env.range("rate_scaling", op.envelope.rate_scaling, 0.0, 7.0);
    }
}

fn check_sample(check: &mut Checker<'_>, p: &SamplePatchConfig) {
    check.range("sample_rate", p.sample_rate, 8000.0, 192_000.0);
    check.generators("global", p.global.keys());
    if p.zones.is_empty() {
        check.invalid("zones", "need at least one zone");
    }
    for (i, zone) in p.zones.iter().enumerate() {
        let mut check = check.nested(&format!("zones[{i}]"));
        check.range("root_key", zone.root_key, 0.0, 127.0);
        for (name, [lo, hi]) in [
            ("key_range", zone.key_range),
            ("velocity_range", zone.velocity_range),
        ] {
            if lo > hi || hi > 127 {
                check.invalid(name, format!("[{lo}, {hi}] is not an ascending MIDI range"));
            }
        }
        if let (Some(start), Some(end)) = (zone.loop_start, zone.loop_end)
            && start >= end
        {
            check.invalid("loop_start", format!("{start} is not before loop end {end}"));
        }
        check.generators("generators", zone.generators.keys());
    }
}
