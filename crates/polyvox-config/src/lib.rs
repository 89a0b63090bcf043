//! Configuration for the polyvox synthesis engine.
//!
//! Engine settings, patches, and songs are TOML files that this crate
//! parses, validates, and turns into ready-to-render engine objects.
//!
//! # Features
//!
//! - **Engine**: sample rate, block size, polyphony, and voice stealing
//! - **Patches**: oscillator, FM, and sample instruments, tagged by `type`
//! - **Songs**: tracks of timed events bound to patches through instruments
//! - **Validation**: range and name checks that report every problem at once
//! - **Factory Patches**: built-in patches usable by name from any song
//!
//! # Example
//!
//! ```rust
//! use polyvox_config::{EngineConfig, SongConfig, no_files, validate_song};
//! use polyvox_core::SynthTables;
//!
//! let song = SongConfig::from_toml(r#"
//! tempo_bpm = 90.0
//!
//! [[tracks]]
//! events = [{ type = "note", tick = 0, note = 60, duration = 480 }]
//!
//! [[instruments]]
//! patch = "fm_epiano"
//! "#).unwrap();
//! validate_song(&song).unwrap();
//!
//! let tables = SynthTables::new();
//! let mut player = song.build_player(&EngineConfig::default(), &tables, &mut no_files).unwrap();
//! let (left, _right) = player.render_to_end(0.5);
//! assert!(!left.is_empty());
//! ```
//!
//! Sample patches may reference WAV files. This crate does not decode audio
//! itself: callers pass a loader closure, typically backed by `polyvox-io`.

mod engine;
mod error;
mod patch;
mod song;

/// Engine, patch, and song validation.
pub mod validation;

/// Factory patches bundled with the library.
pub mod factory_patches;

pub use engine::{EngineConfig, StealingConfig};
pub use error::ConfigError;
pub use factory_patches::{
    FACTORY_PATCH_NAMES, factory_patch_names, factory_patches, get_factory_patch,
    is_factory_patch,
};
pub use patch::{
    Dx7EnvelopeConfig, EnvelopeConfig, FilterConfig, FilterTypeConfig, FmOperatorConfig,
    FmPatchConfig, GeneratedWave, LfoConfig, LfoWaveformConfig, LoopModeConfig, OscillatorConfig,
    OscillatorPatchConfig, PatchConfig, Routing, SampleLoader, SamplePatchConfig, SampleSource,
    SampleZoneConfig, WaveformConfig, no_files, parse_generators,
};
pub use song::{EventConfig, InstrumentConfig, SongConfig, TrackConfig};
pub use validation::{
    ValidationError, ValidationResult, validate_engine, validate_patch, validate_song,
};
