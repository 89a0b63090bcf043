//! Integration tests for polyvox-config.
//!
//! These tests go from files on disk to rendered audio.

use polyvox_config::{
    ConfigError, EngineConfig, InstrumentConfig, PatchConfig, SongConfig, ValidationError,
    factory_patches, no_files, validate_patch, validate_song,
};
use polyvox_core::SynthTables;
use polyvox_synth::SampleData;
use std::path::Path;
use tempfile::TempDir;

const DEMO_SONG: &str = r#"
name = "Demo"
ticks_per_beat = 480
tempo_bpm = 140.0

[[tracks]]
name = "chords"
events = [
    { type = "note", tick = 0, note = 60, duration = 960 },
    { type = "note", tick = 0, note = 64, duration = 960 },
    { type = "note", tick = 0, note = 67, duration = 960 },
    { type = "pitch_bend", tick = 480, value = 9000 },
]

[[tracks]]
name = "bass"
events = [
    { type = "note", tick = 0, channel = 1, note = 36, duration = 240 },
    { type = "note", tick = 480, channel = 1, note = 43, duration = 240 },
]

[[instruments]]
patch = "warm_pad"
channels = [0]

[[instruments]]
patch = "Saw Bass"
channels = [1]
gain = 0.7
pan = -0.3
"#;

#[test]
fn test_song_file_renders() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("demo.toml");
    std::fs::write(&path, DEMO_SONG).unwrap();

    let song = SongConfig::load(&path).unwrap();
    validate_song(&song).expect("demo song should validate");

    let tables = SynthTables::new();
    let engine = EngineConfig::default();
    let mut player = song.build_player(&engine, &tables, &mut no_files).unwrap();
    let (left, right) = player.render_to_end(1.0);

    // 960 ticks at 140 BPM
    let song_frames = (960.0 / 480.0 * 60.0 / 140.0 * 44100.0) as usize;
    assert!(left.len() >= song_frames);
    assert_eq!(left.len(), right.len());
    assert!(left.iter().all(|s| s.is_finite()));
    assert!(left.iter().any(|s| s.abs() > 0.01));
}

#[test]
fn test_song_save_load_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("song.toml");

    let song = SongConfig::from_toml(DEMO_SONG).unwrap();
    song.save(&path).unwrap();
    let loaded = SongConfig::load(&path).unwrap();
    assert_eq!(loaded, song);
}

#[test]
fn test_patch_files_round_trip() {
    let dir = TempDir::new().unwrap();
    for patch in factory_patches() {
        let path = dir.path().join(format!("{}.toml", patch.name()));
        patch.save(&path).unwrap();
        let loaded = PatchConfig::load(&path).unwrap();
        assert_eq!(loaded, patch, "patch '{}' changed on disk", patch.name());
        assert!(validate_patch(&loaded).is_ok());
    }
}

#[test]
fn test_song_local_patch_overrides_factory() {
    let mut song = SongConfig::from_toml(DEMO_SONG).unwrap();
    let custom = PatchConfig::from_toml(
        r#"
type = "fm"
name = "warm_pad"
algorithm = 6
"#,
    )
    .unwrap();
    song.patches.push(custom);
    assert_eq!(song.resolve_patch("warm_pad").unwrap().kind(), "fm");
    assert!(validate_song(&song).is_ok());
}

#[test]
fn test_wav_zone_goes_through_loader() {
    let patch = PatchConfig::from_toml(
        r#"
type = "sample"
name = "Kit"

[[zones]]
source = { wav = "kick.wav" }
root_key = 36
key_range = [36, 36]
"#,
    )
    .unwrap();

    let mut requested = Vec::new();
    let mut loader = |path: &Path| -> Result<SampleData, ConfigError> {
        requested.push(path.to_path_buf());
        Ok(SampleData::new(vec![0.5; 2000], 44100.0))
    };
    let tables = SynthTables::new();
    let synth = patch.build_synth(
        &tables,
        &EngineConfig::default(),
        Default::default(),
        &mut loader,
    );
    assert!(synth.is_ok());
    assert_eq!(requested, vec![Path::new("kick.wav").to_path_buf()]);

    // Without a loader the same patch fails with the file name
    let err = patch
        .build_synth(&tables, &EngineConfig::default(), Default::default(), &mut no_files)
        .err()
        .unwrap();
    assert!(matches!(err, ConfigError::SampleLoad { .. }));
    assert!(err.to_string().contains("kick.wav"));
}

#[test]
fn test_missing_patch_is_reported() {
    let mut song = SongConfig::from_toml(DEMO_SONG).unwrap();
    song.instruments.push(InstrumentConfig::new("theremin"));
    assert_eq!(
        validate_song(&song),
        Err(ValidationError::UnknownPatch("theremin".to_string()))
    );
    let tables = SynthTables::new();
    let err = song
        .build_player(&EngineConfig::default(), &tables, &mut no_files)
        .err()
        .unwrap();
    assert!(matches!(err, ConfigError::PatchNotFound(name) if name == "theremin"));
}

#[test]
fn test_missing_file_error() {
    let err = SongConfig::load("/nonexistent/song.toml").unwrap_err();
    assert!(matches!(err, ConfigError::ReadFile { .. }));
}
