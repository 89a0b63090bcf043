//! Integration tests for polyvox-cli.
//!
//! Runs the built binary against the demo songs and temporary files.

use polyvox_io::{WavFormat, read_wav_info, read_wav_stereo};
use std::path::PathBuf;
use std::process::Command;
use tempfile::TempDir;

/// Helper to get the path to the `polyvox` binary built by cargo.
fn polyvox_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_polyvox"))
}

fn demo(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../demos")
        .join(name)
}

// ---------------------------------------------------------------------------
// `polyvox patches`
// ---------------------------------------------------------------------------

#[test]
fn cli_patches_lists_factory_patches() {
    let output = polyvox_bin()
        .arg("patches")
        .output()
        .expect("failed to run polyvox patches");
    assert!(output.status.success(), "polyvox patches failed");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Factory Patches"));
    for name in polyvox_config::FACTORY_PATCH_NAMES {
        assert!(stdout.contains(name), "listing should contain '{name}'");
    }
}

#[test]
fn cli_patches_show_prints_toml() {
    let output = polyvox_bin()
        .args(["patches", "--show", "fm_bell"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let patch = polyvox_config::PatchConfig::from_toml(&stdout).expect("output should parse");
    assert_eq!(patch.name(), "FM Bell");
}

// ---------------------------------------------------------------------------
// `polyvox tone`
// ---------------------------------------------------------------------------

#[test]
fn cli_tone_writes_wav() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("tone.wav");
    let output = polyvox_bin()
        .args(["tone", "--patch", "pluck", "--note", "57", "--seconds", "0.25"])
        .args(["--tail", "0.5", "--bit-depth", "32", "-o"])
        .arg(&out)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let info = read_wav_info(&out).unwrap();
    assert_eq!(info.channels, 2);
    assert_eq!(info.format, WavFormat::IeeeFloat);
    assert!(info.duration_secs >= 0.25 && info.duration_secs <= 0.75 + 1e-3);

    let (samples, _) = read_wav_stereo(&out).unwrap();
    assert!(samples.peak() > 0.01, "tone should not be silent");
}

#[test]
fn cli_tone_unknown_patch_fails() {
    let output = polyvox_bin()
        .args(["tone", "--patch", "kazoo"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("kazoo"));
}

// ---------------------------------------------------------------------------
// `polyvox render` and `polyvox info`
// ---------------------------------------------------------------------------

#[test]
fn cli_render_demo_song() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("demo.wav");
    let output = polyvox_bin()
        .arg("render")
        .arg(demo("two_hands.toml"))
        .arg("--engine")
        .arg(demo("engine.toml"))
        .args(["--tail", "1.0", "-o"])
        .arg(&out)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let info = read_wav_info(&out).unwrap();
    assert_eq!(info.sample_rate, 48000);
    assert_eq!(info.format, WavFormat::Pcm);
    // 1920 ticks at 96 BPM then 1920 at 84 BPM
    let song_secs = 4.0 * 60.0 / 96.0 + 4.0 * 60.0 / 84.0;
    assert!(info.duration_secs >= song_secs, "{}", info.duration_secs);
    assert!(info.duration_secs <= song_secs + 1.01, "{}", info.duration_secs);
}

#[test]
fn cli_render_sample_rate_override() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("demo.wav");
    let output = polyvox_bin()
        .arg("render")
        .arg(demo("two_hands.toml"))
        .args(["--sample-rate", "22050", "--tail", "0", "-o"])
        .arg(&out)
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(read_wav_info(&out).unwrap().sample_rate, 22050);
}

#[test]
fn cli_info_reports_duration() {
    let output = polyvox_bin()
        .arg("info")
        .arg(demo("two_hands.toml"))
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Two Hands"));
    assert!(stdout.contains("0:05.357"), "got:\n{stdout}");
    assert!(stdout.contains("84.00 BPM"));
    assert!(stdout.contains("fm_bell"));
    assert!(!stdout.contains("Problems"));
}

#[test]
fn cli_render_missing_file_fails() {
    let output = polyvox_bin()
        .args(["render", "/nonexistent/song.toml"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to read file"));
}
