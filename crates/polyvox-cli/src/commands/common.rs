//! Shared CLI helpers used across multiple commands.

use indicatif::{ProgressBar, ProgressStyle};
use polyvox_config::{ConfigError, EngineConfig, PatchConfig, get_factory_patch, validate_engine};
use polyvox_io::{SampleData, StereoSamples, WavSpec, write_wav_stereo};
use std::path::{Path, PathBuf};

/// Load a patch by factory name or TOML path.
pub fn load_patch(name: &str) -> anyhow::Result<PatchConfig> {
    if let Some(patch) = get_factory_patch(name) {
        return Ok(patch);
    }

    let path = PathBuf::from(name);
    if path.exists() {
        return Ok(PatchConfig::load(&path)?);
    }

    anyhow::bail!(
        "Patch '{}' not found. Use 'polyvox patches' to see factory patches.",
        name
    )
}

/// Load engine settings from a file, or defaults, then apply a sample
/// rate override.
pub fn load_engine(path: Option<&Path>, sample_rate: Option<u32>) -> anyhow::Result<EngineConfig> {
    let mut engine = match path {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(rate) = sample_rate {
        engine.sample_rate = rate;
    }
    validate_engine(&engine)?;
    Ok(engine)
}

/// Sample loader resolving relative paths against `base`.
pub fn wav_loader(base: Option<&Path>) -> impl FnMut(&Path) -> Result<SampleData, ConfigError> {
    let base = base.map(Path::to_path_buf);
    move |path: &Path| {
        let resolved = match &base {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        };
        polyvox_io::load_sample(&resolved).map_err(|e| ConfigError::sample_load(resolved, e))
    }
}

/// Progress bar over a frame count.
pub fn frame_progress(frames: u64) -> ProgressBar {
    let pb = ProgressBar::new(frames);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} frames ({eta})")
    {
        pb.set_style(style.progress_chars("##-"));
    }
    pb
}

/// Write a render and print a one-line summary.
pub fn write_output(
    path: &Path,
    rendered: &StereoSamples,
    sample_rate: u32,
    bit_depth: u16,
) -> anyhow::Result<()> {
    if !matches!(bit_depth, 16 | 24 | 32) {
        anyhow::bail!("Unsupported bit depth {bit_depth} (expected 16, 24, or 32)");
    }
    let spec = WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: bit_depth,
    };
    write_wav_stereo(path, rendered, spec)?;

    let peak = rendered.peak();
    let peak_db = if peak > 0.0 {
        20.0 * peak.log10()
    } else {
        f32::NEG_INFINITY
    };
    println!(
        "Wrote {} ({:.2}s, peak {:.1} dBFS)",
        path.display(),
        rendered.len() as f32 / sample_rate as f32,
        peak_db
    );
    if peak > 1.0 {
        println!("  warning: output clips; lower master_volume_db or instrument gain");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_patch_by_name() {
        assert_eq!(load_patch("fm_bell").unwrap().kind(), "fm");
        let err = load_patch("no_such_patch").unwrap_err();
        assert!(err.to_string().contains("polyvox patches"));
    }

    #[test]
    fn test_load_engine_override() {
        let engine = load_engine(None, Some(48000)).unwrap();
        assert_eq!(engine.sample_rate, 48000);
        assert!(load_engine(None, Some(100)).is_err());
    }

    #[test]
    fn test_wav_loader_reports_resolved_path() {
        let mut loader = wav_loader(Some(Path::new("/songs")));
        let err = loader(Path::new("kick.wav")).unwrap_err();
        assert!(err.to_string().contains("/songs/kick.wav"), "got: {err}");
    }
}
