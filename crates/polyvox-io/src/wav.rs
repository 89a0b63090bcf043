//! WAV files: rendered output on the way out, sample assets on the way in.

use crate::{Error, Result};
use hound::{SampleFormat, WavReader, WavWriter};
use polyvox_synth::SampleData;
use std::path::Path;

/// Sample encoding of a WAV file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WavFormat {
    /// Integer PCM.
    Pcm,
    /// 32-bit float.
    IeeeFloat,
}

/// Header fields of a WAV file.
#[derive(Debug, Clone)]
pub struct WavInfo {
    /// Channel count.
    pub channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Bit depth per sample.
    pub bits_per_sample: u16,
    /// Frames per channel.
    pub num_frames: u64,
    /// Duration in seconds.
    pub duration_secs: f64,
    /// Encoding.
    pub format: WavFormat,
}

/// Read only the header of a WAV file.
pub fn read_wav_info<P: AsRef<Path>>(path: P) -> Result<WavInfo> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let num_frames = u64::from(reader.duration());
    let duration_secs = num_frames as f64 / f64::from(spec.sample_rate);

    let format = match spec.sample_format {
        SampleFormat::Float => WavFormat::IeeeFloat,
        SampleFormat::Int => WavFormat::Pcm,
    };

    Ok(WavInfo {
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        bits_per_sample: spec.bits_per_sample,
        num_frames,
        duration_secs,
        format,
    })
}

/// Layout of a WAV file to write, or of one that was read.
///
/// 32-bit files are written as float; other depths as integer PCM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavSpec {
    /// Channel count. The writers override this.
    pub channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Bit depth per sample (16, 24, or 32).
    pub bits_per_sample: u16,
}

impl Default for WavSpec {
    fn default() -> Self {
        Self {
            channels: 2,
            sample_rate: 44100,
            bits_per_sample: 16,
        }
    }
}

impl From<hound::WavSpec> for WavSpec {
    fn from(spec: hound::WavSpec) -> Self {
        Self {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            bits_per_sample: spec.bits_per_sample,
        }
    }
}

impl From<WavSpec> for hound::WavSpec {
    fn from(spec: WavSpec) -> Self {
        hound::WavSpec {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            bits_per_sample: spec.bits_per_sample,
            sample_format: if spec.bits_per_sample == 32 {
                SampleFormat::Float
            } else {
                SampleFormat::Int
            },
        }
    }
}

/// A stereo buffer as two equal-length channels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StereoSamples {
    /// Left channel.
    pub left: Vec<f32>,
    /// Right channel.
    pub right: Vec<f32>,
}

impl StereoSamples {
    /// Pair two channels. The longer one is truncated to match.
    pub fn new(mut left: Vec<f32>, mut right: Vec<f32>) -> Self {
        let len = left.len().min(right.len());
        left.truncate(len);
        right.truncate(len);
        Self { left, right }
    }

    /// Duplicate a mono buffer into both channels.
    pub fn from_mono(samples: Vec<f32>) -> Self {
        Self {
            left: samples.clone(),
            right: samples,
        }
    }

    /// Split interleaved L/R frames.
    pub fn from_interleaved(samples: &[f32]) -> Self {
        let (left, right) = samples
            .chunks_exact(2)
            .map(|frame| (frame[0], frame[1]))
            .unzip();
        Self { left, right }
    }

    /// Frames per channel.
    pub fn len(&self) -> usize {
        self.left.len()
    }

    /// True if there are no frames.
    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    /// Average of both channels.
    pub fn to_mono(&self) -> Vec<f32> {
        self.left
            .iter()
            .zip(&self.right)
            .map(|(l, r)| (l + r) * 0.5)
            .collect()
    }

    /// Largest absolute sample in either channel.
    pub fn peak(&self) -> f32 {
        self.left
            .iter()
            .chain(&self.right)
            .fold(0.0f32, |peak, s| peak.max(s.abs()))
    }
}

fn read_interleaved<R: std::io::Read>(reader: WavReader<R>) -> Result<Vec<f32>> {
    let spec = reader.spec();
    let samples = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()?,
        SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
    };
    Ok(samples)
}

/// Read a WAV file as mono, averaging all channels of each frame.
pub fn read_wav<P: AsRef<Path>>(path: P) -> Result<(Vec<f32>, WavSpec)> {
    let reader = WavReader::open(path)?;
    let spec = WavSpec::from(reader.spec());
    let channels = usize::from(spec.channels.max(1));
    let samples = read_interleaved(reader)?;

    let mono_samples = if channels > 1 {
        samples
            .chunks(channels)
            .map(|chunk| chunk.iter().sum::<f32>() / channels as f32)
            .collect()
    } else {
        samples
    };

    Ok((mono_samples, spec))
}

/// Read a WAV file as stereo.
///
/// Mono is duplicated to both sides. Beyond two channels only the first
/// pair is kept.
pub fn read_wav_stereo<P: AsRef<Path>>(path: P) -> Result<(StereoSamples, WavSpec)> {
    let reader = WavReader::open(path)?;
    let spec = WavSpec::from(reader.spec());
    let channels = usize::from(spec.channels.max(1));
    let all_samples = read_interleaved(reader)?;

    let stereo = match channels {
        1 => StereoSamples::from_mono(all_samples),
        2 => StereoSamples::from_interleaved(&all_samples),
        _ => {
            let (left, right) = all_samples
                .chunks_exact(channels)
                .map(|frame| (frame[0], frame[1]))
                .unzip();
            StereoSamples { left, right }
        }
    };

    Ok((stereo, spec))
}

/// Load a WAV file as a mono sample asset for sample zones.
///
/// Fails with [`Error::Empty`] when the file holds no frames, since a
/// zone cannot play nothing.
pub fn load_sample<P: AsRef<Path>>(path: P) -> Result<SampleData> {
    let path = path.as_ref();
    let (frames, spec) = read_wav(path)?;
    if frames.is_empty() {
        return Err(Error::Empty(path.to_path_buf()));
    }
    tracing::info!(
        path = %path.display(),
        frames = frames.len(),
        sample_rate = spec.sample_rate,
        "loaded sample"
    );
    Ok(SampleData::new(frames, spec.sample_rate as f32))
}

fn quantize(sample: f32, max_val: f32) -> i32 {
    (sample * max_val).clamp(-max_val, max_val - 1.0) as i32
}

/// Write a mono WAV file, whatever `spec.channels` says.
pub fn write_wav<P: AsRef<Path>>(path: P, samples: &[f32], spec: WavSpec) -> Result<()> {
    let mono_spec = WavSpec {
        channels: 1,
        ..spec
    };
    let mut writer = WavWriter::create(path, hound::WavSpec::from(mono_spec))?;

    if spec.bits_per_sample == 32 {
        for &sample in samples {
            writer.write_sample(sample)?;
        }
    } else {
        let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
        for &sample in samples {
            writer.write_sample(quantize(sample, max_val))?;
        }
    }

    writer.finalize()?;
    Ok(())
}

/// Write a stereo WAV file, whatever `spec.channels` says.
pub fn write_wav_stereo<P: AsRef<Path>>(
    path: P,
    samples: &StereoSamples,
    spec: WavSpec,
) -> Result<()> {
    let path = path.as_ref();
    let stereo_spec = WavSpec {
        channels: 2,
        ..spec
    };
    let mut writer = WavWriter::create(path, hound::WavSpec::from(stereo_spec))?;

    if spec.bits_per_sample == 32 {
        for (l, r) in samples.left.iter().zip(samples.right.iter()) {
            writer.write_sample(*l)?;
            writer.write_sample(*r)?;
        }
    } else {
        let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
        for (l, r) in samples.left.iter().zip(samples.right.iter()) {
            writer.write_sample(quantize(*l, max_val))?;
            writer.write_sample(quantize(*r, max_val))?;
        }
    }

    writer.finalize()?;
    tracing::info!(
        path = %path.display(),
        frames = samples.len(),
        sample_rate = spec.sample_rate,
        bits = spec.bits_per_sample,
        "wrote WAV"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_roundtrip_f32() {
        let samples: Vec<f32> = (0..1000).map(|i| (i as f32 / 1000.0).sin()).collect();
        let spec = WavSpec {
            channels: 1,
            sample_rate: 48000,
            bits_per_sample: 32,
        };

        let file = NamedTempFile::new().unwrap();
        write_wav(file.path(), &samples, spec).unwrap();

        let (loaded, loaded_spec) = read_wav(file.path()).unwrap();
        assert_eq!(loaded_spec, spec);
        assert_eq!(loaded, samples);
    }

    #[test]
    fn test_roundtrip_i16() {
        let samples: Vec<f32> = (0..1000).map(|i| (i as f32 / 1000.0).sin() * 0.9).collect();
        let spec = WavSpec {
            channels: 1,
            sample_rate: 44100,
            bits_per_sample: 16,
        };

        let file = NamedTempFile::new().unwrap();
        write_wav(file.path(), &samples, spec).unwrap();

        let (loaded, _) = read_wav(file.path()).unwrap();
        assert_eq!(loaded.len(), samples.len());
        for (a, b) in samples.iter().zip(loaded.iter()) {
            assert!((a - b).abs() < 0.001);
        }
    }

    #[test]
    fn test_i16_clips_instead_of_wrapping() {
        let file = NamedTempFile::new().unwrap();
        write_wav(file.path(), &[2.0, -2.0], WavSpec::default()).unwrap();
        let (loaded, _) = read_wav(file.path()).unwrap();
        assert!(loaded[0] > 0.99, "got {}", loaded[0]);
        assert!((loaded[1] + 1.0).abs() < 1e-6, "got {}", loaded[1]);
    }

    #[test]
    fn test_stereo_samples_helpers() {
        let stereo = StereoSamples::new(vec![1.0, 2.0, 9.0], vec![3.0, -4.0]);
        assert_eq!(stereo.len(), 2);
        assert_eq!(stereo.to_mono(), vec![2.0, -1.0]);
        assert_eq!(stereo.peak(), 4.0);

        let back = StereoSamples::from_interleaved(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(back.left, vec![1.0, 3.0]);
        assert_eq!(back.right, vec![2.0, 4.0]);
    }

    #[test]
    fn test_read_stereo_as_mono_averages() {
        let samples = StereoSamples::new(vec![0.5; 10], vec![-0.25; 10]);
        let spec = WavSpec {
            bits_per_sample: 32,
            ..WavSpec::default()
        };
        let file = NamedTempFile::new().unwrap();
        write_wav_stereo(file.path(), &samples, spec).unwrap();

        let (mono, loaded_spec) = read_wav(file.path()).unwrap();
        assert_eq!(loaded_spec.channels, 2);
        assert_eq!(mono, vec![0.125; 10]);
    }

    #[test]
    fn test_load_sample_rejects_empty_file() {
        let file = NamedTempFile::new().unwrap();
        write_wav(file.path(), &[], WavSpec::default()).unwrap();
        assert!(matches!(load_sample(file.path()), Err(Error::Empty(_))));
    }

    #[test]
    fn test_load_sample_keeps_rate() {
        let file = NamedTempFile::new().unwrap();
        let spec = WavSpec {
            channels: 1,
            sample_rate: 22050,
            bits_per_sample: 24,
        };
        write_wav(file.path(), &[0.0, 0.5, -0.5], spec).unwrap();
        let data = load_sample(file.path()).unwrap();
        assert_eq!(data.len(), 3);
        assert_eq!(data.sample_rate(), 22050.0);
        assert!((data.frames()[1] - 0.5).abs() < 1e-6);
    }
}
