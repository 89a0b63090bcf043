//! File I/O for the polyvox synthesis engine.
//!
//! This crate provides:
//!
//! - **Rendered output**: [`write_wav_stereo`] for saving what a player renders
//! - **Sample assets**: [`load_sample`] for turning a WAV file into [`SampleData`]
//!   that sample zones can play
//! - **Inspection**: [`read_wav_info`] for headers without the audio
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use polyvox_io::{StereoSamples, WavSpec, load_sample, write_wav_stereo};
//!
//! let kick = load_sample("kick.wav")?;
//! println!("{} frames at {} Hz", kick.len(), kick.sample_rate());
//!
//! let rendered = StereoSamples::new(vec![0.0; 44100], vec![0.0; 44100]);
//! write_wav_stereo("out.wav", &rendered, WavSpec::default())?;
//! # Ok::<(), polyvox_io::Error>(())
//! ```

use std::path::PathBuf;

mod wav;

pub use polyvox_synth::SampleData;
pub use wav::{
    StereoSamples, WavFormat, WavInfo, WavSpec, load_sample, read_wav, read_wav_info,
    read_wav_stereo, write_wav, write_wav_stereo,
};

/// Error types for audio I/O operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// WAV file read/write error.
    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    /// A sample file holds no audio.
    #[error("no audio frames in '{}'", .0.display())]
    Empty(PathBuf),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type for audio I/O operations.
pub type Result<T> = std::result::Result<T, Error>;
