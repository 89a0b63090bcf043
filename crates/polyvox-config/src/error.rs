//! Error types for configuration operations.

use std::path::PathBuf;
use thiserror::Error;

use polyvox_core::EngineError;
use polyvox_seq::SequenceError;

/// Errors that can occur while loading, saving, or building from
/// configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    ReadFile {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a file
    #[error("failed to write file '{path}': {source}")]
    WriteFile {
        /// Path of the file that could not be written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Failed to serialize TOML
    #[error("failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Patch not found in the song or the factory set
    #[error("patch not found: {0}")]
    PatchNotFound(String),

    /// Generator name not recognized
    #[error("unknown generator: {0}")]
    UnknownGenerator(String),

    /// A sample asset could not be loaded
    #[error("failed to load sample '{path}': {reason}")]
    SampleLoad {
        /// Path of the sample file.
        path: PathBuf,
        /// Why loading failed.
        reason: String,
    },

    /// Validation errors
    #[error("validation failed: {0}")]
    Validation(#[from] crate::validation::ValidationError),

    /// Engine component could not be built
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    /// Song could not be sequenced
    #[error("sequence error: {0}")]
    Sequence(#[from] SequenceError),
}

impl ConfigError {
    /// Create a read file error.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::ReadFile {
            path: path.into(),
            source,
        }
    }

    /// Create a write file error.
    pub fn write_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::WriteFile {
            path: path.into(),
            source,
        }
    }

    /// Create a sample load error.
    pub fn sample_load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        ConfigError::SampleLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    fn mock_io_err() -> std::io::Error {
        std::io::Error::new(std::io::ErrorKind::NotFound, "mock")
    }

    #[test]
    fn read_file_display() {
        let err = ConfigError::read_file("/a/song.toml", mock_io_err());
        let msg = err.to_string();
        assert!(msg.contains("failed to read file"), "got: {msg}");
        assert!(msg.contains("/a/song.toml"), "got: {msg}");
        assert!(err.source().is_some(), "ReadFile must expose I/O source");
    }

    #[test]
    fn write_file_display() {
        let err = ConfigError::write_file("/a/patch.toml", mock_io_err());
        assert!(err.to_string().contains("failed to write file"));
        assert!(err.source().is_some());
    }

    #[test]
    fn patch_not_found_display() {
        let err = ConfigError::PatchNotFound("glass".to_string());
        assert_eq!(err.to_string(), "patch not found: glass");
        assert!(err.source().is_none());
    }

    #[test]
    fn sample_load_display() {
        let err = ConfigError::sample_load("kick.wav", "no such file");
        assert_eq!(
            err.to_string(),
            "failed to load sample 'kick.wav': no such file"
        );
    }

    #[test]
    fn wrapped_engine_errors() {
        let err: ConfigError = EngineError::ZeroPolyphony.into();
        assert_eq!(
            err.to_string(),
            "engine error: voice pool needs at least one voice"
        );
        let err: ConfigError = SequenceError::ZeroTicksPerBeat.into();
        assert!(err.to_string().starts_with("sequence error"));
    }
}
