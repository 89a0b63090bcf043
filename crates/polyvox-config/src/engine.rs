//! Engine-wide settings.

use serde::{Deserialize, Serialize};
use std::path::Path;

use polyvox_synth::StealingMode;

use crate::error::ConfigError;

/// How a full voice pool makes room for a new note.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StealingConfig {
    /// Drop the new note.
    Disabled,
    /// Take the oldest voice, preferring the note's own channel.
    #[default]
    OldestSameChannel,
    /// Take the quietest voice, preferring the note's own channel.
    QuietestSameChannel,
}

impl From<StealingConfig> for StealingMode {
    fn from(config: StealingConfig) -> Self {
        match config {
            StealingConfig::Disabled => StealingMode::Disabled,
            StealingConfig::OldestSameChannel => StealingMode::OldestSameChannel,
            StealingConfig::QuietestSameChannel => StealingMode::QuietestSameChannel,
        }
    }
}

/// Engine settings.
///
/// # TOML Format
///
/// ```toml
/// sample_rate = 48000
/// block_size = 256
/// polyphony = 32
/// master_volume_db = -3.0
/// stealing = "quietest_same_channel"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Output sample rate in Hz.
    pub sample_rate: u32,
    /// Frames per render block.
    pub block_size: usize,
    /// Voices per synth.
    pub polyphony: usize,
    /// Master volume in dB.
    pub master_volume_db: f32,
    /// Stealing policy.
    pub stealing: StealingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            block_size: 256,
            polyphony: 32,
            master_volume_db: 0.0,
            stealing: StealingConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml(&content)
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Save to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_toml()?).map_err(|e| ConfigError::write_file(path, e))
    }

    /// Convert to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Sample rate as the engine's float type.
    pub fn sample_rate_hz(&self) -> f32 {
        self.sample_rate as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config = EngineConfig::from_toml("polyphony = 8").unwrap();
        assert_eq!(config.polyphony, 8);
        assert_eq!(config.sample_rate, 44100);
        assert_eq!(config.block_size, 256);
        assert_eq!(config.stealing, StealingConfig::OldestSameChannel);
    }

    #[test]
    fn test_stealing_names() {
        let config = EngineConfig::from_toml(r#"stealing = "disabled""#).unwrap();
        assert_eq!(StealingMode::from(config.stealing), StealingMode::Disabled);
        let config = EngineConfig::from_toml(r#"stealing = "quietest_same_channel""#).unwrap();
        assert_eq!(
            StealingMode::from(config.stealing),
            StealingMode::QuietestSameChannel
        );
        assert!(EngineConfig::from_toml(r#"stealing = "random""#).is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = EngineConfig {
            sample_rate: 48000,
            master_volume_db: -6.0,
            ..EngineConfig::default()
        };
        let back = EngineConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(back, config);
    }
}
