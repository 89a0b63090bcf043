//! Initialization errors.
//!
//! The render path never fails. These errors can only be produced while
//! building tables, node graphs, and voice pools, before audio starts.

/// Errors raised while constructing a lookup table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    /// The table had no entries.
    Empty,
    /// Wave tables must have a power-of-two length for masked indexing.
    NotPowerOfTwo(usize),
}

/// Errors raised while constructing an engine component.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Sample rate was zero, negative, or not finite.
    InvalidSampleRate(f32),
    /// A voice pool was requested with no voices.
    ZeroPolyphony,
    /// A lookup table could not be built.
    Table(TableError),
}

impl From<TableError> for EngineError {
    fn from(err: TableError) -> Self {
        Self::Table(err)
    }
}

impl core::fmt::Display for TableError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Empty => write!(f, "table is empty"),
            Self::NotPowerOfTwo(len) => {
                write!(f, "table length {len} is not a power of two")
            }
        }
    }
}

impl core::fmt::Display for EngineError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidSampleRate(sr) => write!(f, "invalid sample rate: {sr}"),
            Self::ZeroPolyphony => write!(f, "voice pool needs at least one voice"),
            Self::Table(err) => write!(f, "table error: {err}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for TableError {}

#[cfg(feature = "std")]
impl std::error::Error for EngineError {}

/// Validate a sample rate, rejecting zero, negative, and non-finite values.
///
/// # Example
/// ```rust
/// use polyvox_core::{EngineError, validate_sample_rate};
///
/// assert!(validate_sample_rate(44100.0).is_ok());
/// assert_eq!(validate_sample_rate(0.0), Err(EngineError::InvalidSampleRate(0.0)));
/// ```
pub fn validate_sample_rate(sample_rate: f32) -> Result<f32, EngineError> {
    if sample_rate.is_finite() && sample_rate > 0.0 {
        Ok(sample_rate)
    } else {
        Err(EngineError::InvalidSampleRate(sample_rate))
    }
}

#[cfg(test)]
mod tests {
    extern crate alloc;
    use alloc::string::ToString;

    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            TableError::NotPowerOfTwo(100).to_string(),
            "table length 100 is not a power of two"
        );
        assert_eq!(
            EngineError::ZeroPolyphony.to_string(),
            "voice pool needs at least one voice"
        );
        let wrapped: EngineError = TableError::Empty.into();
        assert_eq!(wrapped.to_string(), "table error: table is empty");
    }

    #[test]
    fn test_sample_rate_validation() {
        assert!(validate_sample_rate(48000.0).is_ok());
        assert!(validate_sample_rate(-1.0).is_err());
        assert!(validate_sample_rate(f32::NAN).is_err());
        assert!(validate_sample_rate(f32::INFINITY).is_err());
    }
}
