//! Error types for frame loading and playback.
//!
//! Per-frame failures ([`Error::Format`], [`Error::Fetch`],
//! [`Error::DimensionMismatch`]) are reported through the batch error callback
//! and never abort a batch. [`Error::IndexOutOfRange`], [`Error::InvalidRate`],
//! [`Error::EmptyBatch`] and [`Error::NotReady`] are caller contract violations
//! and are returned directly.

use frameloop_ppm::{FormatError, FrameMetadata};

use crate::session::PlaybackState;

/// Error type for frameloop operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A frame document is malformed.
    #[error("Format error ({reason}): {detail}", reason = .0.reason(), detail = .0)]
    Format(#[from] FormatError),

    /// A frame could not be retrieved from its source.
    #[error("Fetch error for {location}: {message}")]
    Fetch {
        /// The file path or URL that was requested.
        location: String,
        /// Human-readable failure description.
        message: String,
    },

    /// A frame store was accessed outside `[0, size)`.
    #[error("Frame index {index} out of range (size {size})")]
    IndexOutOfRange { index: usize, size: usize },

    /// A frame's dimensions differ from the frames already in the batch.
    #[error("Dimension mismatch: batch is {expected}, frame is {found}")]
    DimensionMismatch {
        expected: FrameMetadata,
        found: FrameMetadata,
    },

    /// A playback rate that is zero, negative, or not finite.
    #[error("Invalid playback rate: {0}")]
    InvalidRate(f64),

    /// Playback was requested for a batch with no frames.
    #[error("Cannot play an empty batch")]
    EmptyBatch,

    /// Playback was requested before a batch finished loading.
    #[error("No batch ready to play (state: {0})")]
    NotReady(PlaybackState),

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a new Fetch error.
    pub fn fetch(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fetch {
            location: location.into(),
            message: message.into(),
        }
    }

    /// Whether this error concerns a single frame rather than the caller.
    pub fn is_per_frame(&self) -> bool {
        matches!(
            self,
            Self::Format(_) | Self::Fetch { .. } | Self::DimensionMismatch { .. }
        )
    }
}

/// Result type alias using the frameloop Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Check that `rate` is a usable frames-per-second value.
pub fn validate_rate(rate: f64) -> Result<f64> {
    if rate.is_finite() && rate > 0.0 {
        Ok(rate)
    } else {
        Err(Error::InvalidRate(rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::fetch("frames/3.ppm", "connection refused");
        assert_eq!(
            err.to_string(),
            "Fetch error for frames/3.ppm: connection refused"
        );

        let err = Error::IndexOutOfRange { index: 5, size: 3 };
        assert_eq!(err.to_string(), "Frame index 5 out of range (size 3)");

        let err = Error::from(FormatError::SampleCountMismatch {
            expected: 300,
            found: 12,
        });
        assert_eq!(
            err.to_string(),
            "Format error (sample count mismatch): sample count mismatch: expected 300, found 12"
        );

        let err = Error::InvalidRate(0.0);
        assert_eq!(err.to_string(), "Invalid playback rate: 0");

        let err = Error::NotReady(PlaybackState::Loading);
        assert_eq!(err.to_string(), "No batch ready to play (state: loading)");
    }

    #[test]
    fn test_per_frame_classification() {
        assert!(Error::fetch("a", "b").is_per_frame());
        assert!(Error::from(FormatError::MissingHeader("empty document")).is_per_frame());
        assert!(!Error::InvalidRate(-1.0).is_per_frame());
        assert!(!Error::IndexOutOfRange { index: 0, size: 0 }.is_per_frame());
        assert!(!Error::EmptyBatch.is_per_frame());
        assert!(!Error::NotReady(PlaybackState::Loading).is_per_frame());
    }

    #[test]
    fn test_validate_rate() {
        assert_eq!(validate_rate(5.0).unwrap(), 5.0);
        assert_eq!(validate_rate(0.5).unwrap(), 0.5);
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(validate_rate(bad), Err(Error::InvalidRate(_))));
        }
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Io(_)));
    }
}
