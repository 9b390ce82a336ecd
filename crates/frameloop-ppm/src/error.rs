//! Error types for frameloop-ppm.

use thiserror::Error;

/// Result type for pixel-map decoding.
pub type Result<T> = std::result::Result<T, FormatError>;

/// A malformed pixel-map document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// The document is empty, or ends before the header is complete.
    #[error("missing header: {0}")]
    MissingHeader(&'static str),

    /// A header field is non-numeric, zero, or out of range.
    #[error("invalid header field {field}: {value:?}")]
    InvalidHeaderField {
        /// Header field name (`width`, `height`, `max_sample`).
        field: &'static str,
        /// The offending token.
        value: String,
    },

    /// The body does not hold exactly `width * height * 3` samples.
    #[error("sample count mismatch: expected {expected}, found {found}")]
    SampleCountMismatch { expected: usize, found: usize },

    /// A sample is non-numeric or above the declared maximum.
    #[error("invalid sample at position {position}: {value:?} (max {max})")]
    InvalidSample {
        /// Zero-based position of the sample in the body.
        position: usize,
        /// The offending token.
        value: String,
        /// Declared maximum sample value.
        max: u16,
    },
}

impl FormatError {
    /// Canonical short reason for this failure.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::MissingHeader(_) => "missing header",
            Self::InvalidHeaderField { .. } => "invalid header field",
            Self::SampleCountMismatch { .. } => "sample count mismatch",
            Self::InvalidSample { .. } => "invalid sample",
        }
    }

    pub(crate) fn header_field(field: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidHeaderField {
            field,
            value: value.into(),
        }
    }
}
