//! Plaintext pixel-map decoding.
//!
//! Decoding happens in three passes over the token stream: the four header
//! tokens, a count of the remaining body tokens, and finally sample parsing.
//! Counting before parsing means a truncated or padded body is always reported
//! as a count mismatch, whatever the tokens contain.

use crate::error::{FormatError, Result};
use crate::metadata::{FrameMetadata, MAX_SAMPLE_LIMIT};

/// A decoded pixel-map document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelMap {
    /// The format tag exactly as written (normally `P3`).
    pub tag: String,
    pub metadata: FrameMetadata,
    /// Row-major, top-to-bottom, left-to-right RGB samples.
    pub samples: Vec<u16>,
}

impl PixelMap {
    /// RGB samples of pixel `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u16; 3]> {
        let offset = self.metadata.sample_offset(x, y)?;
        let rgb = self.samples.get(offset..offset + 3)?;
        Some([rgb[0], rgb[1], rgb[2]])
    }
}

/// Decode a plaintext pixel-map document.
///
/// # Errors
///
/// - [`FormatError::MissingHeader`] if the document ends before the tag,
///   width, height and maximum sample value have been read
/// - [`FormatError::InvalidHeaderField`] if a header number is non-numeric,
///   zero, or (for the maximum sample) above 65535
/// - [`FormatError::SampleCountMismatch`] if the body does not hold exactly
///   `width * height * 3` samples
/// - [`FormatError::InvalidSample`] if a sample is non-numeric or exceeds the
///   declared maximum
pub fn decode(text: &str) -> Result<PixelMap> {
    let mut tokens = text.split_ascii_whitespace();

    let tag = tokens
        .next()
        .ok_or(FormatError::MissingHeader("empty document"))?;

    let width = parse_dimension(tokens.next(), "width")?;
    let height = parse_dimension(tokens.next(), "height")?;
    let max_sample = parse_max_sample(tokens.next())?;
    let metadata = FrameMetadata::new(width, height, max_sample);

    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(3))
        .ok_or_else(|| FormatError::header_field("width", format!("{width}x{height}")))?;

    let found = tokens.clone().count();
    if found != expected {
        return Err(FormatError::SampleCountMismatch { expected, found });
    }

    let mut samples = Vec::with_capacity(expected);
    for (position, token) in tokens.enumerate() {
        samples.push(parse_sample(token, position, max_sample)?);
    }

    Ok(PixelMap {
        tag: tag.to_string(),
        metadata,
        samples,
    })
}

fn parse_dimension(token: Option<&str>, field: &'static str) -> Result<u32> {
    let token = token.ok_or(FormatError::MissingHeader(field))?;
    match token.parse::<u32>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(FormatError::header_field(field, token)),
    }
}

fn parse_max_sample(token: Option<&str>) -> Result<u16> {
    let token = token.ok_or(FormatError::MissingHeader("max_sample"))?;
    match token.parse::<u32>() {
        Ok(value) if value > 0 && value <= MAX_SAMPLE_LIMIT as u32 => Ok(value as u16),
        _ => Err(FormatError::header_field("max_sample", token)),
    }
}

fn parse_sample(token: &str, position: usize, max: u16) -> Result<u16> {
    match token.parse::<u32>() {
        Ok(value) if value <= max as u32 => Ok(value as u16),
        _ => Err(FormatError::InvalidSample {
            position,
            value: token.to_string(),
            max,
        }),
    }
}
