//! Header metadata shared by every frame of a batch.

/// Number of samples per pixel (R, G, B).
pub const SAMPLES_PER_PIXEL: usize = 3;

/// Largest maximum-sample value the plaintext format allows.
pub const MAX_SAMPLE_LIMIT: u16 = u16::MAX;

/// Dimensions and sample range declared by a pixel-map header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct FrameMetadata {
    pub width: u32,
    pub height: u32,
    pub max_sample: u16,
}

impl FrameMetadata {
    pub fn new(width: u32, height: u32, max_sample: u16) -> Self {
        Self {
            width,
            height,
            max_sample,
        }
    }

    /// Number of pixels in a frame.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Number of samples a frame body must contain.
    pub fn sample_count(&self) -> usize {
        self.pixel_count() * SAMPLES_PER_PIXEL
    }

    /// Offset of the red sample of pixel `(x, y)` in a row-major buffer.
    ///
    /// Returns `None` if the coordinates fall outside the frame.
    pub fn sample_offset(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some((y as usize * self.width as usize + x as usize) * SAMPLES_PER_PIXEL)
    }

    /// Whether `other` describes frames of the same size.
    pub fn same_dimensions(&self, other: &FrameMetadata) -> bool {
        self.width == other.width && self.height == other.height
    }
}

impl std::fmt::Display for FrameMetadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{} (max {})", self.width, self.height, self.max_sample)
    }
}
