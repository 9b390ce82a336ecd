//! Indexed storage for the decoded frames of one batch.

use frameloop_ppm::{FormatError, FrameMetadata, PixelMap};

use crate::error::{Error, Result};

/// One decoded frame. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    index: usize,
    metadata: FrameMetadata,
    pixels: Vec<u16>,
}

impl Frame {
    /// Wrap a decoded pixel map as the frame at `index`.
    pub fn new(index: usize, map: PixelMap) -> Self {
        Self {
            index,
            metadata: map.metadata,
            pixels: map.samples,
        }
    }

    /// Build a frame from raw parts, checking the buffer length.
    pub fn from_parts(index: usize, metadata: FrameMetadata, pixels: Vec<u16>) -> Result<Self> {
        let expected = metadata.sample_count();
        if pixels.len() != expected {
            return Err(FormatError::SampleCountMismatch {
                expected,
                found: pixels.len(),
            }
            .into());
        }
        Ok(Self {
            index,
            metadata,
            pixels,
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Header this frame was decoded from.
    pub fn metadata(&self) -> &FrameMetadata {
        &self.metadata
    }

    /// Row-major RGB samples, `width * height * 3` long.
    pub fn pixels(&self) -> &[u16] {
        &self.pixels
    }
}

/// Fixed-size collection of frames plus the batch metadata.
///
/// Every slot is either empty or holds a complete frame whose dimensions match
/// the batch metadata. Frames with different dimensions are refused, so a
/// reader never sees a pixel buffer that disagrees with [`FrameStore::metadata`].
/// The maximum sample value follows the most recently stored frame.
#[derive(Debug, Clone, Default)]
pub struct FrameStore {
    frames: Vec<Option<Frame>>,
    metadata: Option<FrameMetadata>,
    populated: usize,
}

impl FrameStore {
    /// Create an empty store with `size` slots.
    pub fn new(size: usize) -> Self {
        Self {
            frames: vec![None; size],
            metadata: None,
            populated: 0,
        }
    }

    /// Number of slots.
    pub fn size(&self) -> usize {
        self.frames.len()
    }

    /// Number of populated slots.
    pub fn populated(&self) -> usize {
        self.populated
    }

    /// Whether every slot holds a frame.
    pub fn is_complete(&self) -> bool {
        self.populated == self.frames.len()
    }

    /// Store `frame` at `index`, replacing any previous frame there. The slot
    /// decides the stored frame's index.
    ///
    /// # Errors
    ///
    /// - [`Error::IndexOutOfRange`] if `index >= size`
    /// - [`Error::DimensionMismatch`] if the frame's width or height differs
    ///   from the batch metadata
    pub fn set(&mut self, index: usize, mut frame: Frame) -> Result<()> {
        let size = self.frames.len();
        if index >= size {
            return Err(Error::IndexOutOfRange { index, size });
        }
        frame.index = index;

        if let Some(current) = self.metadata {
            if !current.same_dimensions(&frame.metadata) {
                return Err(Error::DimensionMismatch {
                    expected: current,
                    found: frame.metadata,
                });
            }
        }

        self.metadata = Some(frame.metadata);
        if self.frames[index].replace(frame).is_none() {
            self.populated += 1;
        }
        Ok(())
    }

    /// The frame at `index`, if it has been stored.
    ///
    /// # Errors
    ///
    /// [`Error::IndexOutOfRange`] if `index >= size`.
    pub fn get(&self, index: usize) -> Result<Option<&Frame>> {
        self.frames
            .get(index)
            .map(Option::as_ref)
            .ok_or(Error::IndexOutOfRange {
                index,
                size: self.frames.len(),
            })
    }

    /// Batch metadata, absent until the first frame is stored.
    pub fn metadata(&self) -> Option<FrameMetadata> {
        self.metadata
    }

    /// Indices that have not been populated, in ascending order.
    pub fn missing(&self) -> Vec<usize> {
        self.frames
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_none())
            .map(|(i, _)| i)
            .collect()
    }
}
