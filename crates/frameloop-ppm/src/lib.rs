//! Frameloop-PPM: strict decoding of plaintext pixel-map documents.
//!
//! A plaintext pixel-map (the `P3` flavour of PPM) is a whitespace-delimited
//! token stream: a format tag, the width, the height and the maximum sample
//! value, followed by `width * height * 3` integer samples in row-major RGB
//! order.
//!
//! The decoder here is deliberately strict. It tolerates arbitrary whitespace
//! between tokens (spaces, tabs, newlines, a trailing newline) but rejects
//! comment lines, missing or surplus samples, and out-of-range values.
//!
//! # Modules
//!
//! - `decoder` - Tokenizing and validating a document into a [`PixelMap`]
//! - `encoder` - Writing metadata and samples back out as plaintext
//! - `metadata` - The [`FrameMetadata`] header shared by a batch of frames
//! - `error` - [`FormatError`] and its canonical reason strings
//!
//! # Example
//!
//! ```
//! use frameloop_ppm::{decode, FrameMetadata};
//!
//! let map = decode("P3\n1 1\n255\n255 0 0\n").unwrap();
//! assert_eq!(map.metadata, FrameMetadata::new(1, 1, 255));
//! assert_eq!(map.samples, vec![255, 0, 0]);
//! ```

pub mod decoder;
pub mod encoder;
pub mod error;
pub mod metadata;

pub use decoder::{decode, PixelMap};
pub use encoder::encode;
pub use error::{FormatError, Result};
pub use metadata::{FrameMetadata, MAX_SAMPLE_LIMIT, SAMPLES_PER_PIXEL};
