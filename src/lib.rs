//! Frameloop - load batches of pixel-map frames and play them back in a loop
//!
//! A batch is a directory (or base URL) of frames named `0.ppm`, `1.ppm`, ...
//! [`loader::BatchLoader`] fetches and decodes every frame concurrently into a
//! [`store::FrameStore`]; once the store is complete,
//! [`playback::PlaybackScheduler`] renders the frames in index order at a
//! configurable rate, wrapping forever. [`session::PlaybackSession`] ties the
//! two together.
//!
//! The text format itself lives in the `frameloop-ppm` crate.

pub mod config;
pub mod error;
pub mod loader;
pub mod playback;
pub mod renderer;
pub mod session;
pub mod source;
pub mod store;

pub use error::{Error, Result};
pub use frameloop_ppm::{FormatError, FrameMetadata, PixelMap};
pub use loader::{BatchLoader, BatchRequest, CancelToken, LoadCallbacks, LoadProgress};
pub use playback::PlaybackScheduler;
pub use renderer::{LogRenderer, OutputRenderer, PngRenderer, Renderer};
pub use session::{PlaybackSession, PlaybackState};
pub use source::{FrameLocation, FrameSource, FsSource, HttpSource, MemorySource};
pub use store::{Frame, FrameStore};
