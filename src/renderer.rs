//! The rendering capability that playback pushes frames into.
//!
//! Playback only ever hands a renderer a pixel buffer and the batch metadata;
//! how the frame gets painted is entirely up to the implementation. Two sinks
//! ship with the crate: [`LogRenderer`] for headless runs and [`PngRenderer`]
//! for dumping the played sequence to disk. [`OutputRenderer`] picks one of
//! them at runtime.

use std::path::{Path, PathBuf};

use frameloop_ppm::FrameMetadata;
use image::{Rgb, RgbImage};

use crate::error::Result;

/// Paints one frame.
///
/// Called from the playback task, once per tick, never concurrently with
/// itself. Implementations should return promptly; a slow render delays the
/// next tick rather than overlapping it.
pub trait Renderer: Send + 'static {
    fn render(&mut self, pixels: &[u16], metadata: &FrameMetadata);
}

impl<F> Renderer for F
where
    F: FnMut(&[u16], &FrameMetadata) + Send + 'static,
{
    fn render(&mut self, pixels: &[u16], metadata: &FrameMetadata) {
        self(pixels, metadata)
    }
}

/// Logs a summary line per frame.
#[derive(Debug, Default)]
pub struct LogRenderer {
    rendered: u64,
}

impl LogRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames_rendered(&self) -> u64 {
        self.rendered
    }
}

impl Renderer for LogRenderer {
    fn render(&mut self, pixels: &[u16], metadata: &FrameMetadata) {
        self.rendered += 1;
        tracing::debug!(
            frame = self.rendered,
            width = metadata.width,
            height = metadata.height,
            intensity = mean_intensity(pixels, metadata),
            "Rendered frame"
        );
    }
}

/// A built-in renderer chosen at runtime.
#[derive(Debug)]
pub enum OutputRenderer {
    Log(LogRenderer),
    Png(PngRenderer),
}

impl OutputRenderer {
    /// Frames handed to the underlying renderer so far.
    pub fn frames_rendered(&self) -> u64 {
        match self {
            Self::Log(renderer) => renderer.frames_rendered(),
            Self::Png(renderer) => renderer.frames_written(),
        }
    }
}

impl Renderer for OutputRenderer {
    fn render(&mut self, pixels: &[u16], metadata: &FrameMetadata) {
        match self {
            Self::Log(renderer) => renderer.render(pixels, metadata),
            Self::Png(renderer) => renderer.render(pixels, metadata),
        }
    }
}

/// Mean sample value normalized to `[0, 1]`.
pub fn mean_intensity(pixels: &[u16], metadata: &FrameMetadata) -> f64 {
    if pixels.is_empty() {
        return 0.0;
    }
    let sum: u64 = pixels.iter().map(|&s| u64::from(s)).sum();
    sum as f64 / (pixels.len() as f64 * f64::from(metadata.max_sample))
}

/// Writes every rendered frame to `{directory}/{sequence:06}.png`.
#[derive(Debug)]
pub struct PngRenderer {
    directory: PathBuf,
    flip_vertical: bool,
    sequence: u64,
}

impl PngRenderer {
    /// Create the renderer, creating `directory` if needed.
    ///
    /// # Errors
    ///
    /// [`Error::Io`](crate::Error::Io) if the directory cannot be created.
    pub fn new(directory: impl Into<PathBuf>, flip_vertical: bool) -> Result<Self> {
        let directory = directory.into();
        std::fs::create_dir_all(&directory)?;
        Ok(Self {
            directory,
            flip_vertical,
            sequence: 0,
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Number of frames written so far.
    pub fn frames_written(&self) -> u64 {
        self.sequence
    }
}

impl Renderer for PngRenderer {
    fn render(&mut self, pixels: &[u16], metadata: &FrameMetadata) {
        let Some(image) = to_rgb8(pixels, metadata, self.flip_vertical) else {
            tracing::warn!(
                "Skipping frame: {} samples do not fit {}",
                pixels.len(),
                metadata
            );
            return;
        };

        let path = self.directory.join(format!("{:06}.png", self.sequence));
        match image.save(&path) {
            Ok(()) => {
                self.sequence += 1;
                tracing::trace!("Wrote {:?}", path);
            }
            Err(e) => tracing::warn!("Failed to write {:?}: {}", path, e),
        }
    }
}

/// Convert a sample buffer to an 8-bit RGB image, scaling `[0, max_sample]`
/// to `[0, 255]`. With `flip_vertical` the last row of the buffer becomes the
/// top row of the image.
///
/// Returns `None` if `pixels` does not hold exactly one frame.
pub fn to_rgb8(pixels: &[u16], metadata: &FrameMetadata, flip_vertical: bool) -> Option<RgbImage> {
    if pixels.len() != metadata.sample_count() {
        return None;
    }

    let max = u32::from(metadata.max_sample.max(1));
    let scale = |sample: u16| -> u8 { ((u32::from(sample) * 255 + max / 2) / max).min(255) as u8 };

    Some(RgbImage::from_fn(metadata.width, metadata.height, |x, y| {
        let src_y = if flip_vertical {
            metadata.height - 1 - y
        } else {
            y
        };
        // In bounds: x < width and src_y < height by construction.
        let offset = (src_y as usize * metadata.width as usize + x as usize) * 3;
        Rgb([
            scale(pixels[offset]),
            scale(pixels[offset + 1]),
            scale(pixels[offset + 2]),
        ])
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn two_rows() -> (Vec<u16>, FrameMetadata) {
        // Top row red, bottom row blue, max 15.
        let meta = FrameMetadata::new(2, 2, 15);
        let pixels = vec![15, 0, 0, 15, 0, 0, 0, 0, 15, 0, 0, 15];
        (pixels, meta)
    }

    #[test]
    fn test_to_rgb8_scales_samples() {
        let (pixels, meta) = two_rows();
        let image = to_rgb8(&pixels, &meta, false).unwrap();
        assert_eq!(image.get_pixel(0, 0), &Rgb([255, 0, 0]));
        assert_eq!(image.get_pixel(1, 1), &Rgb([0, 0, 255]));

        let meta = FrameMetadata::new(1, 1, 255);
        let image = to_rgb8(&[12, 128, 255], &meta, false).unwrap();
        assert_eq!(image.get_pixel(0, 0), &Rgb([12, 128, 255]));
    }

    #[test]
    fn test_to_rgb8_flips_rows() {
        let (pixels, meta) = two_rows();
        let image = to_rgb8(&pixels, &meta, true).unwrap();
        assert_eq!(image.get_pixel(0, 0), &Rgb([0, 0, 255]));
        assert_eq!(image.get_pixel(0, 1), &Rgb([255, 0, 0]));
    }

    #[test]
    fn test_to_rgb8_rejects_wrong_length() {
        let meta = FrameMetadata::new(2, 2, 255);
        assert!(to_rgb8(&[0; 11], &meta, false).is_none());
    }

    #[test]
    fn test_mean_intensity() {
        let meta = FrameMetadata::new(1, 1, 100);
        assert_eq!(mean_intensity(&[0, 50, 100], &meta), 0.5);
        assert_eq!(mean_intensity(&[], &meta), 0.0);
    }

    #[test]
    fn test_png_renderer_writes_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let mut renderer = PngRenderer::new(dir.path().join("out"), false).unwrap();
        let (pixels, meta) = two_rows();

        renderer.render(&pixels, &meta);
        renderer.render(&pixels, &meta);

        assert_eq!(renderer.frames_written(), 2);
        let first = image::open(dir.path().join("out/000000.png")).unwrap().to_rgb8();
        assert_eq!(first.dimensions(), (2, 2));
        assert_eq!(first.get_pixel(1, 0), &Rgb([255, 0, 0]));
        assert!(dir.path().join("out/000001.png").exists());
    }

    #[test]
    fn test_png_renderer_directory_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "not a directory").unwrap();

        let err = PngRenderer::new(blocker.join("out"), true).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_log_renderer_counts() {
        let mut renderer = LogRenderer::new();
        let (pixels, meta) = two_rows();
        renderer.render(&pixels, &meta);
        assert_eq!(renderer.frames_rendered(), 1);
    }

    #[test]
    fn test_closure_renderer() {
        let seen = std::sync::Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = seen.clone();
        let mut renderer = move |pixels: &[u16], _: &FrameMetadata| sink.lock().push(pixels[0]);

        renderer.render(&[7, 0, 0], &FrameMetadata::new(1, 1, 255));
        assert_eq!(*seen.lock(), vec![7]);
    }
}
