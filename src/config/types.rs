use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub batch: BatchConfig,

    #[serde(default)]
    pub playback: PlaybackConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BatchConfig {
    /// Directory (or base URL) holding `{index}.{extension}` frame files
    #[serde(default = "default_directory")]
    pub directory: String,

    #[serde(default = "default_frame_count")]
    pub frame_count: usize,

    #[serde(default = "default_extension")]
    pub extension: String,

    /// Upper bound on concurrent fetches (default: one per frame)
    #[serde(default)]
    pub max_in_flight: Option<usize>,
}

fn default_directory() -> String {
    "frames".to_string()
}
fn default_frame_count() -> usize {
    1
}
fn default_extension() -> String {
    crate::loader::DEFAULT_EXTENSION.to_string()
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
            frame_count: default_frame_count(),
            extension: default_extension(),
            max_in_flight: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PlaybackConfig {
    /// Frames per second
    #[serde(default = "default_frame_rate")]
    pub frame_rate: f64,
}

fn default_frame_rate() -> f64 {
    10.0
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            frame_rate: default_frame_rate(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
    /// Log a one-line summary per frame
    #[default]
    Log,
    /// Write each frame as a numbered PNG
    Png,
}

impl std::str::FromStr for RendererKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "log" => Ok(Self::Log),
            "png" => Ok(Self::Png),
            other => Err(format!("unknown renderer '{other}' (expected log or png)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub renderer: RendererKind,

    /// Where the png renderer writes its images
    #[serde(default = "default_output_directory")]
    pub directory: PathBuf,

    /// Paint the last row at the top, as the frame producer writes rows bottom-up
    #[serde(default = "default_flip_vertical")]
    pub flip_vertical: bool,
}

fn default_output_directory() -> PathBuf {
    PathBuf::from("render")
}
fn default_flip_vertical() -> bool {
    true
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            renderer: RendererKind::default(),
            directory: default_output_directory(),
            flip_vertical: default_flip_vertical(),
        }
    }
}
