use clap::{Parser, Subcommand};
use frameloop::config::RendererKind;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "frameloop")]
#[command(author, version, about = "Load a batch of pixel-map frames and play it in a loop")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load a batch of frames and play it back
    Play {
        /// Directory or base URL holding the frames
        #[arg(short, long)]
        dir: Option<String>,

        /// Number of frames in the batch
        #[arg(short = 'n', long)]
        frames: Option<usize>,

        /// Frames per second
        #[arg(short, long)]
        rate: Option<f64>,

        /// Frame file extension
        #[arg(long)]
        ext: Option<String>,

        /// Renderer to use (log or png)
        #[arg(long)]
        renderer: Option<RendererKind>,

        /// Output directory for the png renderer
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Stop after this many seconds (default: run until Ctrl-C)
        #[arg(long)]
        duration: Option<f64>,

        /// Read commands from stdin (rate <fps>, stop, play, reload, quit)
        #[arg(short, long)]
        interactive: bool,
    },

    /// Decode a single frame file and display its metadata
    Inspect {
        /// Frame file to inspect
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
