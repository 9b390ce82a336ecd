mod cli;

use frameloop::{
    config::{self, Config, RendererKind},
    renderer::mean_intensity,
    source, BatchLoader, BatchRequest, LogRenderer, OutputRenderer, PlaybackSession,
    PlaybackState, PngRenderer,
};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncBufReadExt;

/// Command-line overrides for the `play` subcommand.
struct PlayOptions {
    dir: Option<String>,
    frames: Option<usize>,
    rate: Option<f64>,
    ext: Option<String>,
    renderer: Option<RendererKind>,
    output: Option<PathBuf>,
    duration: Option<f64>,
    interactive: bool,
}

impl PlayOptions {
    fn apply(&self, config: &mut Config) {
        if let Some(ref dir) = self.dir {
            config.batch.directory = dir.clone();
        }
        if let Some(frames) = self.frames {
            config.batch.frame_count = frames;
        }
        if let Some(ref ext) = self.ext {
            config.batch.extension = ext.clone();
        }
        if let Some(rate) = self.rate {
            config.playback.frame_rate = rate;
        }
        if let Some(renderer) = self.renderer {
            config.output.renderer = renderer;
        }
        if let Some(ref output) = self.output {
            config.output.directory = output.clone();
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "frameloop=trace,frameloop_ppm=debug".to_string()
        } else {
            "frameloop=info,frameloop_ppm=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Play {
            dir,
            frames,
            rate,
            ext,
            renderer,
            output,
            duration,
            interactive,
        } => {
            let options = PlayOptions {
                dir,
                frames,
                rate,
                ext,
                renderer,
                output,
                duration,
                interactive,
            };
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(play(options, cli.config.as_deref()))
        }
        Commands::Inspect { file, json } => inspect_file(&file, json),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("frameloop {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn play(options: PlayOptions, config_path: Option<&Path>) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;
    options.apply(&mut config);
    config::validate_config(&config)?;

    let run_for = options
        .duration
        .map(Duration::try_from_secs_f64)
        .transpose()
        .context("--duration must be a non-negative number of seconds")?;

    let renderer = match config.output.renderer {
        RendererKind::Log => OutputRenderer::Log(LogRenderer::new()),
        RendererKind::Png => {
            let png = PngRenderer::new(&config.output.directory, config.output.flip_vertical)
                .with_context(|| {
                    format!("Failed to create output directory: {:?}", config.output.directory)
                })?;
            OutputRenderer::Png(png)
        }
    };

    let batch = &config.batch;
    let mut loader = BatchLoader::new(source::source_for(&batch.directory));
    if let Some(limit) = batch.max_in_flight {
        loader = loader.with_max_in_flight(limit);
    }

    let session = PlaybackSession::with_loader(loader, renderer);
    let request =
        BatchRequest::new(batch.directory.clone(), batch.frame_count).with_extension(batch.extension.clone());

    tracing::info!(
        directory = %batch.directory,
        frames = batch.frame_count,
        rate = config.playback.frame_rate,
        "Loading batch"
    );
    session.load(request, config.playback.frame_rate)?;
    let reporter = tokio::spawn(report_progress(session.clone()));

    let deadline = async {
        match run_for {
            Some(duration) => tokio::time::sleep(duration).await,
            None => std::future::pending().await,
        }
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for Ctrl-C")?;
            tracing::info!("Interrupted");
        }
        _ = deadline => {
            tracing::info!("Duration elapsed");
        }
        result = run_commands(session.clone()), if options.interactive => {
            result?;
        }
    }

    session.stop();
    reporter.abort();

    let rendered = session.renderer().lock().frames_rendered();
    let failed = session.failed_frames();
    println!("State: {}", session.state());
    println!("Loaded: {}", session.progress());
    println!("Frames rendered: {}", rendered);
    if !failed.is_empty() {
        println!("Failed frames: {:?}", failed);
    }

    Ok(())
}

/// Log load progress until the batch leaves the loading state.
async fn report_progress(session: PlaybackSession<OutputRenderer>) {
    let mut ticker = tokio::time::interval(Duration::from_millis(250));
    let mut last = None;

    loop {
        ticker.tick().await;

        let state = session.state();
        if state != PlaybackState::Loading {
            if let Some(metadata) = session.metadata() {
                tracing::info!(%state, "Batch ready: {} frames of {}", session.progress().total, metadata);
            }
            // A reload puts the session back into loading.
            let mut states = session.subscribe();
            if states.wait_for(|s| *s == PlaybackState::Loading).await.is_err() {
                return;
            }
            last = None;
            continue;
        }

        let progress = session.progress();
        if last != Some(progress) {
            tracing::info!(
                loaded = progress.loaded,
                total = progress.total,
                "Loading {}",
                progress
            );
            last = Some(progress);
        }
    }
}

/// Apply commands read from stdin until `quit` or end of input.
async fn run_commands(session: PlaybackSession<OutputRenderer>) -> Result<()> {
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let mut words = line.split_whitespace();
        let result = match (words.next(), words.next()) {
            (None, _) => continue,
            (Some("quit" | "exit"), _) => return Ok(()),
            (Some("stop"), None) => {
                session.stop();
                Ok(())
            }
            (Some("play"), None) => session.play(),
            (Some("reload"), None) => session.reload(),
            (Some("rate"), Some(value)) => match value.parse::<f64>() {
                Ok(rate) => session.set_rate(rate),
                Err(_) => {
                    eprintln!("Not a number: {}", value);
                    continue;
                }
            },
            (Some(other), _) => {
                eprintln!("Unknown command: {} (try rate <fps>, stop, play, reload, quit)", other);
                continue;
            }
        };

        match result {
            Ok(()) => println!("{} (rate {} fps)", session.state(), session.rate()),
            Err(e) => eprintln!("Error: {}", e),
        }
    }

    Ok(())
}

fn inspect_file(file: &Path, json: bool) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read frame file: {:?}", file))?;
    let map = frameloop_ppm::decode(&text)
        .with_context(|| format!("Failed to decode frame file: {:?}", file))?;

    if json {
        let value = serde_json::json!({
            "file": file,
            "tag": map.tag,
            "metadata": map.metadata,
            "mean_intensity": mean_intensity(&map.samples, &map.metadata),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("File: {}", file.display());
        println!("Tag: {}", map.tag);
        println!("Size: {}x{}", map.metadata.width, map.metadata.height);
        println!("Max sample: {}", map.metadata.max_sample);
        println!("Pixels: {}", map.metadata.pixel_count());
        println!(
            "Mean intensity: {:.3}",
            mean_intensity(&map.samples, &map.metadata)
        );
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    println!("  Batch: {} ({} frames, .{})", config.batch.directory, config.batch.frame_count, config.batch.extension);
    match config.batch.max_in_flight {
        Some(limit) => println!("  Max in flight: {}", limit),
        None => println!("  Max in flight: unbounded"),
    }
    println!("  Frame rate: {} fps", config.playback.frame_rate);
    println!("  Renderer: {:?}", config.output.renderer);
    if config.output.renderer == RendererKind::Png {
        println!("  Output: {}", config.output.directory.display());
    }

    Ok(())
}
