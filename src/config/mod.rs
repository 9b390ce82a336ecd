mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./frameloop.toml",
        "~/.config/frameloop/config.toml",
        "/etc/frameloop/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    let batch = &config.batch;

    if batch.frame_count == 0 {
        anyhow::bail!("batch.frame_count must be at least 1");
    }

    if batch.extension.is_empty() {
        anyhow::bail!("batch.extension cannot be empty");
    }

    if batch.max_in_flight == Some(0) {
        anyhow::bail!("batch.max_in_flight cannot be 0");
    }

    crate::error::validate_rate(config.playback.frame_rate)
        .context("playback.frame_rate must be a positive number")?;

    if !crate::source::is_remote(&batch.directory) && !Path::new(&batch.directory).exists() {
        tracing::warn!("Frame directory does not exist: {}", batch.directory);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn empty_file_uses_defaults() {
        let file = write_config("");
        let config = load_config(file.path()).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.batch.directory, "frames");
        assert_eq!(config.batch.extension, "ppm");
        assert_eq!(config.playback.frame_rate, 10.0);
        assert_eq!(config.output.renderer, RendererKind::Log);
        assert!(config.output.flip_vertical);
    }

    #[test]
    fn full_file_parses() {
        let file = write_config(
            r#"
[batch]
directory = "https://example.org/run-1"
frame_count = 100
extension = "pgm"
max_in_flight = 8

[playback]
frame_rate = 24.0

[output]
renderer = "png"
directory = "/tmp/out"
flip_vertical = false
"#,
        );
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.batch.frame_count, 100);
        assert_eq!(config.batch.extension, "pgm");
        assert_eq!(config.batch.max_in_flight, Some(8));
        assert_eq!(config.playback.frame_rate, 24.0);
        assert_eq!(config.output.renderer, RendererKind::Png);
        assert_eq!(config.output.directory, Path::new("/tmp/out"));
        assert!(!config.output.flip_vertical);
    }

    #[test]
    fn invalid_values_are_rejected() {
        for contents in [
            "[batch]\nframe_count = 0",
            "[batch]\nextension = \"\"",
            "[batch]\nmax_in_flight = 0",
            "[playback]\nframe_rate = 0.0",
            "[playback]\nframe_rate = -2.5",
            "[playback]\nframe_rate = nan",
        ] {
            let file = write_config(contents);
            assert!(load_config(file.path()).is_err(), "accepted: {contents}");
        }
    }

    #[test]
    fn unknown_renderer_is_a_parse_error() {
        let file = write_config("[output]\nrenderer = \"svg\"");
        let err = load_config(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("parse"));
    }

    #[test]
    fn missing_explicit_path_is_an_error() {
        assert!(load_config_or_default(Some(Path::new("/nonexistent/frameloop.toml"))).is_err());
    }

    #[test]
    fn renderer_kind_from_str() {
        assert_eq!("PNG".parse::<RendererKind>(), Ok(RendererKind::Png));
        assert_eq!("log".parse::<RendererKind>(), Ok(RendererKind::Log));
        assert!("svg".parse::<RendererKind>().is_err());
    }
}
