//! CLI end-to-end tests
//!
//! Tests for the frameloop command-line interface.

use assert_cmd::prelude::*;
use frameloop::FrameMetadata;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

/// Get a command for the frameloop binary
#[allow(deprecated)]
fn frameloop_cmd() -> Command {
    Command::cargo_bin("frameloop").unwrap()
}

/// Write `count` frames of `meta` into `dir`; frame `i` is filled with `i`.
fn write_frames(dir: &Path, count: usize, meta: &FrameMetadata) {
    for i in 0..count {
        let samples = vec![i as u16; meta.sample_count()];
        fs::write(dir.join(format!("{i}.ppm")), frameloop_ppm::encode(meta, &samples)).unwrap();
    }
}

#[test]
fn test_cli_no_args_shows_help() {
    let mut cmd = frameloop_cmd();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_version_command() {
    let mut cmd = frameloop_cmd();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("frameloop"))
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_play_help() {
    let mut cmd = frameloop_cmd();
    cmd.args(["play", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--rate"))
        .stdout(predicate::str::contains("--interactive"));
}

#[test]
fn test_cli_inspect_json() {
    let dir = tempdir().unwrap();
    let meta = FrameMetadata::new(3, 2, 255);
    write_frames(dir.path(), 1, &meta);

    let output = frameloop_cmd()
        .args(["inspect", "--json"])
        .arg(dir.path().join("0.ppm"))
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["tag"], "P3");
    assert_eq!(json["metadata"]["width"], 3);
    assert_eq!(json["metadata"]["height"], 2);
    assert_eq!(json["metadata"]["max_sample"], 255);
}

#[test]
fn test_cli_inspect_malformed_file() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("bad.ppm");
    fs::write(&file, "P3\n2 2\n255\n1 2 3\n").unwrap();

    frameloop_cmd()
        .arg("inspect")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("sample count mismatch"));
}

#[test]
fn test_cli_inspect_missing_file() {
    frameloop_cmd()
        .args(["inspect", "/nonexistent/0.ppm"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_cli_validate_config() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("frameloop.toml");
    fs::write(
        &config,
        "[batch]\ndirectory = \"frames\"\nframe_count = 12\n\n[playback]\nframe_rate = 24.0\n",
    )
    .unwrap();

    frameloop_cmd()
        .arg("validate")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("valid"))
        .stdout(predicate::str::contains("12 frames"))
        .stdout(predicate::str::contains("24 fps"));
}

#[test]
fn test_cli_validate_rejects_zero_rate() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("frameloop.toml");
    fs::write(&config, "[playback]\nframe_rate = 0.0\n").unwrap();

    frameloop_cmd()
        .arg("validate")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("frame_rate"));
}

#[test]
fn test_cli_play_png_for_duration() {
    let frames = tempdir().unwrap();
    let render = tempdir().unwrap();
    write_frames(frames.path(), 3, &FrameMetadata::new(4, 4, 255));

    frameloop_cmd()
        .current_dir(frames.path())
        .arg("play")
        .arg("--dir")
        .arg(frames.path())
        .args(["--frames", "3", "--rate", "20", "--renderer", "png", "--duration", "1"])
        .arg("--output")
        .arg(render.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Loaded: 3/3"));

    assert!(render.path().join("000000.png").exists());
}

#[test]
fn test_cli_play_rejects_bad_rate() {
    let frames = tempdir().unwrap();
    frameloop_cmd()
        .current_dir(frames.path())
        .arg("play")
        .arg("--dir")
        .arg(frames.path())
        .args(["--rate=-1", "--duration", "0.1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("frame_rate"));
}
