//! Integration tests for the `strand` binary.

use std::process::Command;
use tempfile::TempDir;

fn strand_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_strand"))
}

fn run_ok(cmd: &mut Command) -> String {
    let output = cmd.output().expect("failed to run strand");
    assert!(
        output.status.success(),
        "strand failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

// ---------------------------------------------------------------------------
// render / info
// ---------------------------------------------------------------------------

#[test]
fn render_then_info_reports_layout() {
    let dir = TempDir::new().unwrap();
    let wav = dir.path().join("tone.wav");

    run_ok(strand_bin().args([
        "render",
        wav.to_str().unwrap(),
        "--length",
        "0.25",
        "--sample-rate",
        "8000",
        "--buffer-size",
        "100",
        "--channels",
        "2",
        "--freq",
        "220,330",
    ]));
    assert!(wav.exists());

    let stdout = run_ok(strand_bin().arg("info").arg(&wav));
    assert!(stdout.contains("Channels:    2"), "got: {stdout}");
    assert!(stdout.contains("Sample Rate: 8000 Hz"), "got: {stdout}");
    assert!(stdout.contains("2000 frames"), "got: {stdout}");
}

#[test]
fn render_with_negative_channel_scrambles() {
    let dir = TempDir::new().unwrap();
    let wav = dir.path().join("scrambled.wav");

    run_ok(strand_bin().args([
        "render",
        wav.to_str().unwrap(),
        "--length",
        "0.1",
        "--channels",
        "4",
        "--seed",
        "3",
        "--source",
        "noise",
        "--freq",
        "1,1,1,1",
        "--lowpass",
        "2000",
        "--channel",
        "-1",
    ]));
    assert!(wav.exists());
}

#[test]
fn render_rejects_bad_settings() {
    let dir = TempDir::new().unwrap();
    let output = strand_bin()
        .args(["render"])
        .arg(dir.path().join("x.wav"))
        .args(["--channels", "0"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("channels"));
}

#[test]
fn info_on_missing_file_fails() {
    let dir = TempDir::new().unwrap();
    let output = strand_bin()
        .arg("info")
        .arg(dir.path().join("missing.wav"))
        .output()
        .unwrap();
    assert!(!output.status.success());
}

// ---------------------------------------------------------------------------
// settings
// ---------------------------------------------------------------------------

#[test]
fn settings_init_show_and_use() {
    let dir = TempDir::new().unwrap();
    let settings = dir.path().join("conf").join("server.toml");

    run_ok(strand_bin().arg("settings").arg("init").arg(&settings));
    let stdout = run_ok(strand_bin().arg("settings").arg("show").arg(&settings));
    assert!(stdout.contains("sample_rate = 44100"), "got: {stdout}");

    // A second init without --force refuses to overwrite.
    let again = strand_bin()
        .arg("settings")
        .arg("init")
        .arg(&settings)
        .output()
        .unwrap();
    assert!(!again.status.success());

    let wav = dir.path().join("out.wav");
    run_ok(
        strand_bin()
            .arg("render")
            .arg(&wav)
            .arg("--settings")
            .arg(&settings)
            .args(["--length", "0.05"]),
    );
    let stdout = run_ok(strand_bin().arg("info").arg(&wav));
    assert!(stdout.contains("Sample Rate: 44100 Hz"), "got: {stdout}");
}

#[test]
fn help_lists_commands() {
    let stdout = run_ok(strand_bin().arg("--help"));
    for cmd in ["render", "play", "info", "devices", "settings"] {
        assert!(stdout.contains(cmd), "help should list '{cmd}'");
    }
}
