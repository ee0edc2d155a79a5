//! Integration tests for strand-config file handling.

use strand_config::{ConfigError, ServerSettings, ValidationError};
use strand_core::{Engine, EngineState};
use tempfile::TempDir;

// ============================================================================
// Save / Load
// ============================================================================

#[test]
fn save_then_load_preserves_settings() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("server.toml");

    let settings = ServerSettings::default()
        .with_sample_rate(96000)
        .with_channels(6)
        .with_auto_start(true)
        .with_seed(42)
        .with_device("hw:1");
    settings.save(&path).unwrap();

    let loaded = ServerSettings::load(&path).unwrap();
    assert_eq!(loaded, settings);
}

#[test]
fn save_creates_missing_directories() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("deeper").join("server.toml");

    ServerSettings::default().save(&path).unwrap();
    assert!(path.exists());
}

#[test]
fn load_missing_file_reports_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.toml");

    let err = ServerSettings::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::ReadFile { .. }));
    assert!(err.to_string().contains("absent.toml"));
}

#[test]
fn load_hand_written_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("server.toml");
    std::fs::write(
        &path,
        "# studio rig\nsample_rate = 48000\nbuffer_size = 128\nfade_time = 0.2\n",
    )
    .unwrap();

    let settings = ServerSettings::load(&path).unwrap();
    assert_eq!(settings.sample_rate, 48000);
    assert_eq!(settings.buffer_size, 128);
    assert_eq!(settings.fade_time, 0.2);
    assert_eq!(settings.channels, 2);
}

// ============================================================================
// Booting
// ============================================================================

#[test]
fn loaded_settings_boot_an_engine() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("server.toml");
    ServerSettings::default()
        .with_buffer_size(32)
        .with_channels(1)
        .save(&path)
        .unwrap();

    let config = ServerSettings::load(&path).unwrap().engine_config().unwrap();
    let mut engine = Engine::new();
    engine.boot(config).unwrap();
    engine.start().unwrap();
    assert_eq!(engine.state(), EngineState::Started);
    assert_eq!(engine.process_tick().len(), 32);
}

#[test]
fn invalid_file_fails_validation_with_every_field() {
    let settings =
        ServerSettings::from_toml("sample_rate = 10\nchannels = 0\nfade_time = -1.0").unwrap();
    match settings.engine_config().unwrap_err() {
        ConfigError::Validation(ValidationError::Multiple(errors)) => {
            assert_eq!(errors.len(), 3);
        }
        other => panic!("expected multiple validation errors, got {other:?}"),
    }
}
