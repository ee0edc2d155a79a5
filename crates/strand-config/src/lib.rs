//! Settings files for the strand audio-graph runtime.
//!
//! A [`ServerSettings`] holds everything needed to boot an
//! [`Engine`](strand_core::Engine): sample rate, block size, channel count,
//! auto-start mode, seed, and the default crossfade time. Settings are read
//! from and written to TOML, range-checked, and converted into an
//! [`EngineConfig`](strand_core::EngineConfig).
//!
//! # Example
//!
//! ```rust
//! use strand_config::ServerSettings;
//! use strand_core::Engine;
//!
//! let settings = ServerSettings::from_toml("sample_rate = 48000\nchannels = 4")?;
//! let mut engine = Engine::new();
//! engine.boot(settings.engine_config()?)?;
//! assert_eq!(engine.config().channels, 4);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod error;
mod settings;

/// Range checks for settings fields.
pub mod validation;

pub use error::ConfigError;
pub use settings::ServerSettings;
pub use validation::{ValidationError, ValidationResult, validate_settings};
