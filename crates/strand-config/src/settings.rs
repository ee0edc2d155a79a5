//! Server settings files.

use serde::{Deserialize, Serialize};
use std::path::Path;
use strand_core::EngineConfig;

use crate::error::ConfigError;
use crate::validation::validate_settings;

/// Boot-time settings for an engine, as stored on disk.
///
/// # TOML Format
///
/// ```toml
/// sample_rate = 48000
/// buffer_size = 256
/// channels = 2
/// auto_start_children = true
/// fade_time = 0.05
/// seed = 7
/// device = "default"
/// ```
///
/// Every field is optional; missing fields take the [`Default`] values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Sample rate in Hz.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Samples per channel per tick.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Interleaved output channels.
    #[serde(default = "default_channels")]
    pub channels: usize,

    /// Play and stop the objects an object reads along with it.
    #[serde(default)]
    pub auto_start_children: bool,

    /// Seed for noise and channel scrambling; entropy when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Default crossfade seconds when an input is replaced via `set_param`.
    #[serde(default = "default_fade_time")]
    pub fade_time: f32,

    /// Output device name; the host default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
}

fn default_sample_rate() -> u32 {
    44100
}

fn default_buffer_size() -> usize {
    256
}

fn default_channels() -> usize {
    2
}

fn default_fade_time() -> f32 {
    0.05
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            buffer_size: default_buffer_size(),
            channels: default_channels(),
            auto_start_children: false,
            seed: None,
            fade_time: default_fade_time(),
            device: None,
        }
    }
}

impl ServerSettings {
    /// Set the sample rate.
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Set the block size.
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Set the output channel count.
    pub fn with_channels(mut self, channels: usize) -> Self {
        self.channels = channels;
        self
    }

    /// Enable or disable child auto-start.
    pub fn with_auto_start(mut self, enabled: bool) -> Self {
        self.auto_start_children = enabled;
        self
    }

    /// Fix the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the output device.
    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = Some(device.into());
        self
    }

    /// Load settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml(&content)
    }

    /// Parse settings from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Save the settings to a TOML file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check every field against its supported range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Ok(validate_settings(self)?)
    }

    /// Validate and convert to the engine's boot configuration.
    pub fn engine_config(&self) -> Result<EngineConfig, ConfigError> {
        self.validate()?;
        Ok(EngineConfig {
            sample_rate: self.sample_rate as f32,
            buffer_size: self.buffer_size,
            channels: self.channels,
            auto_start_children: self.auto_start_children,
            seed: self.seed,
            fade_time: self.fade_time,
        })
    }
}
