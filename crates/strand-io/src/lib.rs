//! Audio I/O for the strand audio-graph runtime.
//!
//! - **Audio files**: [`read_audio_file`] and [`write_audio_file`] move
//!   interleaved samples to and from WAV; [`load_table`] registers a file as an
//!   engine [`Table`](strand_core::Table); [`render_to_file`] bounces ticks to disk
//! - **Real-time output**: [`AudioOutput`] drives a shared
//!   [`Engine`](strand_core::Engine) from the device callback
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use strand_core::{Engine, EngineConfig, kernels::TableRead};
//! use strand_io::{BitDepth, load_table, render_to_file};
//!
//! let mut engine = Engine::new();
//! engine.boot(EngineConfig::default())?;
//! engine.start()?;
//!
//! let table = load_table(&mut engine, "loop.wav")?;
//! let player = engine.create(&TableRead, &[("table", table.into())])?;
//! engine.out(player, 0, 1, 0.0, 0.0)?;
//!
//! render_to_file(&mut engine, "bounce.wav", 1000, BitDepth::Int24)?;
//! # Ok::<(), strand_io::Error>(())
//! ```

mod stream;
mod wav;

pub use stream::{AudioDevice, AudioOutput, BlockAdapter, list_devices};
pub use wav::{
    AudioFile, BitDepth, load_table, read_audio_file, render_to_file, write_audio_file,
};

/// Error types for audio I/O operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// WAV file read/write error.
    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    /// Audio stream setup or runtime error.
    #[error("Audio stream error: {0}")]
    Stream(String),

    /// No audio device available on the system.
    #[error("No audio device available")]
    NoDevice,

    /// The requested sample format is not supported.
    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    /// The requested audio device was not found.
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// Interleaved samples do not divide into whole frames.
    #[error("{samples} samples do not form whole frames of {channels} channels")]
    PartialFrame {
        /// Number of samples supplied.
        samples: usize,
        /// Channel count requested.
        channels: u16,
    },

    /// The engine rejected the operation.
    #[error("Engine error: {0}")]
    Engine(#[from] strand_core::EngineError),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type for audio I/O operations.
pub type Result<T> = std::result::Result<T, Error>;
