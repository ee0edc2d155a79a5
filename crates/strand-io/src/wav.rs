//! WAV file reading and writing.

use crate::{Error, Result};
use hound::{SampleFormat, WavReader, WavWriter};
use std::path::Path;
use strand_core::{Engine, Table, TableId};

/// Sample encoding used when writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BitDepth {
    /// 16-bit signed integer.
    Int16,
    /// 24-bit signed integer.
    #[default]
    Int24,
    /// 32-bit signed integer.
    Int32,
    /// 32-bit IEEE float.
    Float32,
}

impl BitDepth {
    /// Bits per sample.
    pub fn bits(self) -> u16 {
        match self {
            BitDepth::Int16 => 16,
            BitDepth::Int24 => 24,
            BitDepth::Int32 | BitDepth::Float32 => 32,
        }
    }

    /// Parse a command-line style name: `16`, `24`, `32`, or `float`.
    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "16" | "int16" => Ok(BitDepth::Int16),
            "24" | "int24" => Ok(BitDepth::Int24),
            "32" | "int32" => Ok(BitDepth::Int32),
            "float" | "f32" | "float32" => Ok(BitDepth::Float32),
            other => Err(Error::UnsupportedFormat(other.to_string())),
        }
    }

    fn spec(self, sample_rate: u32, channels: u16) -> hound::WavSpec {
        hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: self.bits(),
            sample_format: match self {
                BitDepth::Float32 => SampleFormat::Float,
                _ => SampleFormat::Int,
            },
        }
    }
}

/// A decoded audio file.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFile {
    /// Samples per channel.
    pub frames: usize,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u16,
    /// Interleaved samples in `[-1, 1]`.
    pub samples: Vec<f32>,
}

impl AudioFile {
    /// Length in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames as f64 / f64::from(self.sample_rate)
    }

    /// One channel, deinterleaved. Empty when `index` is out of range.
    pub fn channel(&self, index: usize) -> Vec<f32> {
        let channels = usize::from(self.channels);
        if index >= channels {
            return Vec::new();
        }
        self.samples
            .iter()
            .skip(index)
            .step_by(channels)
            .copied()
            .collect()
    }

    /// All channels averaged into one.
    pub fn mixdown(&self) -> Vec<f32> {
        let channels = usize::from(self.channels.max(1));
        if channels == 1 {
            return self.samples.clone();
        }
        self.samples
            .chunks(channels)
            .map(|chunk| chunk.iter().sum::<f32>() / channels as f32)
            .collect()
    }
}

/// Read a WAV file into interleaved `f32` samples.
pub fn read_audio_file<P: AsRef<Path>>(path: P) -> Result<AudioFile> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()?,
        SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
    };

    let channels = spec.channels.max(1);
    Ok(AudioFile {
        frames: samples.len() / usize::from(channels),
        sample_rate: spec.sample_rate,
        channels,
        samples,
    })
}

/// Write interleaved samples to a WAV file.
///
/// Integer depths clip to `[-1, 1)`.
pub fn write_audio_file<P: AsRef<Path>>(
    path: P,
    samples: &[f32],
    sample_rate: u32,
    channels: u16,
    bit_depth: BitDepth,
) -> Result<()> {
    if channels == 0 || samples.len() % usize::from(channels) != 0 {
        return Err(Error::PartialFrame {
            samples: samples.len(),
            channels,
        });
    }

    let mut writer = WavWriter::create(path, bit_depth.spec(sample_rate, channels))?;
    if bit_depth == BitDepth::Float32 {
        for &sample in samples {
            writer.write_sample(sample)?;
        }
    } else {
        let max_val = (1i64 << (bit_depth.bits() - 1)) as f64;
        for &sample in samples {
            let scaled = (f64::from(sample) * max_val).clamp(-max_val, max_val - 1.0);
            writer.write_sample(scaled as i32)?;
        }
    }

    writer.finalize()?;
    Ok(())
}

/// Load a WAV file as a mono table and register it with `engine`.
///
/// Multi-channel files are averaged.
pub fn load_table<P: AsRef<Path>>(engine: &mut Engine, path: P) -> Result<TableId> {
    let path = path.as_ref();
    let file = read_audio_file(path)?;
    let id = engine.add_table(Table::new(file.mixdown(), file.sample_rate as f32))?;
    tracing::debug!(path = %path.display(), frames = file.frames, "table loaded");
    Ok(id)
}

/// Run `ticks` ticks of `engine` and write the result to `path`.
pub fn render_to_file<P: AsRef<Path>>(
    engine: &mut Engine,
    path: P,
    ticks: usize,
    bit_depth: BitDepth,
) -> Result<()> {
    let sample_rate = engine.config().sample_rate.round() as u32;
    let channels = engine.config().channels as u16;
    let samples = engine.render(ticks);
    write_audio_file(path, &samples, sample_rate, channels, bit_depth)
}
