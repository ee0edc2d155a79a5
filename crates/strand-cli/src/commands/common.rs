//! Engine setup and patch building shared by `render` and `play`.

use anyhow::{Context, bail};
use clap::{Args, ValueEnum};
use std::path::PathBuf;
use strand_config::ServerSettings;
use strand_core::kernels::{Noise, Sine, TableRead, Tone};
use strand_core::{Arg, Engine, ObjectId};

/// Engine settings: a settings file plus per-field overrides.
#[derive(Args, Debug, Clone, Default)]
pub struct EngineArgs {
    /// Settings file (TOML); defaults apply when omitted
    #[arg(long, value_name = "FILE")]
    pub settings: Option<PathBuf>,

    /// Sample rate in Hz
    #[arg(long)]
    pub sample_rate: Option<u32>,

    /// Block size in samples
    #[arg(long)]
    pub buffer_size: Option<usize>,

    /// Output channel count
    #[arg(long)]
    pub channels: Option<usize>,

    /// Random seed for noise and channel scrambling
    #[arg(long)]
    pub seed: Option<u64>,
}

impl EngineArgs {
    /// Settings file contents with command-line overrides applied.
    pub fn settings(&self) -> anyhow::Result<ServerSettings> {
        let mut settings = match &self.settings {
            Some(path) => ServerSettings::load(path)
                .with_context(|| format!("loading settings from {}", path.display()))?,
            None => ServerSettings::default(),
        };
        if let Some(sr) = self.sample_rate {
            settings.sample_rate = sr;
        }
        if let Some(bs) = self.buffer_size {
            settings.buffer_size = bs;
        }
        if let Some(ch) = self.channels {
            settings.channels = ch;
        }
        if let Some(seed) = self.seed {
            settings.seed = Some(seed);
        }
        Ok(settings)
    }
}

/// Boot and start an engine from `settings`.
pub fn start_engine(settings: &ServerSettings) -> anyhow::Result<Engine> {
    let mut engine = Engine::new();
    engine.boot(settings.engine_config()?)?;
    engine.start()?;
    Ok(engine)
}

/// Sound source for a patch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Source {
    /// One sine per frequency
    #[default]
    Sine,
    /// White noise, one stream per frequency
    Noise,
    /// Loop the file given with --file
    File,
}

/// A source, an optional lowpass, and where it goes.
#[derive(Args, Debug, Clone)]
pub struct PatchArgs {
    /// Sound source
    #[arg(long, value_enum, default_value_t = Source::Sine)]
    pub source: Source,

    /// Frequencies in Hz, comma separated; one stream each
    #[arg(long, value_delimiter = ',', default_value = "440")]
    pub freq: Vec<f32>,

    /// Audio file for --source file
    #[arg(long, value_name = "WAV")]
    pub file: Option<PathBuf>,

    /// Lowpass cutoffs in Hz, comma separated
    #[arg(long, value_delimiter = ',')]
    pub lowpass: Vec<f32>,

    /// Output gain
    #[arg(long, default_value = "0.2")]
    pub gain: f32,

    /// First output channel; negative scrambles streams across channels
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    pub channel: i32,

    /// Channel step between streams
    #[arg(long, default_value = "1")]
    pub increment: usize,

    /// Seconds before the patch starts
    #[arg(long, default_value = "0.0")]
    pub delay: f32,

    /// Seconds the patch sounds; 0 = until the end
    #[arg(long, default_value = "0.0")]
    pub duration: f32,
}

impl Default for PatchArgs {
    fn default() -> Self {
        Self {
            source: Source::Sine,
            freq: vec![440.0],
            file: None,
            lowpass: Vec::new(),
            gain: 0.2,
            channel: 0,
            increment: 1,
            delay: 0.0,
            duration: 0.0,
        }
    }
}

/// Build the patch in `engine` and route it to the output.
///
/// Returns the object sent to the output.
pub fn build_patch(engine: &mut Engine, patch: &PatchArgs) -> anyhow::Result<ObjectId> {
    if patch.freq.is_empty() {
        bail!("at least one frequency is required");
    }
    let freqs = Arg::from(patch.freq.clone());
    let source = match patch.source {
        Source::Sine => engine.create(&Sine, &[("freq", freqs)])?,
        Source::Noise => {
            let streams = vec![1.0; patch.freq.len()];
            engine.create(&Noise, &[("mul", streams.into())])?
        }
        Source::File => {
            let Some(path) = &patch.file else {
                bail!("--source file needs --file");
            };
            let table = strand_io::load_table(engine, path)
                .with_context(|| format!("loading {}", path.display()))?;
            let rate = engine
                .table(table)
                .map(|t| 1.0 / t.duration_secs().max(f32::EPSILON))
                .unwrap_or(1.0);
            engine.create(&TableRead, &[("table", table.into()), ("freq", rate.into())])?
        }
    };

    let head = if patch.lowpass.is_empty() {
        engine.set_param(source, "mul", patch.gain)?;
        source
    } else {
        engine.create(
            &Tone,
            &[
                ("input", source.into()),
                ("freq", patch.lowpass.clone().into()),
                ("mul", patch.gain.into()),
            ],
        )?
    };

    if head != source {
        engine.play(source, patch.duration, patch.delay)?;
    }
    engine.out(
        head,
        patch.channel,
        patch.increment,
        patch.duration,
        patch.delay,
    )?;
    tracing::info!(
        streams = engine.stream_count(head),
        channels = ?engine.out_channels(head),
        "patch routed"
    );
    Ok(head)
}
