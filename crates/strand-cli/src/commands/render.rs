//! Offline rendering to a WAV file.

use super::common::{EngineArgs, PatchArgs, build_patch, start_engine};
use anyhow::Context;
use clap::Args;
use std::path::PathBuf;
use strand_io::{BitDepth, render_to_file};

#[derive(Args)]
pub struct RenderArgs {
    /// Output WAV file
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Total length in seconds
    #[arg(long, default_value = "2.0")]
    length: f32,

    /// Sample encoding: 16, 24, 32, or float
    #[arg(long, default_value = "24")]
    bit_depth: String,

    #[command(flatten)]
    engine: EngineArgs,

    #[command(flatten)]
    patch: PatchArgs,
}

pub fn run(args: RenderArgs) -> anyhow::Result<()> {
    let bit_depth = BitDepth::from_name(&args.bit_depth)?;
    let settings = args.engine.settings()?;
    let mut engine = start_engine(&settings)?;
    build_patch(&mut engine, &args.patch)?;

    let samples = engine.seconds_to_samples(args.length);
    let ticks = samples.div_ceil(settings.buffer_size as u64) as usize;

    render_to_file(&mut engine, &args.output, ticks, bit_depth)
        .with_context(|| format!("writing {}", args.output.display()))?;

    println!(
        "Rendered {} ticks ({} frames, {} channels) to {}",
        ticks,
        ticks * settings.buffer_size,
        settings.channels,
        args.output.display()
    );
    Ok(())
}
