//! Real-time playback of a patch.

use super::common::{EngineArgs, PatchArgs, build_patch, start_engine};
use clap::Args;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use strand_io::AudioOutput;

#[derive(Args)]
pub struct PlayArgs {
    /// Output device (index or name, partial match)
    #[arg(short, long)]
    device: Option<String>,

    /// Stop after this many seconds; runs until Ctrl+C when omitted
    #[arg(long)]
    length: Option<f32>,

    #[command(flatten)]
    engine: EngineArgs,

    #[command(flatten)]
    patch: PatchArgs,
}

pub fn run(args: PlayArgs) -> anyhow::Result<()> {
    let settings = args.engine.settings()?;
    let mut engine = start_engine(&settings)?;
    build_patch(&mut engine, &args.patch)?;

    let device = args.device.or_else(|| settings.device.clone());
    let mut output = AudioOutput::new(device.as_deref())?;
    println!(
        "Playing on {} at {} Hz... Press Ctrl+C to stop.",
        output.device_name(),
        settings.sample_rate
    );

    let running = output.running();
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        println!("\nStopping...");
        r.store(false, Ordering::SeqCst);
    })?;

    if let Some(length) = args.length.filter(|l| l.is_finite() && *l > 0.0) {
        let r = Arc::clone(&running);
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_secs_f32(length));
            r.store(false, Ordering::SeqCst);
        });
    }

    output.run(Arc::new(Mutex::new(engine)))?;
    println!("Done!");
    Ok(())
}
