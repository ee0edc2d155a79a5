//! Display audio file metadata.

use clap::Args;
use strand_io::read_audio_file;

/// Display audio file information.
#[derive(Args)]
pub struct InfoArgs {
    /// Path to the WAV file
    pub file: std::path::PathBuf,
}

/// Run the info command.
pub fn run(args: InfoArgs) -> anyhow::Result<()> {
    let file = read_audio_file(&args.file)?;
    let peak = file.samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));

    println!("File:        {}", args.file.display());
    println!("Channels:    {}", file.channels);
    println!("Sample Rate: {} Hz", file.sample_rate);
    println!(
        "Duration:    {:.3}s ({} frames)",
        file.duration_secs(),
        file.frames
    );
    println!("Peak:        {peak:.4}");
    Ok(())
}
