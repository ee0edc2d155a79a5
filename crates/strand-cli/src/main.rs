//! Strand CLI - render and play audio graphs from the command line.

mod commands;

use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "strand")]
#[command(author, version, about = "Strand audio-graph runtime CLI", long_about = None)]
struct Cli {
    /// Log more (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a patch to a WAV file
    Render(commands::render::RenderArgs),

    /// Play a patch on an output device
    Play(commands::play::PlayArgs),

    /// Show audio file metadata
    Info(commands::info::InfoArgs),

    /// List output devices
    Devices,

    /// Create or inspect a settings file
    Settings(commands::settings::SettingsArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| level.into()))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Render(args) => commands::render::run(args),
        Commands::Play(args) => commands::play::run(args),
        Commands::Info(args) => commands::info::run(args),
        Commands::Devices => commands::devices::run(),
        Commands::Settings(args) => commands::settings::run(args),
    }
}
