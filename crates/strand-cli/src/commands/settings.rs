//! Settings file management.

use anyhow::{Context, bail};
use clap::{Args, Subcommand};
use std::path::PathBuf;
use strand_config::ServerSettings;

#[derive(Args)]
pub struct SettingsArgs {
    #[command(subcommand)]
    command: SettingsCommand,
}

#[derive(Subcommand)]
enum SettingsCommand {
    /// Write a settings file with default values
    Init {
        /// Destination file
        path: PathBuf,

        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },

    /// Validate a settings file and print the resolved values
    Show {
        /// Settings file
        path: PathBuf,
    },
}

pub fn run(args: SettingsArgs) -> anyhow::Result<()> {
    match args.command {
        SettingsCommand::Init { path, force } => {
            if path.exists() && !force {
                bail!("{} exists; pass --force to replace it", path.display());
            }
            ServerSettings::default().save(&path)?;
            println!("Wrote {}", path.display());
        }
        SettingsCommand::Show { path } => {
            let settings = ServerSettings::load(&path)?;
            settings
                .validate()
                .with_context(|| format!("{} is invalid", path.display()))?;
            print!("{}", settings.to_toml()?);
        }
    }
    Ok(())
}
