//! Config command - manage grounded configuration

use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};

use crate::config::Config;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,

    /// Initialize config file with defaults
    Init {
        /// Overwrite existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Show config file path
    Path,
}

pub async fn run(args: ConfigArgs, explicit: Option<&Path>) -> anyhow::Result<()> {
    let path: PathBuf = explicit.map(Path::to_path_buf).unwrap_or_else(Config::config_path);

    match args.command {
        ConfigCommands::Show => {
            let mut config = if path.exists() {
                println!("# Config file: {}", path.display());
                Config::load_from(&path)?
            } else {
                println!("# Config file: {} (not found, using defaults)", path.display());
                Config::default()
            };
            if config.embedding.api_key.is_some() {
                config.embedding.api_key = Some("***".to_string());
            }
            if config.generation.api_key.is_some() {
                config.generation.api_key = Some("***".to_string());
            }
            println!();
            print!("{}", toml::to_string_pretty(&config)?);

            if let Err(e) = config.validate() {
                eprintln!("\nwarning: {:#}", e);
            }
        }

        ConfigCommands::Init { force } => {
            if !Config::write_example(&path, force)? {
                anyhow::bail!(
                    "Config file already exists at {}. Use --force to overwrite.",
                    path.display()
                );
            }
            println!("Created config file at {}", path.display());
            println!();
            println!("Edit the file to choose the embedding model, index location and generation backend.");
        }

        ConfigCommands::Path => {
            println!("{}", path.display());
        }
    }

    Ok(())
}
