//! Client CLI subcommands for a running build service.
//!
//! Provides commands to:
//! - `build`: Request a build and print its hash
//! - `info`: Print metadata of a build
//! - `download`: Save the firmware binary of a build

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;

use crate::client::FirmwareClient;
use crate::domain::BuildId;

/// Client-side subcommands
#[derive(Subcommand, Debug)]
pub enum ClientCommands {
    /// Request a firmware build
    Build {
        /// Configuration JSON file (reads from stdin if not provided)
        input: Option<PathBuf>,
    },

    /// Show metadata of a build
    Info {
        /// Build hash
        hash: String,
    },

    /// Download the firmware binary of a build
    Download {
        /// Build hash
        hash: String,

        /// Output file
        #[arg(short, long, default_value = "ledmacher.bin")]
        output: PathBuf,
    },
}

/// Execute client subcommands against `server`
pub async fn execute(server: &str, command: ClientCommands) -> Result<()> {
    let client = FirmwareClient::new(server);

    match command {
        ClientCommands::Build { input } => {
            let config = super::read_build_config(input.as_deref())?;
            let id = client.build(&config).await?;
            println!("{}", id);
        }
        ClientCommands::Info { hash } => {
            let id = parse_hash(&hash)?;
            match client.info(&id).await? {
                Some(info) => println!("{}", serde_json::to_string_pretty(&info)?),
                None => anyhow::bail!("Firmware not found: {}", id),
            }
        }
        ClientCommands::Download { hash, output } => {
            let id = parse_hash(&hash)?;
            let bytes = client.download(&id, &output).await?;
            eprintln!("Wrote {} bytes to {}", bytes, output.display());
        }
    }

    Ok(())
}

fn parse_hash(hash: &str) -> Result<BuildId> {
    BuildId::parse(hash).with_context(|| format!("Invalid build hash: {}", hash))
}
