//! Command-line interface for ledmacher.
//!
//! Provides commands for running the build service, rendering
//! configurations, inspecting stored builds, and talking to a running
//! service as a client.

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;

use crate::adapters::CommandBuilder;
use crate::config::{self, ResolvedConfig};
use crate::core::{ArtifactStore, FirmwareService};
use crate::domain::{BuildConfig, BuildId};
use crate::server;

pub mod client;

/// ledmacher - LED firmware build service
#[derive(Parser, Debug)]
#[command(name = "ledmacher")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP build service
    Serve {
        /// Address to bind to (overrides config)
        #[arg(short, long)]
        bind: Option<String>,

        /// Artifact directory root (overrides config)
        #[arg(long)]
        build_dir: Option<PathBuf>,

        /// Build script to run (overrides config)
        #[arg(long)]
        builder: Option<PathBuf>,

        /// Delay before answering builds and downloads, in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,
    },

    /// Print the header a configuration renders to
    Render {
        /// Configuration JSON file (reads from stdin if not provided)
        input: Option<PathBuf>,
    },

    /// Show metadata of a stored build
    Show {
        /// Build hash
        hash: String,
    },

    /// Show resolved configuration (debug)
    Config,

    /// Talk to a running build service
    Client {
        /// Service base URL
        #[arg(short, long, default_value = "http://localhost:5544")]
        server: String,

        #[command(subcommand)]
        command: client::ClientCommands,
    },
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Serve {
                bind,
                build_dir,
                builder,
                delay_ms,
            } => {
                let mut cfg = config::load_config()?;
                if let Some(bind) = bind {
                    cfg.bind = bind;
                }
                if let Some(dir) = build_dir {
                    cfg.build_dir = dir;
                }
                if let Some(builder) = builder {
                    cfg.builder = builder;
                }
                if let Some(ms) = delay_ms {
                    cfg.settle.response_delay = std::time::Duration::from_millis(ms);
                }
                serve(cfg).await
            }
            Commands::Render { input } => render(input.as_deref()),
            Commands::Show { hash } => show_build(&hash).await,
            Commands::Config => show_config(),
            Commands::Client { server, command } => client::execute(&server, command).await,
        }
    }
}

/// Assemble the firmware service described by `cfg`
pub fn service_from_config(cfg: &ResolvedConfig) -> FirmwareService {
    let builder = CommandBuilder::new(&cfg.builder)
        .with_working_dir(&cfg.working_dir)
        .with_timeout(cfg.build_timeout);
    let store = ArtifactStore::new(&cfg.build_dir)
        .with_file_names(&cfg.metadata_file, &cfg.binary_file);

    FirmwareService::new(Arc::new(builder), store).with_settle(cfg.settle.clone())
}

/// Run the HTTP service until Ctrl-C
async fn serve(cfg: ResolvedConfig) -> Result<()> {
    let service = Arc::new(service_from_config(&cfg));

    let listener = TcpListener::bind(&cfg.bind)
        .await
        .with_context(|| format!("Failed to bind {}", cfg.bind))?;

    server::serve(listener, service, server::shutdown_signal()).await
}

/// Read a build configuration from a file or stdin
pub(crate) fn read_build_config(input: Option<&Path>) -> Result<BuildConfig> {
    let json = match input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read from stdin")?;
            buffer
        }
    };

    serde_json::from_str(&json).context("Invalid build configuration")
}

/// Print the rendered header for a configuration
fn render(input: Option<&Path>) -> Result<()> {
    let config = read_build_config(input)?;
    print!("{}", config.render_header());
    Ok(())
}

/// Show metadata of a stored build from the local artifact directory
async fn show_build(hash: &str) -> Result<()> {
    let cfg = config::load_config()?;
    let service = service_from_config(&cfg);
    let id = BuildId::parse(hash).with_context(|| format!("Invalid build hash: {}", hash))?;

    if !service.store().exists(&id).await {
        anyhow::bail!("No artifact directory for {} in {}", id, cfg.build_dir.display());
    }

    let info = service
        .info(&id)
        .await
        .with_context(|| format!("Failed to read build {}", id))?;

    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}

/// Show resolved configuration
fn show_config() -> Result<()> {
    let cfg = config::load_config()?;

    println!("ledmacher configuration");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Server:");
    println!("  Bind:           {}", cfg.bind);
    println!();
    println!("Builder:");
    println!("  Command:        {}", cfg.builder.display());
    println!("  Working dir:    {}", cfg.working_dir.display());
    match cfg.build_timeout {
        Some(t) => println!("  Timeout:        {}s", t.as_secs()),
        None => println!("  Timeout:        (none)"),
    }
    println!();
    println!("Store:");
    println!("  Root:           {}", cfg.build_dir.display());
    println!("  Metadata file:  {}", cfg.metadata_file);
    println!("  Binary file:    {}", cfg.binary_file);
    println!();
    println!("Settle:");
    println!("  Response delay: {}ms", cfg.settle.response_delay.as_millis());
    println!("  Meta retries:   {}", cfg.settle.metadata_retries);
    println!("  Retry interval: {}ms", cfg.settle.retry_interval.as_millis());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve_flags() {
        let cli = Cli::try_parse_from([
            "ledmacher",
            "serve",
            "--bind",
            "127.0.0.1:9000",
            "--delay-ms",
            "0",
        ])
        .unwrap();

        match cli.command {
            Commands::Serve { bind, delay_ms, .. } => {
                assert_eq!(bind.as_deref(), Some("127.0.0.1:9000"));
                assert_eq!(delay_ms, Some(0));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_service_from_config_uses_store_settings() {
        let cfg = ResolvedConfig {
            build_dir: PathBuf::from("/srv/builds"),
            binary_file: "fw.bin".to_string(),
            ..Default::default()
        };

        let service = service_from_config(&cfg);
        assert_eq!(service.store().root(), Path::new("/srv/builds"));
        assert_eq!(service.store().binary_file_name(), "fw.bin");
    }

    #[test]
    fn test_read_build_config_from_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("sample.json");
        std::fs::write(
            &path,
            r#"{"num_leds":16,"wait_color":500,"wait_gradient":10,"gradient_steps":100,"colors":[{"r":0,"g":240,"b":240}]}"#,
        )
        .unwrap();

        let config = read_build_config(Some(&path)).unwrap();
        assert_eq!(config.num_leds, 16);
        assert_eq!(config.colors.len(), 1);
    }
}
