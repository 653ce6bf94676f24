//! Bulkadd CLI - bulk device provisioning for LibreNMS
//!
//! This binary reads a CSV device table and drives the LibreNMS API:
//! - Ensure each device exists (add if absent, SNMP or ping-only mode)
//! - Set the display name when the row carries one
//! - Assign or create a named location with coordinates

use anyhow::Result;
use bulkadd_core::{client, config, provision, table};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::error;

#[derive(Parser)]
#[command(name = "bulkadd")]
#[command(version)]
#[command(about = "Bulk device provisioning for LibreNMS")]
#[command(long_about = "
Bulkadd reads a CSV device table and registers each row with a LibreNMS
instance over its HTTP API. Devices that already exist are skipped;
per-row failures never stop the run.

Quick start:
  1. Configure the server:  export LIBRENMS_URL=... LIBRENMS_TOKEN=...
  2. Validate the table:    bulkadd check
  3. Provision devices:     bulkadd run

CSV columns: hostname (required), community, syslocation, lat, lng,
snmp_force, snmp_version, sysname, hardware.
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for scripting
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Provision every device in the table
    Run {
        /// Path to the device table
        #[arg(default_value = "data/bulkadd.csv")]
        file: PathBuf,
    },

    /// Parse and display the device table without touching the server
    Check {
        /// Path to the device table
        #[arg(default_value = "data/bulkadd.csv")]
        file: PathBuf,
    },

    /// Show configuration paths and settings
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("bulkadd={},bulkadd_core={}", log_level, log_level).into()
            }),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Run { ref file } => cmd_run(&cli, file).await,
        Commands::Check { ref file } => cmd_check(&cli, file),
        Commands::Config => cmd_config(&cli),
    }
}

async fn cmd_run(cli: &Cli, file: &PathBuf) -> Result<()> {
    let server = config::load_server_config()?;
    let client = client::LibrenmsClient::new(&server)?;

    // A table that cannot be loaded aborts the whole run before any
    // device is touched. Per-row failures later never do.
    let records = match table::load_records(file) {
        Ok(records) => records,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let report = provision::provision_all(&client, &records).await;

    match cli.format {
        OutputFormat::Text => {}
        OutputFormat::Json => {
            println!("{}", serde_json::to_string(&report)?);
        }
    }

    Ok(())
}

fn cmd_check(cli: &Cli, file: &PathBuf) -> Result<()> {
    let records = match table::load_records(file) {
        Ok(records) => records,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    match cli.format {
        OutputFormat::Text => {
            println!("{} devices in {}:", records.len(), file.display());
            println!();
            for record in &records {
                let mode = if record.is_snmp() { "snmp" } else { "ping-only" };
                let location = record.syslocation.as_deref().unwrap_or("-");
                println!("  {:24} {:9}  {}", record.hostname, mode, location);
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string(&records)?);
        }
    }

    Ok(())
}

fn cmd_config(cli: &Cli) -> Result<()> {
    let config_path = config::get_config_file_path_string();
    let server = config::load_server_config();

    match cli.format {
        OutputFormat::Text => {
            println!("Configuration");
            println!("=============");
            println!();
            println!("Config file:  {}", config_path);
            match &server {
                Ok(server) => {
                    println!("API endpoint: {} (from {})", server.api_url, server.source);
                    println!("API token:    configured");
                }
                Err(e) => {
                    println!("API endpoint: not configured");
                    println!("              ({})", e);
                }
            }
            println!();
            println!("Environment variables:");
            println!("  LIBRENMS_URL   - Server address or full API URL");
            println!("  LIBRENMS_TOKEN - API token");
            println!();
            println!("Example config.toml:");
            println!();
            println!("{}", config::generate_example_config());
        }
        OutputFormat::Json => {
            let (api_url, source) = match &server {
                Ok(server) => (Some(server.api_url.clone()), Some(server.source.to_string())),
                Err(_) => (None, None),
            };
            println!(
                "{}",
                serde_json::json!({
                    "config_file": config_path,
                    "api_url": api_url,
                    "api_source": source,
                    "configured": server.is_ok(),
                })
            );
        }
    }

    Ok(())
}
