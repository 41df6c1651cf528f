//! simpleadmin CLI - Command-line tool for the router's AT command executor
//!
//! Runs AT commands and the common query batches against a router running
//! the simpleadmin web interface, and changes the radio settings it exposes.

mod commands;
mod config;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use simpleadmin_client::parse::{LteCellLock, NrCellLock};
use simpleadmin_client::radio::{BandClass, Nr5gMode, PdpType, Rat};
use simpleadmin_client::{AtClient, ClientConfig};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::commands::configure::parse_lte_cell;
use crate::config::{CliOverrides, Config, MergedConfig};
use crate::output::{OutputContext, OutputFormat};

#[derive(Parser, Debug)]
#[command(name = "simpleadmin-cli")]
#[command(author, version, about = "simpleadmin AT command CLI")]
#[command(propagate_version = true)]
struct Cli {
    /// Router URL [default: http://192.168.225.1]
    #[arg(short, long, env = "SIMPLEADMIN_SERVER")]
    server: Option<String>,

    /// Executor path on the router
    #[arg(long, env = "SIMPLEADMIN_ENDPOINT")]
    endpoint: Option<String>,

    /// Retries after the first attempt
    #[arg(long, env = "SIMPLEADMIN_RETRIES", allow_negative_numbers = true)]
    retries: Option<i64>,

    /// Per-attempt timeout in milliseconds
    #[arg(long, env = "SIMPLEADMIN_TIMEOUT_MS")]
    timeout_ms: Option<f64>,

    /// Configuration file path
    #[arg(short, long, env = "SIMPLEADMIN_CONFIG")]
    config: Option<PathBuf>,

    /// Output format [default: table]
    #[arg(short, long, value_enum)]
    output: Option<OutputFormat>,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Minimal output (for scripting)
    #[arg(short, long)]
    quiet: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run AT commands in order and print the response
    Exec {
        /// Commands; each may itself hold several separated by ';' or newlines
        #[arg(required = true)]
        commands: Vec<String>,

        /// On failure, check that the modem answers ATI and run the commands once more
        #[arg(long)]
        recover: bool,
    },

    /// Show modem and SIM identity
    Info,

    /// Show the current network settings
    Settings,

    /// List the configured APN contexts, or set the APN
    Apn {
        #[command(subcommand)]
        action: Option<ApnAction>,
    },

    /// Lock LTE to specific cells, or clear the lock
    LteLock {
        /// Cells as EARFCN:PCI (up to 10)
        #[arg(value_parser = parse_lte_cell, required_unless_present = "reset")]
        cells: Vec<LteCellLock>,

        /// Clear the LTE cell lock
        #[arg(long, conflicts_with = "cells")]
        reset: bool,
    },

    /// Lock NR5G-SA to one cell, or clear the lock
    NrLock {
        /// Physical cell id
        #[arg(long, required_unless_present = "reset")]
        pci: Option<u32>,

        /// NR-ARFCN
        #[arg(long, required_unless_present = "reset")]
        arfcn: Option<u32>,

        /// Subcarrier spacing, as a code (0-4) or in kHz
        #[arg(long, required_unless_present = "reset")]
        scs: Option<u32>,

        /// NR band number
        #[arg(long, required_unless_present = "reset")]
        band: Option<u32>,

        /// Clear the NR5G-SA cell lock
        #[arg(long, conflicts_with_all = ["pci", "arfcn", "scs", "band"])]
        reset: bool,
    },

    /// Restrict a band class (lte, nsa, sa) to the given bands
    Bands {
        class: BandClass,

        /// Band numbers, separated by spaces or ':'
        #[arg(required = true, value_delimiter = ':')]
        bands: Vec<u32>,
    },

    /// Set the preferred RATs (WCDMA, LTE, NR5G); none means automatic
    NetworkMode { rats: Vec<Rat> },

    /// Set the NR5G mode (auto, nsa, sa)
    Nr5gMode { mode: Nr5gMode },

    /// Switch the active SIM slot
    SimSlot { slot: u8 },
}

#[derive(Subcommand, Debug)]
enum ApnAction {
    /// Make this the only APN and restart the radio
    Set {
        apn: String,

        /// PDP type: IP, IPV6, IPV4V6 or PPP
        #[arg(long, default_value = "IPV4V6")]
        pdp_type: PdpType,
    },
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            server: self.server.clone(),
            endpoint: self.endpoint.clone(),
            retries: self.retries,
            timeout_ms: self.timeout_ms,
            output: self.output,
            no_color: self.no_color,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    // Load config file
    let config = if let Some(config_path) = &cli.config {
        Config::load_from(config_path)?
    } else {
        Config::load().unwrap_or_default()
    };

    // Merge CLI args with config
    let merged = config.merge_with_args(cli.overrides());
    debug!(server = %merged.server, exec = ?merged.exec, "Resolved configuration");

    let ctx = OutputContext::new(merged.output, merged.no_color, cli.quiet);
    let client = create_client(&merged)?;

    match &cli.command {
        Commands::Exec { commands, recover } => {
            commands::exec(&client, commands, *recover, &ctx).await?;
        }
        Commands::Info => commands::info(&client, &ctx).await?,
        Commands::Settings => commands::settings(&client, &ctx).await?,
        Commands::Apn { action: None } => commands::apn(&client, &ctx).await?,
        Commands::Apn {
            action: Some(ApnAction::Set { apn, pdp_type }),
        } => commands::set_apn(&client, apn, *pdp_type, &ctx).await?,
        Commands::LteLock { cells, reset } => {
            let cells = (!*reset).then_some(cells.as_slice());
            commands::lte_lock(&client, cells, &ctx).await?;
        }
        Commands::NrLock {
            pci,
            arfcn,
            scs,
            band,
            reset,
        } => {
            let lock = match (*reset, pci, arfcn, scs, band) {
                (false, Some(pci), Some(arfcn), Some(scs), Some(band)) => Some(NrCellLock {
                    band: *band,
                    scs: *scs,
                    arfcn: *arfcn,
                    pci: *pci,
                }),
                _ => None,
            };
            commands::nr_lock(&client, lock.as_ref(), &ctx).await?;
        }
        Commands::Bands { class, bands } => {
            commands::bands(&client, *class, bands, &ctx).await?;
        }
        Commands::NetworkMode { rats } => commands::network_mode(&client, rats, &ctx).await?,
        Commands::Nr5gMode { mode } => commands::nr5g_mode(&client, *mode, &ctx).await?,
        Commands::SimSlot { slot } => commands::sim_slot(&client, *slot, &ctx).await?,
    }

    Ok(())
}

/// Create an AT client for the merged configuration
fn create_client(merged: &MergedConfig) -> Result<AtClient> {
    let mut config = ClientConfig::new(merged.server.clone());
    config.exec = merged.exec.clone();
    AtClient::with_config(&config).context("Failed to create AT client")
}
