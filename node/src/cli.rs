//! # CLI Interface
//!
//! Defines the command-line argument structure for `pulsevault` using
//! `clap` derive. Supports four subcommands: `keygen`, `sign`, `simulate`,
//! and `version`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::logging::LogFormat;

/// PulseVault operator tool.
///
/// Generates signer keys, signs vault creation requests, and runs the
/// inheritance and billing scenarios against an in-memory fleet.
#[derive(Parser, Debug)]
#[command(
    name = "pulsevault",
    about = "PulseVault operator tool",
    version,
    propagate_version = true
)]
pub struct PulseVaultCli {
    /// Log output format: pretty or json.
    #[arg(
        long,
        global = true,
        env = "PULSEVAULT_LOG_FORMAT",
        default_value = "pretty",
        value_parser = parse_log_format
    )]
    pub log_format: LogFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the PulseVault binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a fresh Ed25519 signer keypair.
    Keygen(KeygenArgs),
    /// Sign a vault creation request for `(name, nonce)`.
    Sign(SignArgs),
    /// Run the end-to-end scenarios and print a JSON report.
    Simulate(SimulateArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `keygen` subcommand.
#[derive(Parser, Debug)]
pub struct KeygenArgs {
    /// Write the hex secret key here instead of printing it.
    #[arg(long, short = 'o')]
    pub out: Option<PathBuf>,
}

/// Arguments for the `sign` subcommand.
#[derive(Parser, Debug)]
pub struct SignArgs {
    /// Vault name the signature commits to.
    #[arg(long)]
    pub name: String,

    /// Creation nonce the signature commits to.
    #[arg(long)]
    pub nonce: u64,

    /// Hex-encoded Ed25519 signer secret key.
    #[arg(long, env = "PULSEVAULT_SIGNER_KEY", hide_env_values = true)]
    pub key: String,
}

/// Arguments for the `simulate` subcommand.
#[derive(Parser, Debug)]
pub struct SimulateArgs {
    /// Path to a JSON fleet settings file. Built-in defaults when omitted.
    #[arg(long, short = 'c', env = "PULSEVAULT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Pretty-print the report.
    #[arg(long)]
    pub pretty: bool,
}

fn parse_log_format(s: &str) -> Result<LogFormat, String> {
    match s.to_lowercase().as_str() {
        "json" => Ok(LogFormat::Json),
        "pretty" => Ok(LogFormat::Pretty),
        other => Err(format!("unknown log format `{other}` (expected pretty or json)")),
    }
}
