// Copyright (c) 2026 PulseVault Contributors. MIT License.
// See LICENSE for details.

//! # PulseVault Operator Tool
//!
//! Entry point for the `pulsevault` binary. Parses CLI arguments,
//! initializes logging, and runs one subcommand:
//!
//! - `keygen`  : generate a creation signer keypair
//! - `sign`    : sign a vault creation request
//! - `simulate`: run the inheritance and billing scenarios, print a report
//! - `version` : print build version information
//!
//! Results go to stdout as JSON; logs go to stderr.

mod cli;
mod logging;
mod settings;
mod simulate;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use std::path::Path;

use pulsevault_protocol::config::GENESIS_MODULE_VERSION;
use pulsevault_protocol::crypto::keys::Keypair;
use pulsevault_protocol::crypto::signatures::sign_creation;
use pulsevault_protocol::types::AccountId;

use cli::{Commands, PulseVaultCli};
use settings::FleetSettings;

fn main() -> Result<()> {
    let cli = PulseVaultCli::parse();
    logging::init_logging(logging::DEFAULT_FILTER, cli.log_format);

    match cli.command {
        Commands::Keygen(args) => keygen(args),
        Commands::Sign(args) => sign(args),
        Commands::Simulate(args) => simulate(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Generates a signer keypair. The secret goes to `--out` when given.
fn keygen(args: cli::KeygenArgs) -> Result<()> {
    let keypair = Keypair::generate();
    let public_key = keypair.public_key();
    let account = AccountId::from_public_key(&public_key);
    let secret_hex = hex::encode(keypair.secret_key_bytes());

    let mut output = json!({
        "public_key": public_key.to_hex(),
        "account": account,
    });
    match &args.out {
        Some(path) => {
            write_secret(path, &secret_hex)?;
            output["secret_key_file"] = json!(path.display().to_string());
            tracing::info!(%account, key_path = %path.display(), "signer keypair generated");
        }
        None => {
            output["secret_key"] = json!(secret_hex);
            tracing::info!(%account, "signer keypair generated");
        }
    }

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn write_secret(path: &Path, secret_hex: &str) -> Result<()> {
    std::fs::write(path, secret_hex)
        .with_context(|| format!("failed to write signer key to {}", path.display()))?;

    // Restrict permissions on Unix.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .with_context(|| format!("failed to restrict permissions on {}", path.display()))?;
    }
    Ok(())
}

/// Signs `(name, nonce)` and prints the signature as JSON, ready to drop
/// into a creation request.
fn sign(args: cli::SignArgs) -> Result<()> {
    let keypair = Keypair::from_hex(args.key.trim()).context("invalid signer key")?;
    let signature = sign_creation(&keypair, &args.name, args.nonce);
    let signer = signature
        .recover(&args.name, args.nonce)
        .context("fresh signature failed to verify")?;

    tracing::info!(name = %args.name, nonce = args.nonce, %signer, "creation request signed");
    let output = json!({
        "name": args.name,
        "nonce": args.nonce,
        "signer": signer,
        "signature": signature,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn simulate(args: cli::SimulateArgs) -> Result<()> {
    let settings = match &args.config {
        Some(path) => FleetSettings::load(path)?,
        None => FleetSettings::default(),
    };
    let report = simulate::run(&settings)?;
    tracing::info!(
        remaining = report.inheritance.remaining,
        treasury_balance = report.billing.treasury_balance,
        "simulation finished"
    );

    let rendered = if args.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{rendered}");
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("pulsevault {}", env!("CARGO_PKG_VERSION"));
    println!("modules    {}", GENESIS_MODULE_VERSION);
    println!("rustc      {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}
