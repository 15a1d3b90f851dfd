//! consentctl - Consent Ledger Client
//!
//! Records consent grants, revocations and identity usage, and shows the
//! resulting audit trail. Runs against an in-process ledger; without
//! `--connect` no signing session exists and receipts are synthetic.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config_bridge;
mod context;
mod theme;
mod wallet;

use commands::{OutputFormat, config, hash, query, record};
use context::App;

/// consentctl - Consent Ledger Client
#[derive(Parser)]
#[command(name = "consentctl")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format: pretty (default) or json
    #[arg(long, global = true, default_value = "pretty")]
    format: String,

    /// Path to a configuration file
    #[arg(short, long, global = true, env = "CONSENT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive the subject handle for an identifier
    Hash {
        /// Raw identifier (never stored or transmitted)
        identifier: String,
    },

    /// Record a consent action
    Record {
        /// Raw identifier of the subject
        identifier: String,
        /// Counterparty the action concerns
        counterparty: String,
        /// Action: CONSENT_GRANTED, CONSENT_REVOKED, IDENTITY_USED, or any label
        action: String,
        /// Extra JSON stored with the metadata document
        #[arg(short, long)]
        details: Option<String>,
        /// Connect the local wallet so the action reaches the ledger
        #[arg(long)]
        connect: bool,
    },

    /// Show the audit trail
    Query {
        /// Raw identifier; omit for all subjects
        identifier: Option<String>,
        /// Show per-counterparty consent state instead of events
        #[arg(short, long)]
        summary: bool,
    },

    /// Record a grant, a usage and a revocation, then show the trail
    Demo {
        /// Raw identifier of the subject
        #[arg(default_value = "900101015678")]
        identifier: String,
        /// Counterparty the actions concern
        #[arg(default_value = "Bank Negara Malaysia")]
        counterparty: String,
    },

    /// View configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show resolved configuration with source annotations
    Show,
    /// Show config file paths being checked
    Paths,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let resolved = consent_config::Config::load(cli.config.as_deref())?;

    let mut log_config = config_bridge::to_log_config(&resolved.config);
    if cli.verbose {
        "debug".clone_into(&mut log_config.level);
    }
    if let Err(e) = consent_telemetry::setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let format = OutputFormat::parse(&cli.format);

    match cli.command {
        Commands::Hash { identifier } => hash::run(&identifier, format)?,
        Commands::Record {
            identifier,
            counterparty,
            action,
            details,
            connect,
        } => {
            let app = App::offline(&resolved.config)?;
            let args = record::RecordArgs {
                identifier: &identifier,
                counterparty: &counterparty,
                action: &action,
                details: details.as_deref(),
                connect,
            };
            record::run(&app, args, format).await?;
        },
        Commands::Query {
            identifier,
            summary,
        } => {
            let app = App::offline(&resolved.config)?;
            query::run(&app, identifier.as_deref(), summary, format).await?;
        },
        Commands::Demo {
            identifier,
            counterparty,
        } => {
            let app = App::offline(&resolved.config)?;
            for action in ["CONSENT_GRANTED", "IDENTITY_USED", "CONSENT_REVOKED"] {
                let args = record::RecordArgs {
                    identifier: &identifier,
                    counterparty: &counterparty,
                    action,
                    details: None,
                    connect: true,
                };
                record::run(&app, args, format).await?;
            }
            query::run(&app, Some(&identifier), false, format).await?;
        },
        Commands::Config { command } => match command {
            ConfigCommands::Show => config::show(&resolved, format)?,
            ConfigCommands::Paths => config::paths(&resolved),
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_record() {
        let cli = Cli::parse_from([
            "consentctl",
            "record",
            "900101015678",
            "Bank Negara Malaysia",
            "CONSENT_GRANTED",
            "--connect",
        ]);
        assert!(matches!(
            cli.command,
            Commands::Record { ref action, connect: true, .. } if action == "CONSENT_GRANTED"
        ));
    }

    #[test]
    fn test_output_format() {
        assert_eq!(OutputFormat::parse("JSON"), OutputFormat::Json);
        assert_eq!(OutputFormat::parse("pretty"), OutputFormat::Pretty);
        assert_eq!(OutputFormat::parse("anything"), OutputFormat::Pretty);
    }
}
