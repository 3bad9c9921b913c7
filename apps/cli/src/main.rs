//! `ferrum` command line tool
//!
//! Usage:
//!   ferrum canonicalize patient.json --pretty
//!   ferrum validate observation.json --fail-fast
//!   cat bundle.json | ferrum validate -
//!   ferrum types

mod commands;
mod config;
mod logging;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::config::CliConfig;

#[derive(Parser, Debug)]
#[command(name = "ferrum", version)]
#[command(about = "Canonicalize and check FHIR R4 JSON resources")]
struct Cli {
    /// Configuration file (YAML, TOML or JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    /// Debug-level logs (ignored when RUST_LOG is set)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rewrite a resource in canonical field order, dropping unknown properties
    Canonicalize {
        /// Input file, or `-` for stdin
        input: String,

        /// Pretty-print the output
        #[arg(long)]
        pretty: bool,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check registry cardinality and print an OperationOutcome
    Validate {
        /// Input file, or `-` for stdin
        input: String,

        /// Stop at the first error
        #[arg(long)]
        fail_fast: bool,

        /// Pretty-print the OperationOutcome
        #[arg(long)]
        pretty: bool,
    },

    /// List the resource types this build knows
    Types,
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = CliConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Canonicalize {
            input,
            pretty,
            output,
        } => commands::canonicalize(&config, &input, pretty, output.as_deref()),
        Command::Validate {
            input,
            fail_fast,
            pretty,
        } => commands::validate(&config, &input, fail_fast, pretty).await,
        Command::Types => commands::types(),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logging(cli.log_json, cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(error = %format!("{:#}", err), "command failed");
            ExitCode::FAILURE
        }
    }
}
