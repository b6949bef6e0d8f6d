//! `adva` CLI entry point. Mirrors `visigrid-cli`'s `main()` shape: parse
//! with `clap`, dispatch to a `cmd_*` function returning `Result<(),
//! CliError>`, print the error/hint and map its exit code on failure.

mod config;
mod error;
mod exit_codes;
mod inspect;
mod local_store;
mod reconcile;
mod scan;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use config::PipelineConfig;
use error::CliError;
use exit_codes::{EXIT_RECONCILE_MISMATCH, EXIT_SCAN_PARTIAL, EXIT_SUCCESS};

#[derive(Parser)]
#[command(name = "adva")]
#[command(about = "Document pipeline and reconciliation engine")]
#[command(version)]
struct Cli {
    /// Path to a TOML config file. Defaults to `~/.config/adva/config.toml`.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Gemini API key. Falls back to `GEMINI_API_KEY` if omitted.
    #[arg(long, global = true)]
    gemini_api_key: Option<String>,

    /// Suppress progress output on stderr.
    #[arg(long, global = true)]
    quiet: bool,

    /// Emit machine-readable JSON instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch every file in the intake folder through the document pipeline.
    Scan,
    /// Re-run the matchers over unmatched ledger rows and write back links.
    Reconcile,
    /// Print every ledger row that mentions a file ID.
    Inspect {
        /// File ID to look up (as stored by `scan`).
        file_id: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = run(cli);

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            e.print();
            ExitCode::from(e.code)
        }
    }
}

fn run(cli: Cli) -> Result<u8, CliError> {
    let mut config = PipelineConfig::load(cli.config.as_deref())?;
    config.quiet = cli.quiet || config.quiet;

    match cli.command {
        Commands::Scan => {
            config.resolve_gemini_key(cli.gemini_api_key)?;
            let summary = scan::cmd_scan(&config, cli.json)?;
            Ok(if summary.errors > 0 { EXIT_SCAN_PARTIAL } else { EXIT_SUCCESS })
        }
        Commands::Reconcile => {
            let report = reconcile::cmd_reconcile(&config, cli.json)?;
            Ok(if report.has_mismatches() { EXIT_RECONCILE_MISMATCH } else { EXIT_SUCCESS })
        }
        Commands::Inspect { file_id } => {
            inspect::cmd_inspect(&config, &file_id, cli.json)?;
            Ok(EXIT_SUCCESS)
        }
    }
}
