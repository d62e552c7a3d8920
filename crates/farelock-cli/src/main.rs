//! # farelock CLI entry point
//!
//! Parses arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use farelock_cli::journal::{run_verify_journal, VerifyJournalArgs};
use farelock_cli::simulate::{run_simulate, SimulateArgs};
use farelock_cli::transitions::{run_transitions, TransitionsArgs};

/// Farelock ride escrow toolchain.
#[derive(Parser, Debug)]
#[command(name = "farelock", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a scripted ride scenario against an in-memory engine.
    Simulate(SimulateArgs),

    /// Verify the hash chain of an exported event journal.
    VerifyJournal(VerifyJournalArgs),

    /// Print the ride transition table.
    Transitions(TransitionsArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    let json_logs = std::env::var("FARELOCK_LOG_JSON").is_ok_and(|v| v == "1" || v == "true");
    if json_logs {
        tracing_subscriber::fmt().json().with_env_filter(filter).with_writer(std::io::stderr).init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    let result = match cli.command {
        Commands::Simulate(args) => run_simulate(&args),
        Commands::VerifyJournal(args) => run_verify_journal(&args),
        Commands::Transitions(args) => run_transitions(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}
