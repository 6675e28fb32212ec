//! Trace Assembler CLI
//!
//! Reads a span hop log and writes one nested JSON trace per line.

use anyhow::Result;
use clap::Parser;
use env_logger::Env;
use std::path::PathBuf;

use trace_assembler::aggregator::FailurePolicy;
use trace_assembler::commands::{execute_assemble, validate_args, AssembleArgs};
use trace_assembler::tree::IdentityPolicy;
use trace_assembler::utils::config::{DEFAULT_BATCH_SIZE, ENV_BATCH_SIZE, ENV_IDENTITY, ENV_WORKERS};

/// Trace Assembler - rebuild call trees from span hop logs
#[derive(Parser, Debug)]
#[command(name = "trace-assembler")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Hop log to read
    input: PathBuf,

    /// JSON Lines file to write
    output: PathBuf,

    /// Hops per grouping batch
    #[arg(long, env = ENV_BATCH_SIZE, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Worker threads (defaults to available parallelism)
    #[arg(long, env = ENV_WORKERS)]
    workers: Option<usize>,

    /// Whether hops sharing service and parent span collapse into one node
    #[arg(long, value_enum, env = ENV_IDENTITY, default_value_t = IdentityPolicy::StrictEdge)]
    identity: IdentityPolicy,

    /// What to do with remaining batches after one fails
    #[arg(long, value_enum, default_value_t = FailurePolicy::CancelOnFirst)]
    failure_policy: FailurePolicy,

    /// Write a JSON run report to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Print text summary to stdout
    #[arg(long)]
    summary: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    let args = AssembleArgs {
        input: cli.input,
        output: cli.output,
        batch_size: cli.batch_size,
        workers: cli.workers,
        identity: cli.identity,
        failure_policy: cli.failure_policy,
        report: cli.report,
        print_summary: cli.summary,
    };

    // Validate args first
    validate_args(&args)?;

    execute_assemble(&args)?;

    Ok(())
}
