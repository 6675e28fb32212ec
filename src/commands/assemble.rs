//! Assemble command implementation.
//!
//! The assemble command:
//! 1. Reads and parses the hop log
//! 2. Groups hops by trace id in parallel batches
//! 3. Computes run statistics
//! 4. Builds one call tree per trace
//! 5. Writes the trace documents (and optional run report)

use crate::aggregator::{
    calculate_run_stats, default_workers, group_hops, Diagnostics, DiagnosticsSnapshot,
    FailurePolicy, GroupOptions, RunStats,
};
use crate::output::{validate_path, write_report, write_traces, RunReport};
use crate::parser::read_hops;
use crate::tree::{assemble_traces, IdentityPolicy};
use crate::utils::config::DEFAULT_BATCH_SIZE;
use anyhow::{Context, Result};
use log::{debug, info};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::time::Instant;

/// Arguments for the assemble command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct AssembleArgs {
    /// Hop log to read
    pub input: PathBuf,

    /// JSON Lines file to write
    pub output: PathBuf,

    /// Hops per grouping batch
    pub batch_size: usize,

    /// Worker pool size (None = available parallelism)
    pub workers: Option<usize>,

    pub identity: IdentityPolicy,

    pub failure_policy: FailurePolicy,

    /// Optional run report path
    pub report: Option<PathBuf>,

    /// Print text summary to stdout
    pub print_summary: bool,
}

impl Default for AssembleArgs {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            output: PathBuf::from("traces.jsonl"),
            batch_size: DEFAULT_BATCH_SIZE,
            workers: None,
            identity: IdentityPolicy::default(),
            failure_policy: FailurePolicy::default(),
            report: None,
            print_summary: false,
        }
    }
}

/// What a finished run produced
#[derive(Debug, Clone)]
pub struct AssembleOutcome {
    pub stats: RunStats,
    pub diagnostics: DiagnosticsSnapshot,
    pub traces_written: usize,
}

/// Execute the assemble command
///
/// **Public** - main entry point called from main.rs
///
/// # Errors
/// * Unreadable input file
/// * A grouping or build task failure
/// * File write errors
///
/// Malformed lines and malformed traces are not errors; they are logged
/// and counted in the returned diagnostics.
pub fn execute_assemble(args: &AssembleArgs) -> Result<AssembleOutcome> {
    let start_time = Instant::now();
    let diagnostics = Diagnostics::new();
    let workers = args.workers.unwrap_or_else(default_workers);

    info!("Assembling traces from: {}", args.input.display());

    // Step 1: Parse hops
    info!("Step 1/5: Reading hop log...");
    let file = File::open(&args.input)
        .with_context(|| format!("Failed to open input {}", args.input.display()))?;
    let hops = read_hops(BufReader::new(file), &diagnostics)
        .with_context(|| format!("Failed to read input {}", args.input.display()))?;

    // Step 2: Group by trace id
    info!("Step 2/5: Grouping {} hops on {} workers...", hops.len(), workers);
    let options = GroupOptions {
        batch_size: args.batch_size,
        workers,
        failure_policy: args.failure_policy,
    };
    let groups = group_hops(hops, &options, &diagnostics).context("Failed to group hops by trace")?;

    // Step 3: Statistics
    info!("Step 3/5: Computing trace statistics...");
    let stats = calculate_run_stats(&groups);

    // Step 4: Build trees
    info!("Step 4/5: Building call trees...");
    let documents = assemble_traces(groups, args.identity, workers, args.failure_policy, &diagnostics)
        .context("Failed to build call trees")?;

    // Step 5: Write outputs
    info!("Step 5/5: Writing output files...");
    let traces_written = write_traces(&documents, &args.output).context("Failed to write traces")?;
    diagnostics.record_traces_emitted(traces_written);

    let snapshot = diagnostics.snapshot();

    if let Some(report_path) = &args.report {
        let report = RunReport::new(&args.input, &args.output, stats.clone(), snapshot.clone());
        write_report(&report, report_path).context("Failed to write run report")?;
        info!("✓ Run report written to: {}", report_path.display());
    }

    info!("Total traces: {}", stats.trace_count);
    if let Some(largest) = &stats.largest_trace {
        info!("Trace {} is the largest with {} hops", largest.trace_id, largest.hop_count);
    }
    info!("Average trace size: {:.2}", stats.average_trace_size);
    debug!("Diagnostics: {}", snapshot.summary());

    if args.print_summary {
        print_summary(&stats, &snapshot);
    }

    let elapsed = start_time.elapsed();
    info!(
        "✓ {} traces written to {} in {:.2}s",
        traces_written,
        args.output.display(),
        elapsed.as_secs_f64()
    );

    Ok(AssembleOutcome {
        stats,
        diagnostics: snapshot,
        traces_written,
    })
}

/// Print the run summary to stdout
///
/// **Private** - `--summary` output
fn print_summary(stats: &RunStats, diagnostics: &DiagnosticsSnapshot) {
    println!("\n{}", "=".repeat(80));
    println!("RUN SUMMARY");
    println!("{}", "=".repeat(80));
    println!("Traces:          {}", stats.trace_count);
    println!("Hops:            {}", stats.total_hops);
    match &stats.largest_trace {
        Some(l) => println!("Largest trace:   {} ({} hops)", l.trace_id, l.hop_count),
        None => println!("Largest trace:   -"),
    }
    println!("Average size:    {:.2}", stats.average_trace_size);
    println!("Malformed lines: {}", diagnostics.malformed_lines);
    println!("No root:         {}", diagnostics.missing_roots);
    println!("Multiple roots:  {}", diagnostics.multiple_roots);
    println!("Orphan hops:     {}", diagnostics.orphan_hops);
    println!("Collapsed hops:  {}", diagnostics.collapsed_hops);
    println!("Written:         {}", diagnostics.traces_emitted);
    println!("{}", "=".repeat(80));
}

/// Validate assemble arguments
///
/// **Public** - can be called before execute_assemble for early validation
pub fn validate_args(args: &AssembleArgs) -> Result<()> {
    if args.input.as_os_str().is_empty() {
        anyhow::bail!("Input path cannot be empty");
    }

    if !args.input.is_file() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    validate_path(&args.output).context("Invalid output path")?;

    if let Some(report) = &args.report {
        validate_path(report).context("Invalid report path")?;
        if report == &args.output {
            anyhow::bail!("Report path must differ from the output path");
        }
    }

    if args.batch_size == 0 {
        anyhow::bail!("batch_size must be greater than 0");
    }

    if args.workers == Some(0) {
        anyhow::bail!("workers must be greater than 0");
    }

    Ok(())
}
