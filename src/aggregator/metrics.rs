//! Run diagnostics and trace size statistics.
//!
//! `Diagnostics` is the sink every pipeline stage reports into. It is
//! shared by reference across worker threads, so counters are atomic.
//! `RunStats` summarises the grouped traces: how many, the largest and
//! the average size.

use super::grouper::TraceGroups;
use crate::utils::error::TreeError;
use log::debug;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counters collected while a run progresses
///
/// **Public** - passed into the parser, grouper and tree builder
#[derive(Debug, Default)]
pub struct Diagnostics {
    lines_read: AtomicUsize,
    malformed_lines: AtomicUsize,
    hops_accepted: AtomicUsize,
    batches: AtomicUsize,
    failed_batches: AtomicUsize,
    traces_emitted: AtomicUsize,
    missing_roots: AtomicUsize,
    multiple_roots: AtomicUsize,
    orphan_hops: AtomicUsize,
    collapsed_hops: AtomicUsize,
}

/// Point-in-time copy of [`Diagnostics`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticsSnapshot {
    pub lines_read: usize,
    pub malformed_lines: usize,
    pub hops_accepted: usize,
    pub batches: usize,
    pub failed_batches: usize,
    pub traces_emitted: usize,
    pub missing_roots: usize,
    pub multiple_roots: usize,
    pub orphan_hops: usize,
    pub collapsed_hops: usize,
}

fn bump(counter: &AtomicUsize, n: usize) {
    counter.fetch_add(n, Ordering::Relaxed);
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_line(&self) {
        bump(&self.lines_read, 1);
    }

    pub fn record_malformed_line(&self) {
        bump(&self.malformed_lines, 1);
    }

    pub fn record_hop(&self) {
        bump(&self.hops_accepted, 1);
    }

    pub fn record_batches(&self, n: usize) {
        bump(&self.batches, n);
    }

    pub fn record_failed_batches(&self, n: usize) {
        bump(&self.failed_batches, n);
    }

    pub fn record_traces_emitted(&self, n: usize) {
        bump(&self.traces_emitted, n);
    }

    /// Count a rejected trace under its error kind
    pub fn record_tree_error(&self, error: &TreeError) {
        match error {
            TreeError::NoRootFound(_) | TreeError::EmptyTrace(_) => bump(&self.missing_roots, 1),
            TreeError::MultipleRootsFound { .. } => bump(&self.multiple_roots, 1),
        }
    }

    pub fn record_orphans(&self, n: usize) {
        bump(&self.orphan_hops, n);
    }

    pub fn record_collapsed(&self, n: usize) {
        bump(&self.collapsed_hops, n);
    }

    /// Copy the current counter values
    ///
    /// **Public** - for reports and tests
    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        let load = |c: &AtomicUsize| c.load(Ordering::Relaxed);
        DiagnosticsSnapshot {
            lines_read: load(&self.lines_read),
            malformed_lines: load(&self.malformed_lines),
            hops_accepted: load(&self.hops_accepted),
            batches: load(&self.batches),
            failed_batches: load(&self.failed_batches),
            traces_emitted: load(&self.traces_emitted),
            missing_roots: load(&self.missing_roots),
            multiple_roots: load(&self.multiple_roots),
            orphan_hops: load(&self.orphan_hops),
            collapsed_hops: load(&self.collapsed_hops),
        }
    }
}

impl DiagnosticsSnapshot {
    /// Get human-readable summary
    ///
    /// **Public** - for logging and the `--summary` output
    pub fn summary(&self) -> String {
        format!(
            "Lines: {} | Malformed: {} | Batches: {} (failed {}) | Emitted: {} | \
             No root: {} | Multiple roots: {} | Orphans: {} | Collapsed: {}",
            self.lines_read,
            self.malformed_lines,
            self.batches,
            self.failed_batches,
            self.traces_emitted,
            self.missing_roots,
            self.multiple_roots,
            self.orphan_hops,
            self.collapsed_hops
        )
    }
}

/// The trace with the most hops
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LargestTrace {
    pub trace_id: String,
    pub hop_count: usize,
}

/// Trace size statistics for a run
///
/// **Public** - returned from calculate_run_stats
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    /// Number of distinct trace ids
    pub trace_count: usize,

    /// Hops across all traces
    pub total_hops: usize,

    /// Largest trace; the smallest id wins a tie
    pub largest_trace: Option<LargestTrace>,

    /// Mean hops per trace
    pub average_trace_size: f64,
}

impl RunStats {
    /// Get human-readable summary
    ///
    /// **Public** - for logging and debugging
    pub fn summary(&self) -> String {
        let largest = match &self.largest_trace {
            Some(l) => format!("{} ({} hops)", l.trace_id, l.hop_count),
            None => "-".to_string(),
        };
        format!(
            "Traces: {} | Hops: {} | Largest: {} | Average: {:.2}",
            self.trace_count, self.total_hops, largest, self.average_trace_size
        )
    }
}

/// Calculate trace size statistics from the grouped hops
///
/// **Public** - main entry point for run statistics
///
/// # Arguments
/// * `groups` - Merged trace id -> hops mapping
pub fn calculate_run_stats(groups: &TraceGroups) -> RunStats {
    if groups.is_empty() {
        return RunStats::default();
    }

    let total_hops: usize = groups.values().map(Vec::len).sum();

    // Keys iterate in ascending order, so strict `>` keeps the smallest id on ties
    let mut largest: Option<(&String, usize)> = None;
    for (trace_id, hops) in groups {
        match largest {
            Some((_, size)) if hops.len() <= size => {}
            _ => largest = Some((trace_id, hops.len())),
        }
    }

    let stats = RunStats {
        trace_count: groups.len(),
        total_hops,
        largest_trace: largest.map(|(trace_id, hop_count)| LargestTrace {
            trace_id: trace_id.clone(),
            hop_count,
        }),
        average_trace_size: total_hops as f64 / groups.len() as f64,
    };

    debug!("Run stats: {}", stats.summary());

    stats
}
