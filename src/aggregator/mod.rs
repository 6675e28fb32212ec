//! Grouping of parsed hops into traces, plus run metrics.
//!
//! This module turns the flat hop stream into:
//! - Fixed-size batches processed on a bounded worker pool
//! - A merged trace id -> hops mapping
//! - Diagnostics counters and trace size statistics

pub mod batch;
pub mod grouper;
pub mod metrics;
pub mod pool;

// Re-export main types and functions
pub use batch::{into_batches, Batch};
pub use grouper::{group_batch, group_hops, merge_groups, GroupOptions, TraceGroups};
pub use metrics::{calculate_run_stats, Diagnostics, DiagnosticsSnapshot, LargestTrace, RunStats};
pub use pool::{default_workers, run_tasks, FailurePolicy};
