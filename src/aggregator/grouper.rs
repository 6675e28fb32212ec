//! Group hops by trace id in parallel batches.
//!
//! The hop stream is cut into fixed-size batches, every batch is grouped
//! on the worker pool, and the per-batch mappings are concatenated key by
//! key. Merging walks batches in input order, so each trace's hop list
//! keeps file order.

use super::batch::{into_batches, Batch};
use super::metrics::Diagnostics;
use super::pool::{default_workers, run_tasks, FailurePolicy};
use crate::parser::Hop;
use crate::utils::config::DEFAULT_BATCH_SIZE;
use crate::utils::error::GroupError;
use log::{debug, info};
use std::collections::BTreeMap;

/// Trace id -> hops, ordered by trace id
pub type TraceGroups = BTreeMap<String, Vec<Hop>>;

/// How the grouping phase is run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupOptions {
    /// Hops per batch (>= 1)
    pub batch_size: usize,

    /// Pool size
    pub workers: usize,

    pub failure_policy: FailurePolicy,
}

impl Default for GroupOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            workers: default_workers(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

/// Group one batch by trace id in a single pass
///
/// **Public** - the per-batch task
pub fn group_batch(batch: Batch) -> TraceGroups {
    let mut groups = TraceGroups::new();
    for hop in batch.hops {
        groups.entry(hop.trace_id.clone()).or_default().push(hop);
    }
    groups
}

/// Concatenate per-batch mappings key by key
///
/// **Public** - merge step of grouping
///
/// Lists for the same trace are appended in the order the parts are given.
pub fn merge_groups<I>(parts: I) -> TraceGroups
where
    I: IntoIterator<Item = TraceGroups>,
{
    let mut merged = TraceGroups::new();
    for part in parts {
        for (trace_id, mut hops) in part {
            merged.entry(trace_id).or_default().append(&mut hops);
        }
    }
    merged
}

/// Group all hops by trace id
///
/// **Public** - main entry point for grouping
///
/// # Arguments
/// * `hops` - Hops in file order
/// * `options` - Batch size, pool size and failure policy
/// * `diagnostics` - Receives batch and failure counts
///
/// # Errors
/// * `GroupError::InvalidBatchSize` - batch size is zero
/// * `GroupError::TasksFailed` - at least one batch task failed; no partial
///   mapping is returned
pub fn group_hops(
    hops: Vec<Hop>,
    options: &GroupOptions,
    diagnostics: &Diagnostics,
) -> Result<TraceGroups, GroupError> {
    let hop_count = hops.len();
    let batches = into_batches(hops, options.batch_size)?;
    diagnostics.record_batches(batches.len());

    info!(
        "Grouping {} hops in {} batches of up to {}",
        hop_count,
        batches.len(),
        options.batch_size
    );

    let parts = run_tasks(batches, options.workers, options.failure_policy, group_batch)
        .inspect_err(|e| {
            if let GroupError::TasksFailed { failures, .. } = e {
                diagnostics.record_failed_batches(failures.len());
            }
        })?;

    let merged = merge_groups(parts);
    debug!("Merged into {} traces", merged.len());

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_line;

    fn hop(trace: &str, seq: u64) -> Hop {
        let mut hop = parse_line(&format!(
            "2024-01-01T00:00:00Z 2024-01-01T00:00:01Z {} svc S{}->S{}",
            trace,
            seq,
            seq + 1
        ))
        .unwrap();
        hop.sequence = seq;
        hop
    }

    #[test]
    fn test_group_batch_single_pass() {
        let batch = Batch {
            index: 0,
            hops: vec![hop("A", 1), hop("B", 2), hop("A", 3)],
        };
        let groups = group_batch(batch);

        assert_eq!(groups.len(), 2);
        let seqs: Vec<u64> = groups["A"].iter().map(|h| h.sequence).collect();
        assert_eq!(seqs, vec![1, 3]);
    }

    #[test]
    fn test_merge_concatenates_in_part_order() {
        let first = group_batch(Batch { index: 0, hops: vec![hop("A", 1), hop("B", 2)] });
        let second = group_batch(Batch { index: 1, hops: vec![hop("A", 3)] });

        let merged = merge_groups(vec![first, second]);

        let seqs: Vec<u64> = merged["A"].iter().map(|h| h.sequence).collect();
        assert_eq!(seqs, vec![1, 3]);
        assert_eq!(merged["B"].len(), 1);
    }

    #[test]
    fn test_group_hops_preserves_file_order() {
        let hops: Vec<Hop> = (1..=25).map(|i| hop(if i % 2 == 0 { "E" } else { "O" }, i)).collect();
        let options = GroupOptions { batch_size: 4, workers: 3, ..Default::default() };
        let diagnostics = Diagnostics::new();

        let groups = group_hops(hops, &options, &diagnostics).unwrap();

        let even: Vec<u64> = groups["E"].iter().map(|h| h.sequence).collect();
        assert_eq!(even, (1..=12).map(|i| i * 2).collect::<Vec<_>>());
        assert_eq!(groups["O"].len(), 13);
        assert_eq!(diagnostics.snapshot().batches, 7);
    }

    #[test]
    fn test_group_hops_rejects_zero_batch_size() {
        let options = GroupOptions { batch_size: 0, ..Default::default() };
        let result = group_hops(vec![hop("A", 1)], &options, &Diagnostics::new());
        assert!(matches!(result, Err(GroupError::InvalidBatchSize)));
    }
}
