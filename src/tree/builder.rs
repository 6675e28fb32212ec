//! Reconstruct call trees from a trace's flat hop list.
//!
//! A hop's children are the hops whose `prev_span_id` equals its
//! `new_span_id`. The builder indexes hops by parent span once, then walks
//! breadth-first from the root with an explicit queue, so deep traces do
//! not grow the call stack and lookups stay linear overall.
//!
//! Every hop is attached at most once. Hops that cannot be reached from
//! the root (orphans, or cycles detached from it) are left out and counted.

use super::schema::{CallNode, TraceDocument};
use crate::aggregator::metrics::Diagnostics;
use crate::aggregator::pool::{run_tasks, FailurePolicy};
use crate::aggregator::TraceGroups;
use crate::parser::{Hop, HopKey};
use crate::utils::error::{GroupError, TreeError};
use log::{debug, info, warn};
use std::collections::{HashMap, VecDeque};

/// How hops map onto tree nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum IdentityPolicy {
    /// Every hop becomes its own node
    #[default]
    #[value(name = "strict")]
    StrictEdge,

    /// Hops sharing (trace, service, parent span) merge into the first one seen
    #[value(name = "collapse")]
    CollapseByKey,
}

/// A built tree plus what was left out of it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledTrace {
    pub document: TraceDocument,

    /// Hops in the input list
    pub hop_count: usize,

    /// Nodes in the tree
    pub node_count: usize,

    /// Hops never reached from the root
    pub orphan_count: usize,

    /// Hops merged into an existing node
    pub collapsed_count: usize,
}

/// Tree node before it is turned into a `CallNode`
struct Draft {
    hop: usize,
    children: Vec<usize>,
}

/// Locate the single root hop of a trace
///
/// **Public** - first step of tree building
///
/// # Returns
/// Index of the root hop in `hops`
///
/// # Errors
/// * `TreeError::EmptyTrace` - no hops at all
/// * `TreeError::NoRootFound` - no hop has parent span `"null"`
/// * `TreeError::MultipleRootsFound` - more than one hop does
pub fn find_root(trace_id: &str, hops: &[Hop]) -> Result<usize, TreeError> {
    if hops.is_empty() {
        return Err(TreeError::EmptyTrace(trace_id.to_string()));
    }

    let mut roots = hops.iter().enumerate().filter(|(_, h)| h.is_root()).map(|(i, _)| i);

    match (roots.next(), roots.count()) {
        (None, _) => Err(TreeError::NoRootFound(trace_id.to_string())),
        (Some(root), 0) => Ok(root),
        (Some(_), extra) => Err(TreeError::MultipleRootsFound {
            trace_id: trace_id.to_string(),
            count: extra + 1,
        }),
    }
}

/// Index hops by parent span id
///
/// **Public** - built once per trace
///
/// Each child list is sorted by start time, ties by input line.
pub fn index_children(hops: &[Hop]) -> HashMap<&str, Vec<usize>> {
    let mut index: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, hop) in hops.iter().enumerate() {
        index.entry(hop.prev_span_id.as_str()).or_default().push(i);
    }
    for children in index.values_mut() {
        children.sort_by_key(|&i| (hops[i].start_time, hops[i].sequence));
    }
    index
}

/// Build the call tree for one trace
///
/// **Public** - main entry point for tree building
///
/// # Arguments
/// * `trace_id` - Trace being built
/// * `hops` - All hops of that trace, in any order
/// * `policy` - Whether hops with the same key collapse into one node
///
/// # Errors
/// See [`find_root`]. A trace with a single hop never fails: that hop
/// becomes a leaf root.
pub fn build_trace(
    trace_id: &str,
    hops: &[Hop],
    policy: IdentityPolicy,
) -> Result<AssembledTrace, TreeError> {
    if let [only] = hops {
        return Ok(AssembledTrace {
            document: TraceDocument {
                trace_id: trace_id.to_string(),
                root: CallNode::leaf(only),
            },
            hop_count: 1,
            node_count: 1,
            orphan_count: 0,
            collapsed_count: 0,
        });
    }

    let root = find_root(trace_id, hops)?;
    let children_of = index_children(hops);

    let mut drafts = vec![Draft { hop: root, children: Vec::new() }];
    let mut attached = vec![false; hops.len()];
    attached[root] = true;
    let mut by_key: HashMap<HopKey<'_>, usize> = HashMap::new();
    by_key.insert(hops[root].key(), 0);
    let mut collapsed_count = 0;

    // (hop, draft the hop's children attach to)
    let mut queue = VecDeque::with_capacity(hops.len());
    queue.push_back((root, 0));

    while let Some((hop, parent)) = queue.pop_front() {
        let Some(children) = children_of.get(hops[hop].new_span_id.as_str()) else {
            continue;
        };

        for &child in children {
            if attached[child] {
                continue;
            }
            attached[child] = true;

            let existing = match policy {
                IdentityPolicy::CollapseByKey => by_key.get(&hops[child].key()).copied(),
                IdentityPolicy::StrictEdge => None,
            };

            let target = match existing {
                Some(draft) => {
                    collapsed_count += 1;
                    draft
                }
                None => {
                    let draft = drafts.len();
                    drafts.push(Draft { hop: child, children: Vec::new() });
                    drafts[parent].children.push(draft);
                    if policy == IdentityPolicy::CollapseByKey {
                        by_key.insert(hops[child].key(), draft);
                    }
                    draft
                }
            };

            queue.push_back((child, target));
        }
    }

    let reached = attached.iter().filter(|a| **a).count();
    let orphan_count = hops.len() - reached;
    if orphan_count > 0 {
        debug!("Trace {}: {} orphan hop(s) left out", trace_id, orphan_count);
    }

    let node_count = drafts.len();
    let root_node = finish_tree(drafts, hops)
        .ok_or_else(|| TreeError::NoRootFound(trace_id.to_string()))?;

    Ok(AssembledTrace {
        document: TraceDocument {
            trace_id: trace_id.to_string(),
            root: root_node,
        },
        hop_count: hops.len(),
        node_count,
        orphan_count,
        collapsed_count,
    })
}

/// Turn drafts into nested nodes, bottom-up
///
/// **Private** - drafts are created parent-first, so every child index is
/// larger than its parent's and a reverse sweep sees children first.
fn finish_tree(mut drafts: Vec<Draft>, hops: &[Hop]) -> Option<CallNode> {
    let draft_hops: Vec<usize> = drafts.iter().map(|d| d.hop).collect();
    let mut built: Vec<Option<CallNode>> = (0..drafts.len()).map(|_| None).collect();

    for i in (0..drafts.len()).rev() {
        let mut children = std::mem::take(&mut drafts[i].children);
        // Collapsed nodes gather children from several hops
        children.sort_by_key(|&d| (hops[draft_hops[d]].start_time, hops[draft_hops[d]].sequence));

        let mut node = CallNode::leaf(&hops[draft_hops[i]]);
        node.children = children.into_iter().filter_map(|d| built[d].take()).collect();
        built[i] = Some(node);
    }

    built.into_iter().next().flatten()
}

/// Build every trace on the worker pool
///
/// **Public** - used by the assemble command
///
/// Traces that fail to build are logged, counted in `diagnostics` and
/// skipped. Documents come back in trace id order.
///
/// # Errors
/// * `GroupError::TasksFailed` - a build task panicked
pub fn assemble_traces(
    groups: TraceGroups,
    policy: IdentityPolicy,
    workers: usize,
    failure_policy: FailurePolicy,
    diagnostics: &Diagnostics,
) -> Result<Vec<TraceDocument>, GroupError> {
    let jobs: Vec<(String, Vec<Hop>)> = groups.into_iter().collect();
    info!("Building {} traces ({:?})", jobs.len(), policy);

    let results = run_tasks(jobs, workers, failure_policy, |(trace_id, hops)| {
        build_trace(&trace_id, &hops, policy)
    })?;

    let mut documents = Vec::with_capacity(results.len());
    for result in results {
        match result {
            Ok(assembled) => {
                diagnostics.record_orphans(assembled.orphan_count);
                diagnostics.record_collapsed(assembled.collapsed_count);
                documents.push(assembled.document);
            }
            Err(e) => {
                warn!("Skipping trace: {}", e);
                diagnostics.record_tree_error(&e);
            }
        }
    }

    Ok(documents)
}
