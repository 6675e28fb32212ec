//! Output JSON schema for reconstructed traces.
//!
//! One `TraceDocument` is written per line of the output file:
//!
//! ```json
//! {"traceId":"T1","root":{"serviceName":"svcA","start":"...","end":"...","span":"S1","calls":[]}}
//! ```
//!
//! Trees can be as deep as the longest call chain in the log. Dropping a
//! node is iterative; use `output::write_trace_lines` rather than the
//! derived `Serialize` to emit deep trees.

use crate::parser::{format_timestamp, Hop};
use serde::{Deserialize, Serialize};

/// One call in the reconstructed tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallNode {
    #[serde(rename = "serviceName")]
    pub service_name: String,

    /// Start time, millisecond precision
    pub start: String,

    /// End time, millisecond precision
    pub end: String,

    /// Span opened by this call
    #[serde(rename = "span")]
    pub span_id: String,

    /// Direct callees, ascending by start time
    #[serde(rename = "calls")]
    pub children: Vec<CallNode>,
}

impl CallNode {
    /// Build a childless node from a hop
    pub fn leaf(hop: &Hop) -> Self {
        Self {
            service_name: hop.service_name.clone(),
            start: format_timestamp(&hop.start_time),
            end: format_timestamp(&hop.end_time),
            span_id: hop.new_span_id.clone(),
            children: Vec::new(),
        }
    }

    /// Number of nodes in this subtree, including `self`
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut pending = vec![self];
        while let Some(node) = pending.pop() {
            count += 1;
            pending.extend(node.children.iter());
        }
        count
    }
}

impl Drop for CallNode {
    fn drop(&mut self) {
        // Flatten the subtree so each node drops with no children left
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

/// A trace id with its call tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceDocument {
    #[serde(rename = "traceId")]
    pub trace_id: String,

    pub root: CallNode,
}
