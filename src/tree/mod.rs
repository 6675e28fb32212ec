//! Call tree reconstruction.
//!
//! This module handles:
//! - Resolving the single root hop of a trace
//! - Indexing hops by parent span and walking them breadth-first
//! - The wire shape of the resulting trace documents

pub mod builder;
pub mod schema;

// Re-export main types
pub use builder::{assemble_traces, build_trace, find_root, index_children, AssembledTrace, IdentityPolicy};
pub use schema::{CallNode, TraceDocument};
