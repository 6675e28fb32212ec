//! Span log parsing.
//!
//! This module handles:
//! - Matching log lines against the hop grammar
//! - Parsing the two accepted UTC timestamp formats
//! - Reading a whole log while skipping malformed lines

pub mod hop;
pub mod timestamp;

// Re-export main types
pub use hop::{parse_line, read_hops, Hop, HopKey};
pub use timestamp::{format_timestamp, parse_timestamp};
