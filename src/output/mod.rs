//! Output writers for trace documents and run reports.
//!
//! This module handles writing data to disk:
//! - JSON Lines trace files (one document per line)
//! - Pretty JSON run reports

pub mod json;
pub mod report;

// Re-export main functions
pub use json::{read_report, read_traces, validate_path, write_report, write_trace_lines, write_traces};
pub use report::RunReport;
