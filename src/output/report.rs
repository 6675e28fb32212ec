//! Run report schema.
//!
//! Optional pretty JSON summary of one run, written next to the traces.

use crate::aggregator::metrics::{DiagnosticsSnapshot, RunStats};
use crate::utils::config::REPORT_SCHEMA_VERSION;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level run report structure written to JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Schema version for compatibility checking
    pub version: String,

    pub input: String,
    pub output: String,

    pub stats: RunStats,
    pub diagnostics: DiagnosticsSnapshot,

    /// Timestamp when the report was generated
    pub generated_at: String,
}

impl RunReport {
    pub fn new(input: &Path, output: &Path, stats: RunStats, diagnostics: DiagnosticsSnapshot) -> Self {
        use chrono::Utc;

        Self {
            version: REPORT_SCHEMA_VERSION.to_string(),
            input: input.display().to_string(),
            output: output.display().to_string(),
            stats,
            diagnostics,
            generated_at: Utc::now().to_rfc3339(),
        }
    }
}
