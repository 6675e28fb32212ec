//! Error types for the entire application.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.

use thiserror::Error;

/// Errors that can occur while parsing a single log line
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Line does not match the hop grammar: {0}")]
    MalformedLine(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Hop ends before it starts: {start} > {end}")]
    InvertedInterval { start: String, end: String },
}

/// Errors that can occur while assembling one trace into a call tree
///
/// These are per-trace: the pipeline logs them and moves on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("Trace {0} has no hops")]
    EmptyTrace(String),

    #[error("Trace {0} has no root hop")]
    NoRootFound(String),

    #[error("Trace {trace_id} has {count} root hops")]
    MultipleRootsFound { trace_id: String, count: usize },
}

/// A single grouping task that did not produce a result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    /// Index of the batch in input order
    pub batch: usize,

    /// Panic payload or other reason
    pub reason: String,
}

impl std::fmt::Display for BatchFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "batch {}: {}", self.batch, self.reason)
    }
}

/// Errors that can occur during the parallel grouping phase
#[derive(Error, Debug)]
pub enum GroupError {
    #[error("Batch size must be at least 1")]
    InvalidBatchSize,

    #[error("{} batch task(s) failed, {cancelled} cancelled; first: {}", .failures.len(), first_failure(.failures))]
    TasksFailed {
        failures: Vec<BatchFailure>,
        cancelled: usize,
    },
}

fn first_failure(failures: &[BatchFailure]) -> String {
    failures
        .first()
        .map(ToString::to_string)
        .unwrap_or_else(|| "none".to_string())
}

/// Errors that can occur during file output
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write file: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("Failed to serialize JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),
}
