//! Configuration and constants for the assembler.

/// Number of hops handed to a single grouping task
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Literal parent span id that marks the entry point of a trace
pub const ROOT_SPAN_SENTINEL: &str = "null";

/// Current run report schema version
pub const REPORT_SCHEMA_VERSION: &str = "1.0.0";

// Input timestamps come in exactly two shapes:
// 2024-01-01T00:00:00.123456Z and 2024-01-01T00:00:00Z
pub const INPUT_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
pub const INPUT_FRACTION_DIGITS: usize = 6;

/// Output timestamps are always millisecond precision with a `Z` suffix
pub const OUTPUT_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

// Environment overrides picked up by the CLI
pub const ENV_BATCH_SIZE: &str = "TRACE_ASSEMBLER_BATCH_SIZE";
pub const ENV_WORKERS: &str = "TRACE_ASSEMBLER_WORKERS";
pub const ENV_IDENTITY: &str = "TRACE_ASSEMBLER_IDENTITY";
