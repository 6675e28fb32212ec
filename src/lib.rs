//! Trace Assembler
//!
//! Rebuilds nested request-call traces from a flat log of span hops.
//! Each input line records one parent -> child span transition; the
//! output has one JSON document per trace with its calls nested and
//! ordered by start time.
//!
//! This crate provides the core implementation for the
//! `trace-assembler` CLI tool.
//!
//! ## Getting Started
//!
//! ```bash
//! trace-assembler spans.log traces.jsonl --summary
//! ```

pub mod aggregator;
pub mod commands;
pub mod output;
pub mod parser;
pub mod tree;
pub mod utils;
