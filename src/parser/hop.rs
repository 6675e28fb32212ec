//! Hop records parsed from the span log.
//!
//! Each log line describes one parent -> child span transition:
//!
//! ```text
//! 2024-01-01T00:00:01Z 2024-01-01T00:00:03Z T1 svcB S1->S2
//! <start>              <end>                <trace> <service> <prev>-><new>
//! ```
//!
//! The hop may sit anywhere in the line, so a log-level tag before it or
//! free text after it is ignored. Each field must still be a whole
//! whitespace-separated token. Lines with no hop in them are reported and
//! dropped; they never affect other lines.

use super::timestamp::parse_timestamp;
use crate::aggregator::metrics::Diagnostics;
use crate::utils::config::ROOT_SPAN_SENTINEL;
use crate::utils::error::ParseError;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use regex::Regex;
use std::io::{self, BufRead};
use std::sync::LazyLock;

static HOP_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?:^|\s)",
        r"(\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}\S*Z)\s+",
        r"(\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}\S*Z)\s+",
        r"([A-Za-z0-9]+)\s+",
        r"([A-Za-z0-9]+)\s+",
        r"([A-Za-z0-9]+)->([A-Za-z0-9]+)",
        r"(?:\s|$)",
    ))
    .expect("hop line pattern is valid")
});

/// One parent -> child span transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hop {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub trace_id: String,
    pub service_name: String,

    /// Parent span; `"null"` marks the trace root
    pub prev_span_id: String,

    /// Span opened by this hop
    pub new_span_id: String,

    /// 1-based input line number, used to keep file order stable
    pub sequence: u64,
}

/// Identity used when hops are collapsed by key
///
/// Only trace, service and parent span take part; timestamps and the
/// child span are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HopKey<'a> {
    pub trace_id: &'a str,
    pub service_name: &'a str,
    pub prev_span_id: &'a str,
}

impl Hop {
    /// Whether this hop opens its trace
    pub fn is_root(&self) -> bool {
        self.prev_span_id == ROOT_SPAN_SENTINEL
    }

    pub fn key(&self) -> HopKey<'_> {
        HopKey {
            trace_id: &self.trace_id,
            service_name: &self.service_name,
            prev_span_id: &self.prev_span_id,
        }
    }
}

/// Parse a single log line into a hop
///
/// **Public** - main entry point for line parsing
///
/// The returned hop has `sequence == 0`; [`read_hops`] stamps the line number.
///
/// # Errors
/// * `ParseError::MalformedLine` - no hop-shaped run of tokens in the line
/// * `ParseError::InvalidTimestamp` - a timestamp is not one of the two accepted formats
/// * `ParseError::InvertedInterval` - the end time is before the start time
pub fn parse_line(line: &str) -> Result<Hop, ParseError> {
    let caps = HOP_LINE
        .captures(line)
        .ok_or_else(|| ParseError::MalformedLine(line.to_string()))?;

    let start_time = parse_timestamp(&caps[1])?;
    let end_time = parse_timestamp(&caps[2])?;

    if start_time > end_time {
        return Err(ParseError::InvertedInterval {
            start: caps[1].to_string(),
            end: caps[2].to_string(),
        });
    }

    Ok(Hop {
        start_time,
        end_time,
        trace_id: caps[3].to_string(),
        service_name: caps[4].to_string(),
        prev_span_id: caps[5].to_string(),
        new_span_id: caps[6].to_string(),
        sequence: 0,
    })
}

/// Read every hop from a line-oriented source
///
/// **Public** - used by the assemble command
///
/// Malformed lines (including invalid UTF-8) are logged, counted in
/// `diagnostics` and skipped. Blank lines are ignored.
///
/// # Errors
/// Only I/O errors from the underlying reader.
pub fn read_hops<R: BufRead>(mut reader: R, diagnostics: &Diagnostics) -> io::Result<Vec<Hop>> {
    let mut hops = Vec::new();
    let mut buf = Vec::new();
    let mut line_no: u64 = 0;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        line_no += 1;

        let Ok(line) = std::str::from_utf8(&buf) else {
            diagnostics.record_line();
            diagnostics.record_malformed_line();
            warn!("Line {}: not valid UTF-8, ignoring", line_no);
            continue;
        };

        if line.trim().is_empty() {
            continue;
        }
        diagnostics.record_line();

        match parse_line(line) {
            Ok(mut hop) => {
                hop.sequence = line_no;
                diagnostics.record_hop();
                hops.push(hop);
            }
            Err(e) => {
                diagnostics.record_malformed_line();
                warn!("Line {}: {}, ignoring: {}", line_no, e, line.trim_end());
            }
        }
    }

    debug!("Read {} hops from {} lines", hops.len(), line_no);

    Ok(hops)
}
