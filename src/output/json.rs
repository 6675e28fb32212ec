//! JSON output writers.
//!
//! Traces are written as JSON Lines, one compact document per line.
//! The run report is a single pretty-printed JSON file.
//!
//! Call trees are emitted by walking them with an explicit stack, so a
//! trace of any depth is written without growing the call stack. The
//! bytes match the derived `Serialize` output of [`TraceDocument`].

use super::report::RunReport;
use crate::tree::{CallNode, TraceDocument};
use crate::utils::error::OutputError;
use log::{debug, info};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Write trace documents as JSON Lines to any writer
///
/// **Public** - used by write_traces and tests
///
/// # Returns
/// Number of lines written
pub fn write_trace_lines<'a, W, I>(writer: &mut W, documents: I) -> Result<usize, OutputError>
where
    W: Write,
    I: IntoIterator<Item = &'a TraceDocument>,
{
    let mut written = 0;
    for document in documents {
        write_document(writer, document)?;
        writer.write_all(b"\n")?;
        written += 1;
    }
    writer.flush()?;
    Ok(written)
}

/// Write one document as a compact JSON object
///
/// **Private** - depth-first walk; each stack entry holds the children of
/// an open node that are still to be written.
fn write_document<W: Write>(writer: &mut W, document: &TraceDocument) -> Result<(), OutputError> {
    writer.write_all(br#"{"traceId":"#)?;
    serde_json::to_writer(&mut *writer, &document.trace_id)?;
    writer.write_all(br#","root":"#)?;

    write_node_fields(writer, &document.root)?;
    let mut open = vec![(document.root.children.iter(), false)];

    while let Some((children, started)) = open.last_mut() {
        match children.next() {
            Some(child) => {
                if *started {
                    writer.write_all(b",")?;
                }
                *started = true;
                write_node_fields(writer, child)?;
                open.push((child.children.iter(), false));
            }
            None => {
                writer.write_all(b"]}")?;
                open.pop();
            }
        }
    }

    writer.write_all(b"}")?;
    Ok(())
}

/// Write a node's scalar fields and open its `calls` array
///
/// **Private** - strings go through serde_json for escaping
fn write_node_fields<W: Write>(writer: &mut W, node: &CallNode) -> Result<(), OutputError> {
    writer.write_all(br#"{"serviceName":"#)?;
    serde_json::to_writer(&mut *writer, &node.service_name)?;
    writer.write_all(br#","start":"#)?;
    serde_json::to_writer(&mut *writer, &node.start)?;
    writer.write_all(br#","end":"#)?;
    serde_json::to_writer(&mut *writer, &node.end)?;
    writer.write_all(br#","span":"#)?;
    serde_json::to_writer(&mut *writer, &node.span_id)?;
    writer.write_all(br#","calls":["#)?;
    Ok(())
}

/// Write trace documents to a JSON Lines file
///
/// **Public** - main entry point for trace output
///
/// # Arguments
/// * `documents` - Trace documents, one per output line
/// * `output_path` - Path to the output file
///
/// # Returns
/// Number of documents written
///
/// # Errors
/// * `OutputError::WriteFailed` - I/O error during write
/// * `OutputError::SerializationFailed` - JSON serialization error
/// * `OutputError::InvalidPath` - Path cannot be created or is invalid
pub fn write_traces(
    documents: &[TraceDocument],
    output_path: impl AsRef<Path>,
) -> Result<usize, OutputError> {
    let output_path = output_path.as_ref();

    info!("Writing {} traces to: {}", documents.len(), output_path.display());

    let mut writer = BufWriter::new(create_output_file(output_path)?);
    let written = write_trace_lines(&mut writer, documents)?;

    info!(
        "Traces written successfully ({} bytes)",
        calculate_file_size(output_path)
    );

    Ok(written)
}

/// Read trace documents back from a JSON Lines file
///
/// **Public** - useful for validation and testing
///
/// Decoding goes through the derived `Deserialize`, which keeps
/// serde_json's nesting limit of 128. A line holding a deeper call tree
/// is reported as `SerializationFailed` instead of being read.
///
/// # Errors
/// * `OutputError::WriteFailed` - File read error (reusing WriteFailed for I/O)
/// * `OutputError::SerializationFailed` - a line is not a trace document
pub fn read_traces(input_path: impl AsRef<Path>) -> Result<Vec<TraceDocument>, OutputError> {
    let input_path = input_path.as_ref();

    debug!("Reading traces from: {}", input_path.display());

    let reader = BufReader::new(File::open(input_path)?);
    let mut documents = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        documents.push(serde_json::from_str(&line)?);
    }

    debug!("Loaded {} traces", documents.len());

    Ok(documents)
}

/// Write the run report as pretty JSON
///
/// **Public** - used by the assemble command when `--report` is given
pub fn write_report(report: &RunReport, output_path: impl AsRef<Path>) -> Result<(), OutputError> {
    let output_path = output_path.as_ref();

    info!("Writing run report to: {}", output_path.display());

    let writer = BufWriter::new(create_output_file(output_path)?);
    serde_json::to_writer_pretty(writer, report)?;

    Ok(())
}

/// Read a run report from a JSON file
///
/// **Public** - useful for validation and testing
pub fn read_report(input_path: impl AsRef<Path>) -> Result<RunReport, OutputError> {
    let input_path = input_path.as_ref();

    debug!("Reading run report from: {}", input_path.display());

    let file = File::open(input_path)?;
    let report: RunReport = serde_json::from_reader(BufReader::new(file))?;

    Ok(report)
}

/// Validate that output path is writable
///
/// **Public** - also used to check CLI arguments up front
pub fn validate_path(path: &Path) -> Result<(), OutputError> {
    if path.as_os_str().is_empty() {
        return Err(OutputError::InvalidPath("Path is empty".to_string()));
    }

    // Check if we're trying to overwrite a directory
    if path.is_dir() {
        return Err(OutputError::InvalidPath(format!(
            "Path is a directory: {}",
            path.display()
        )));
    }

    Ok(())
}

/// Validate the path, create missing parents and open the file
///
/// **Private** - shared by the writers
fn create_output_file(output_path: &Path) -> Result<File, OutputError> {
    validate_path(output_path)?;

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            debug!("Creating parent directories: {}", parent.display());
            std::fs::create_dir_all(parent).map_err(|e| {
                OutputError::InvalidPath(format!(
                    "Cannot create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }

    Ok(File::create(output_path)?)
}

/// Calculate file size in bytes
///
/// **Private** - internal utility
fn calculate_file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(trace_id: &str) -> TraceDocument {
        TraceDocument {
            trace_id: trace_id.to_string(),
            root: CallNode {
                service_name: "svcA".to_string(),
                start: "2024-01-01T00:00:00.000Z".to_string(),
                end: "2024-01-01T00:00:05.000Z".to_string(),
                span_id: "S1".to_string(),
                children: Vec::new(),
            },
        }
    }

    #[test]
    fn test_write_trace_lines_one_per_line() {
        let docs = vec![document("T1"), document("T2")];
        let mut buf = Vec::new();

        let written = write_trace_lines(&mut buf, &docs).unwrap();

        let text = String::from_utf8(buf).unwrap();
        assert_eq!(written, 2);
        assert_eq!(text.lines().count(), 2);
        assert!(text.ends_with('\n'));
        assert!(text.lines().all(|l| l.starts_with(r#"{"traceId":"#)));
    }

    #[test]
    fn test_write_matches_derived_serialize() {
        let mut doc = document("T\"1");
        let mut child = doc.root.clone();
        child.service_name = "svc\\B\u{e9}".to_string();
        child.children.push(document("x").root.clone());
        doc.root.children.push(child);
        doc.root.children.push(document("y").root.clone());

        let mut buf = Vec::new();
        write_trace_lines(&mut buf, [&doc]).unwrap();

        let expected = serde_json::to_string(&doc).unwrap() + "\n";
        assert_eq!(String::from_utf8(buf).unwrap(), expected);
    }

    #[test]
    fn test_write_deep_chain() {
        let depth = 200_000;
        let mut doc = document("T1");
        for _ in 0..depth {
            let mut parent = document("T1").root;
            parent.children.push(doc.root);
            doc.root = parent;
        }

        let mut buf = Vec::new();
        write_trace_lines(&mut buf, [&doc]).unwrap();

        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.matches(r#""span":"S1""#).count(), depth + 1);
        assert!(text.ends_with(&format!("\"calls\":[{}}}\n", "]}".repeat(depth + 1))));
    }

    #[test]
    fn test_read_rejects_trees_past_nesting_limit() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("deep.jsonl");
        let mut doc = document("T1");
        for _ in 0..200 {
            let mut parent = document("T1").root;
            parent.children.push(doc.root);
            doc.root = parent;
        }

        write_traces(&[doc], &path).unwrap();

        assert!(matches!(read_traces(&path), Err(OutputError::SerializationFailed(_))));
    }

    #[test]
    fn test_validate_output_path_empty() {
        let result = validate_path(Path::new(""));
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_output_path_directory() {
        // Try to write to a directory path
        let temp_dir = tempfile::tempdir().unwrap();
        let result = validate_path(temp_dir.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_write_creates_parent_dirs() {
        let temp_dir = tempfile::tempdir().unwrap();
        let nested_path = temp_dir.path().join("nested/dirs/traces.jsonl");

        write_traces(&[document("T1")], &nested_path).unwrap();

        assert!(nested_path.exists());
        assert_eq!(read_traces(&nested_path).unwrap(), vec![document("T1")]);
    }
}
