use std::path::Path;
use trace_assembler::aggregator::{DiagnosticsSnapshot, LargestTrace, RunStats};
use trace_assembler::output::{read_report, read_traces, validate_path, write_report, write_traces, RunReport};
use trace_assembler::tree::{CallNode, TraceDocument};
use tempfile::NamedTempFile;

fn create_test_document() -> TraceDocument {
    TraceDocument {
        trace_id: "T1".to_string(),
        root: CallNode {
            service_name: "svcA".to_string(),
            start: "2024-01-01T00:00:00.000Z".to_string(),
            end: "2024-01-01T00:00:05.000Z".to_string(),
            span_id: "S1".to_string(),
            children: vec![CallNode {
                service_name: "svcB".to_string(),
                start: "2024-01-01T00:00:01.000Z".to_string(),
                end: "2024-01-01T00:00:03.000Z".to_string(),
                span_id: "S2".to_string(),
                children: Vec::new(),
            }],
        },
    }
}

#[test]
fn test_write_and_read_traces() {
    let temp_file = NamedTempFile::new().unwrap();
    let path = temp_file.path();

    let written = write_traces(&[create_test_document()], path).unwrap();
    assert_eq!(written, 1);

    let text = std::fs::read_to_string(path).unwrap();
    assert_eq!(
        text,
        concat!(
            r#"{"traceId":"T1","root":{"serviceName":"svcA","start":"2024-01-01T00:00:00.000Z","#,
            r#""end":"2024-01-01T00:00:05.000Z","span":"S1","calls":[{"serviceName":"svcB","#,
            r#""start":"2024-01-01T00:00:01.000Z","end":"2024-01-01T00:00:03.000Z","span":"S2","calls":[]}]}}"#,
            "\n"
        )
    );

    assert_eq!(read_traces(path).unwrap(), vec![create_test_document()]);
}

#[test]
fn test_write_and_read_report() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("reports/run.json");

    let stats = RunStats {
        trace_count: 2,
        total_hops: 5,
        largest_trace: Some(LargestTrace { trace_id: "T1".to_string(), hop_count: 4 }),
        average_trace_size: 2.5,
    };
    let diagnostics = DiagnosticsSnapshot {
        malformed_lines: 1,
        ..Default::default()
    };
    let report = RunReport::new(Path::new("in.log"), Path::new("out.jsonl"), stats, diagnostics);

    write_report(&report, &path).unwrap();
    let loaded = read_report(&path).unwrap();

    assert_eq!(loaded, report);
    assert_eq!(loaded.version, "1.0.0");
}

#[test]
fn test_validate_output_path_empty() {
    let result = validate_path(Path::new(""));
    assert!(result.is_err());
}

#[test]
fn test_write_traces_into_directory_fails() {
    let temp_dir = tempfile::tempdir().unwrap();
    let result = write_traces(&[create_test_document()], temp_dir.path());
    assert!(result.is_err());
}
