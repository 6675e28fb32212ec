use std::io::Cursor;
use trace_assembler::aggregator::Diagnostics;
use trace_assembler::parser::{format_timestamp, parse_line, read_hops};
use trace_assembler::utils::error::ParseError;

#[test]
fn test_parse_fields_equal_tokens() {
    let hop = parse_line("2013-10-23T10:12:35.298987Z 2013-10-23T10:12:35.300000Z 4gjzbf5k gateway abc123->xyz789")
        .unwrap();

    assert_eq!(hop.trace_id, "4gjzbf5k");
    assert_eq!(hop.service_name, "gateway");
    assert_eq!(hop.prev_span_id, "abc123");
    assert_eq!(hop.new_span_id, "xyz789");
    assert_eq!(format_timestamp(&hop.start_time), "2013-10-23T10:12:35.298Z");
    assert_eq!(format_timestamp(&hop.end_time), "2013-10-23T10:12:35.300Z");
}

#[test]
fn test_parse_mixed_precision() {
    let hop = parse_line("2024-01-01T00:00:00Z 2024-01-01T00:00:00.000500Z T1 svcA null->S1").unwrap();
    assert!(hop.start_time < hop.end_time);
    assert_eq!(format_timestamp(&hop.end_time), "2024-01-01T00:00:00.000Z");
}

#[test]
fn test_parse_rejects_millisecond_input() {
    let result = parse_line("2024-01-01T00:00:00.123Z 2024-01-01T00:00:01Z T1 svcA null->S1");
    assert!(matches!(result, Err(ParseError::InvalidTimestamp(_))));
}

#[test]
fn test_parse_rejects_non_alphanumeric_tokens() {
    for line in [
        "2024-01-01T00:00:00Z 2024-01-01T00:00:01Z T_1 svcA null->S1",
        "2024-01-01T00:00:00Z 2024-01-01T00:00:01Z T1 svc.A null->S1",
        "2024-01-01T00:00:00Z 2024-01-01T00:00:01Z T1 svcA null->S-1",
        "2024-01-01T00:00:00Z 2024-01-01T00:00:01Z T1 svcA ->S1",
    ] {
        assert!(matches!(parse_line(line), Err(ParseError::MalformedLine(_))), "{}", line);
    }
}

#[test]
fn test_bad_line_does_not_affect_neighbours() {
    let input = "\
2024-01-01T00:00:00Z 2024-01-01T00:00:05Z T1 svcA null->S1
2024-01-01T00:00:09Z 2024-01-01T00:00:05Z T1 svcX S1->S7
2024-01-01T00:00:01Z 2024-01-01T00:00:03Z T1 svcB S1->S2";
    let diagnostics = Diagnostics::new();

    let hops = read_hops(Cursor::new(input), &diagnostics).unwrap();

    let spans: Vec<&str> = hops.iter().map(|h| h.new_span_id.as_str()).collect();
    assert_eq!(spans, vec!["S1", "S2"]);
    assert_eq!(hops[1].sequence, 3);
    assert_eq!(diagnostics.snapshot().malformed_lines, 1);
}

#[test]
fn test_read_hops_accepts_tagged_lines() {
    let input = "\
2024-01-01T00:00:00Z INFO 2024-01-01T00:00:00Z 2024-01-01T00:00:05Z T1 svcA null->S1
2024-01-01T00:00:01Z 2024-01-01T00:00:03Z T1 svcB S1->S2 (retry=0)
";
    let diagnostics = Diagnostics::new();

    let hops = read_hops(Cursor::new(input), &diagnostics).unwrap();

    let spans: Vec<&str> = hops.iter().map(|h| h.new_span_id.as_str()).collect();
    assert_eq!(spans, vec!["S1", "S2"]);
    assert_eq!(format_timestamp(&hops[0].end_time), "2024-01-01T00:00:05.000Z");
    assert_eq!(diagnostics.snapshot().malformed_lines, 0);
}
