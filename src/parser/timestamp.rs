//! UTC timestamp handling for hop records.
//!
//! Input accepts exactly two shapes, microsecond and second precision:
//! `2024-01-01T00:00:00.123456Z` and `2024-01-01T00:00:00Z`.
//! Output is always millisecond precision: `2024-01-01T00:00:00.123Z`.

use crate::utils::config::{INPUT_FRACTION_DIGITS, INPUT_TIMESTAMP_FORMAT, OUTPUT_TIMESTAMP_FORMAT};
use crate::utils::error::ParseError;
use chrono::{DateTime, NaiveDateTime, TimeZone, Timelike, Utc};

/// Parse an input timestamp
///
/// **Public** - used by the hop parser for both start and end times
///
/// # Errors
/// * `ParseError::InvalidTimestamp` - missing `Z`, fraction that is not
///   exactly six digits, or an impossible calendar value
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, ParseError> {
    let invalid = || ParseError::InvalidTimestamp(raw.to_string());

    let body = raw.strip_suffix('Z').ok_or_else(invalid)?;

    let (base, micros) = match body.split_once('.') {
        Some((base, fraction)) => {
            if fraction.len() != INPUT_FRACTION_DIGITS
                || !fraction.bytes().all(|b| b.is_ascii_digit())
            {
                return Err(invalid());
            }
            (base, fraction.parse::<u32>().map_err(|_| invalid())?)
        }
        None => (body, 0),
    };

    let naive = NaiveDateTime::parse_from_str(base, INPUT_TIMESTAMP_FORMAT)
        .map_err(|_| invalid())?
        .with_nanosecond(micros * 1_000)
        .ok_or_else(invalid)?;

    Ok(Utc.from_utc_datetime(&naive))
}

/// Format a timestamp for the output documents
///
/// **Public** - used when converting hops into call nodes
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(OUTPUT_TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_second_precision() {
        let ts = parse_timestamp("2024-01-01T00:00:05Z").unwrap();
        assert_eq!(format_timestamp(&ts), "2024-01-01T00:00:05.000Z");
    }

    #[test]
    fn test_parse_microsecond_precision_truncates_on_output() {
        let ts = parse_timestamp("2013-10-23T10:12:35.298987Z").unwrap();
        assert_eq!(ts.timestamp_subsec_micros(), 298_987);
        assert_eq!(format_timestamp(&ts), "2013-10-23T10:12:35.298Z");
    }

    #[test]
    fn test_rejects_other_fraction_widths() {
        assert!(parse_timestamp("2024-01-01T00:00:00.123Z").is_err());
        assert!(parse_timestamp("2024-01-01T00:00:00.123456789Z").is_err());
        assert!(parse_timestamp("2024-01-01T00:00:00.Z").is_err());
    }

    #[test]
    fn test_rejects_missing_suffix_and_bad_calendar() {
        assert!(parse_timestamp("2024-01-01T00:00:00").is_err());
        assert!(parse_timestamp("2024-13-01T00:00:00Z").is_err());
        assert!(parse_timestamp("2024-02-30T00:00:00Z").is_err());
        assert_eq!(
            parse_timestamp("garbageZ"),
            Err(ParseError::InvalidTimestamp("garbageZ".to_string()))
        );
    }

    #[test]
    fn test_microsecond_ordering_is_preserved() {
        let a = parse_timestamp("2024-01-01T00:00:00.000001Z").unwrap();
        let b = parse_timestamp("2024-01-01T00:00:00.000002Z").unwrap();
        assert!(a < b);
    }
}
