//! Timestamp normalization for imported records
//!
//! Backups written by older app versions carry dates in several shapes.
//! Everything is normalized to ISO-8601 UTC with millisecond precision,
//! e.g. `2023-12-31T00:00:00.000Z`. Zone-less inputs are taken as UTC.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde_json::Value;

/// Zone-less date-time layouts, tried in order after RFC 3339
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Date-only layouts, read as midnight UTC
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];

/// Parse a timestamp in any accepted shape.
///
/// Strings are tried as RFC 3339, then the zone-less layouts; numbers are
/// epoch milliseconds. Anything else, including `""`, yields `None`.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_str(s.trim()),
        Value::Number(n) => n
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        _ => None,
    }
}

fn parse_str(s: &str) -> Option<DateTime<Utc>> {
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
        }
    }
    None
}

pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Normalize a timestamp value, or `None` when it cannot be read
pub fn fix_date(value: &Value) -> Option<String> {
    parse_timestamp(value).map(|dt| format_timestamp(&dt))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_accepted_shapes() {
        let cases = [
            ("2024-03-05T10:20:30.123Z", "2024-03-05T10:20:30.123Z"),
            ("2024-03-05T10:20:30+07:00", "2024-03-05T03:20:30.000Z"),
            ("2024-03-05T10:20:30", "2024-03-05T10:20:30.000Z"),
            ("2024-03-05 10:20:30", "2024-03-05T10:20:30.000Z"),
            ("2024-03-05T10:20", "2024-03-05T10:20:00.000Z"),
            ("2024-03-05", "2024-03-05T00:00:00.000Z"),
            ("31/12/2023", "2023-12-31T00:00:00.000Z"),
        ];
        for (input, expected) in cases {
            assert_eq!(fix_date(&json!(input)).as_deref(), Some(expected), "{}", input);
        }
    }

    #[test]
    fn test_epoch_millis() {
        assert_eq!(
            fix_date(&json!(1_704_067_200_000_i64)).as_deref(),
            Some("2024-01-01T00:00:00.000Z")
        );
    }

    #[test]
    fn test_rejected_values() {
        for value in [
            json!("not-a-date"),
            json!(""),
            json!("32/01/2024"),
            json!(null),
            json!(true),
        ] {
            assert_eq!(fix_date(&value), None, "{}", value);
        }
    }

    #[test]
    fn test_normalization_is_stable() {
        let once = fix_date(&json!("31/12/2023")).unwrap();
        assert_eq!(fix_date(&json!(once.clone())), Some(once));
    }
}
