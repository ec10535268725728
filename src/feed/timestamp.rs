//! Canonical post timestamps.
//!
//! Stored and emitted as `YYYY-MM-DDTHH:MM:SS.ffffffZ`. The fixed width makes
//! plain text comparison in SQLite agree with chronological order.

use chrono::{DateTime, SubsecRound, Utc};
use serde::Serializer;

const CANONICAL: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// Current time, truncated to the precision we store.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

pub fn format(ts: &DateTime<Utc>) -> String {
    ts.format(CANONICAL).to_string()
}

/// Parses any RFC 3339 timestamp and normalises it to UTC.
pub fn parse(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|ts| ts.with_timezone(&Utc).trunc_subsecs(6))
}

pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format(ts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn format_is_fixed_width_utc() {
        let ts = Utc.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap();
        assert_eq!(format(&ts), "2025-03-04T05:06:07.000000Z");
    }

    #[test]
    fn parse_then_format_is_lossless() {
        let raw = "2025-03-04T05:06:07.123456Z";
        assert_eq!(format(&parse(raw).unwrap()), raw);
    }

    #[test]
    fn parse_normalises_offsets() {
        let ts = parse("2025-03-04T07:06:07.5+02:00").unwrap();
        assert_eq!(format(&ts), "2025-03-04T05:06:07.500000Z");
    }

    #[test]
    fn parse_accepts_millisecond_precision() {
        let ts = parse("2025-03-04T05:06:07.123Z").unwrap();
        assert_eq!(format(&ts), "2025-03-04T05:06:07.123000Z");
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse("yesterday").is_err());
        assert!(parse("").is_err());
    }

    #[test]
    fn now_round_trips_exactly() {
        let ts = now();
        assert_eq!(parse(&format(&ts)).unwrap(), ts);
    }

    #[test]
    fn canonical_strings_sort_chronologically() {
        let earlier = format(&Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap());
        let later = format(&Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        assert!(earlier < later);
    }
}
