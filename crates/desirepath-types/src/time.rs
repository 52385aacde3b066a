use chrono::{DateTime, Utc};

/// Fixed-width UTC timestamp format with nanosecond precision.
/// Lexicographic order on the stored text matches chronological order,
/// which lets the store sort and window on the raw column.
const STORED_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.9fZ";

/// Format a timestamp for persistence.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(STORED_FORMAT).to_string()
}

/// Parse a persisted timestamp back to `DateTime<Utc>`.
///
/// Accepts both the stored nanosecond form and plain RFC 3339 (the wire
/// contract uses RFC 3339 query parameters).
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

/// Current wall clock, formatted for persistence.
pub fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_is_fixed_width() {
        let a = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let formatted = format_timestamp(a);
        assert_eq!(formatted, "2025-01-02T03:04:05.000000000Z");
        assert_eq!(formatted.len(), 30);
    }

    #[test]
    fn test_round_trip_preserves_nanos() {
        let ts = Utc
            .timestamp_opt(1_735_000_000, 123_456_789)
            .single()
            .unwrap();
        let text = format_timestamp(ts);
        let parsed = parse_timestamp(&text).unwrap();
        assert_eq!(parsed, ts);
    }

    #[test]
    fn test_lexicographic_order_matches_chronological() {
        let earlier = Utc.timestamp_opt(1_735_000_000, 1).single().unwrap();
        let later = Utc.timestamp_opt(1_735_000_000, 2).single().unwrap();
        assert!(format_timestamp(earlier) < format_timestamp(later));
    }

    #[test]
    fn test_parse_accepts_rfc3339_offsets() {
        let parsed = parse_timestamp("2025-06-01T10:00:00+02:00").unwrap();
        assert_eq!(format_timestamp(parsed), "2025-06-01T08:00:00.000000000Z");
    }
}
