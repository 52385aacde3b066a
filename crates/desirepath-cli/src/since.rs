use anyhow::{Context, Result, bail};
use chrono::{Duration, Utc};

use desirepath_types::{format_timestamp, parse_timestamp};

/// Turn a user-facing `--since` value into a stored-format timestamp.
///
/// Accepts relative windows (`90m`, `24h`, `7d`), a bare date
/// (`2025-06-01`) or a full RFC 3339 timestamp.
pub fn parse_since(text: &str) -> Result<String> {
    let text = text.trim();
    if text.is_empty() {
        bail!("empty --since value");
    }

    if let Some(duration) = parse_relative(text) {
        return Ok(format_timestamp(Utc::now() - duration));
    }

    if let Some(ts) = parse_timestamp(text) {
        return Ok(format_timestamp(ts));
    }

    let date = format!("{}T00:00:00Z", text);
    let ts = parse_timestamp(&date)
        .with_context(|| format!("cannot parse '{}' as a time, date or window like 7d", text))?;
    Ok(format_timestamp(ts))
}

fn parse_relative(text: &str) -> Option<Duration> {
    if !text.is_ascii() {
        return None;
    }
    let (number, unit) = text.split_at(text.len().checked_sub(1)?);
    let amount: i64 = number.parse().ok()?;
    if amount < 0 {
        return None;
    }
    match unit {
        "m" => Some(Duration::minutes(amount)),
        "h" => Some(Duration::hours(amount)),
        "d" => Some(Duration::days(amount)),
        _ => None,
    }
}

/// Resolve an optional `--since` flag.
pub fn resolve_since(since: &Option<String>) -> Result<Option<String>> {
    since.as_deref().map(parse_since).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_windows() {
        let now = Utc::now();
        let week_ago = parse_since("7d").unwrap();
        let parsed = parse_timestamp(&week_ago).unwrap();
        let delta = now - parsed - Duration::days(7);
        assert!(delta.num_seconds().abs() < 5);

        assert!(parse_since("24h").is_ok());
        assert!(parse_since("90m").is_ok());
    }

    #[test]
    fn test_rfc3339_and_date() {
        assert_eq!(
            parse_since("2025-06-01T10:00:00Z").unwrap(),
            "2025-06-01T10:00:00.000000000Z"
        );
        assert_eq!(
            parse_since("2025-06-01").unwrap(),
            "2025-06-01T00:00:00.000000000Z"
        );
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(parse_since("yesterday").is_err());
        assert!(parse_since("").is_err());
        assert!(parse_since("-7d").is_err());
    }
}
