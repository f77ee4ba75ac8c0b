//! Timestamp utilities

use chrono::{DateTime, SecondsFormat, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current time as milliseconds since the Unix epoch
pub fn epoch_millis() -> u64 {
    now().timestamp_millis().max(0) as u64
}

/// Current time as an RFC 3339 string with millisecond precision
/// (e.g. `2024-05-01T12:00:00.123Z`)
pub fn now_rfc3339() -> String {
    now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_now_returns_valid_timestamp() {
        let timestamp = now();
        // Should be a reasonable timestamp (after year 2000)
        assert!(timestamp.timestamp() > 946_684_800);
    }

    #[test]
    fn test_epoch_millis_matches_seconds() {
        let millis = epoch_millis();
        let seconds = now().timestamp() as u64;
        assert!(millis / 1000 <= seconds);
        assert!(seconds - millis / 1000 < 5);
    }

    #[tokio::test]
    async fn test_epoch_millis_advances() {
        let first = epoch_millis();
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = epoch_millis();
        assert!(second > first);
    }

    #[test]
    fn test_now_rfc3339_is_parseable_utc() {
        let stamp = now_rfc3339();
        assert!(stamp.ends_with('Z'));
        let parsed = DateTime::parse_from_rfc3339(&stamp);
        assert!(parsed.is_ok(), "not RFC 3339: {}", stamp);
    }
}
