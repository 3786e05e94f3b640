//! Relative timestamps

use chrono::{DateTime, Utc};

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;

/// Describe `timestamp` relative to `now`.
///
/// Under a minute is "just now", then whole minutes, then whole hours; a day
/// or more shows the calendar date (UTC). Timestamps slightly in the future
/// (clock skew between store and viewer) count as "just now".
pub fn format_relative_time(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - timestamp).num_seconds();

    if seconds < MINUTE {
        "just now".to_string()
    } else if seconds < HOUR {
        format!("{}m ago", seconds / MINUTE)
    } else if seconds < DAY {
        format!("{}h ago", seconds / HOUR)
    } else {
        timestamp.format("%Y-%m-%d").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rstest::rstest;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 2, 12, 0, 0).unwrap()
    }

    #[rstest]
    #[case(0, "just now")]
    #[case(59, "just now")]
    #[case(60, "1m ago")]
    #[case(119, "1m ago")]
    #[case(3599, "59m ago")]
    #[case(3600, "1h ago")]
    #[case(86399, "23h ago")]
    #[case(86400, "2024-05-01")]
    #[case(10 * 86400, "2024-04-22")]
    fn test_buckets(#[case] delta: i64, #[case] expected: &str) {
        let ts = now() - Duration::seconds(delta);
        assert_eq!(format_relative_time(ts, now()), expected);
    }

    #[test]
    fn test_subsecond_remainders_round_down() {
        let ts = now() - Duration::milliseconds(59_999);
        assert_eq!(format_relative_time(ts, now()), "just now");
    }

    #[test]
    fn test_future_timestamp_is_just_now() {
        let ts = now() + Duration::seconds(30);
        assert_eq!(format_relative_time(ts, now()), "just now");
    }
}
