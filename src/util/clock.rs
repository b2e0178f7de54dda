//! Wall-clock helpers.

use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};

/// Format used for the timestamp suffix of job names (UTC, second precision).
pub const JOB_TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

/// Milliseconds since the Unix epoch.
#[must_use]
pub fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

/// Render a timestamp the way job names embed it.
#[must_use]
pub fn job_timestamp(at: DateTime<Utc>) -> String {
    at.format(JOB_TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_job_timestamp_second_precision() {
        let at = Utc.with_ymd_and_hms(2024, 3, 7, 9, 5, 1).unwrap();
        assert_eq!(job_timestamp(at), "2024-03-07-09-05-01");
    }

    #[test]
    fn test_now_ms_moves_forward() {
        let a = now_ms();
        let b = now_ms();
        assert!(b >= a);
        assert!(a > 0);
    }
}
