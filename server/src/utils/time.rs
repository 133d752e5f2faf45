//! Time utility functions

use chrono::{DateTime, Utc};

/// Convert microseconds since Unix epoch to DateTime<Utc>
pub fn micros_to_datetime(micros: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(micros).unwrap_or_else(|| {
        tracing::warn!(micros, "Invalid timestamp, using epoch");
        DateTime::UNIX_EPOCH
    })
}

/// Current time as microseconds since Unix epoch
pub fn now_micros() -> i64 {
    Utc::now().timestamp_micros()
}

/// Current time as whole seconds since Unix epoch
pub fn now_secs() -> u64 {
    u64::try_from(Utc::now().timestamp()).unwrap_or_else(|_| {
        tracing::error!("System clock is before UNIX epoch");
        0
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_micros_roundtrip() {
        let dt = micros_to_datetime(1_700_000_000_123_456);
        assert_eq!(dt.timestamp_micros(), 1_700_000_000_123_456);
    }

    #[test]
    fn test_now_helpers_agree() {
        let secs = now_secs() as i64;
        let micros = now_micros();
        assert!((micros / 1_000_000 - secs).abs() <= 1);
    }
}
