//! Millisecond-precision RFC3339 formatting, used for every `Text`-typed
//! timestamp column so that string comparison (`last_seen_at < threshold`)
//! agrees with chronological order.

use chrono::{DateTime, SecondsFormat, Utc};

pub fn to_rfc3339_millis(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn formats_with_fixed_millisecond_width() {
        let dt = Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap();
        assert_eq!(to_rfc3339_millis(dt), "2026-08-01T12:00:00.000Z");
    }

    #[test]
    fn lexical_order_matches_chronological_order() {
        let a = Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap();
        let b = a + Duration::milliseconds(1);
        assert!(to_rfc3339_millis(a) < to_rfc3339_millis(b));
    }
}
