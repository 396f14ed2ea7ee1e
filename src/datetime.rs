//! Date/time utilities for feeder.
//!
//! Timestamps are held as `DateTime<Utc>`. On disk they are written as
//! epoch seconds with millisecond precision (e.g. `"1705314600.000"`).

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::{FeederError, Result};

/// `asctime(3)` layout, e.g. `Mon Jan 15 10:30:00 2024`.
pub const ASCTIME_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

/// Render a timestamp in `asctime` layout (UTC).
pub fn format_asctime(dt: &DateTime<Utc>) -> String {
    dt.format(ASCTIME_FORMAT).to_string()
}

/// Render an optional timestamp; `None` becomes the empty string.
pub fn format_optional(dt: Option<&DateTime<Utc>>) -> String {
    dt.map(format_asctime).unwrap_or_default()
}

/// Format a DateTime<Utc> in the specified timezone.
///
/// Falls back to UTC when the timezone name is unknown.
pub fn format_in_timezone(dt: &DateTime<Utc>, timezone: &str, format: &str) -> String {
    let tz: Tz = match timezone.parse() {
        Ok(tz) => tz,
        Err(_) => return dt.format(format).to_string(),
    };
    dt.with_timezone(&tz).format(format).to_string()
}

/// Encode a timestamp as epoch seconds with exactly three decimals.
pub fn to_epoch_string(dt: &DateTime<Utc>) -> String {
    let millis = dt.timestamp_millis();
    let sign = if millis < 0 { "-" } else { "" };
    let abs = millis.unsigned_abs();
    format!("{sign}{}.{:03}", abs / 1000, abs % 1000)
}

/// Decode an epoch-seconds string written by [`to_epoch_string`].
///
/// Integer and fractional forms are both accepted.
pub fn from_epoch_string(s: &str) -> Result<DateTime<Utc>> {
    let trimmed = s.trim();
    let secs: f64 = trimmed
        .parse()
        .map_err(|_| FeederError::Parse(format!("invalid epoch timestamp: '{trimmed}'")))?;
    if !secs.is_finite() {
        return Err(FeederError::Parse(format!(
            "invalid epoch timestamp: '{trimmed}'"
        )));
    }

    let millis = (secs * 1000.0).round() as i64;
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| FeederError::Parse(format!("epoch timestamp out of range: '{trimmed}'")))
}

/// Decode an optional epoch string; blank means unset.
pub fn from_optional_epoch_string(s: &str) -> Result<Option<DateTime<Utc>>> {
    if s.trim().is_empty() {
        Ok(None)
    } else {
        from_epoch_string(s).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_asctime() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 5, 10, 30, 0).unwrap();
        assert_eq!(format_asctime(&dt), "Fri Jan  5 10:30:00 2024");
        assert_eq!(format_asctime(&dt).len(), 24);
    }

    #[test]
    fn test_format_optional() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        assert_eq!(format_optional(Some(&dt)), "Mon Jan 15 10:30:00 2024");
        assert_eq!(format_optional(None), "");
    }

    #[test]
    fn test_format_in_timezone() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        let result = format_in_timezone(&dt, "Asia/Tokyo", "%Y/%m/%d %H:%M");
        assert_eq!(result, "2024/01/15 19:30"); // UTC+9
    }

    #[test]
    fn test_format_in_timezone_invalid_timezone() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        let result = format_in_timezone(&dt, "Invalid/Zone", "%Y/%m/%d %H:%M");
        assert_eq!(result, "2024/01/15 10:30");
    }

    #[test]
    fn test_to_epoch_string() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        assert_eq!(to_epoch_string(&dt), "1705314600.000");

        let epoch = Utc.timestamp_opt(0, 0).unwrap();
        assert_eq!(to_epoch_string(&epoch), "0.000");

        let with_millis = Utc.timestamp_millis_opt(1_705_314_600_250).unwrap();
        assert_eq!(to_epoch_string(&with_millis), "1705314600.250");
    }

    #[test]
    fn test_to_epoch_string_before_epoch() {
        let dt = Utc.timestamp_millis_opt(-4_750).unwrap();
        assert_eq!(to_epoch_string(&dt), "-4.750");
        assert_eq!(from_epoch_string("-4.750").unwrap(), dt);
    }

    #[test]
    fn test_from_epoch_string() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        assert_eq!(from_epoch_string("1705314600.000").unwrap(), dt);
        assert_eq!(from_epoch_string("1705314600").unwrap(), dt);
        assert_eq!(from_epoch_string(" 1705314600.000 ").unwrap(), dt);
    }

    #[test]
    fn test_from_epoch_string_invalid() {
        assert!(matches!(
            from_epoch_string("yesterday"),
            Err(FeederError::Parse(_))
        ));
        assert!(from_epoch_string("").is_err());
        assert!(from_epoch_string("inf").is_err());
    }

    #[test]
    fn test_from_optional_epoch_string() {
        assert_eq!(from_optional_epoch_string("").unwrap(), None);
        assert_eq!(from_optional_epoch_string("   ").unwrap(), None);
        assert!(from_optional_epoch_string("0.000").unwrap().is_some());
        assert!(from_optional_epoch_string("bogus").is_err());
    }

    #[test]
    fn test_epoch_string_keeps_seconds() {
        let dt = Utc.with_ymd_and_hms(1999, 12, 31, 23, 59, 59).unwrap();
        let decoded = from_epoch_string(&to_epoch_string(&dt)).unwrap();
        assert_eq!(decoded, dt);
    }
}
