//! Well-known image property keys and typed accessors

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

use crate::error::{Error, Result};

/// Acquisition timestamp (RFC 3339 or `YYYY-MM-DD`), STAC naming.
pub const DATETIME: &str = "datetime";

/// Scene-level cloud percentage reported by the Sentinel-2 L2A product.
pub const CLOUDY_PIXEL_PERCENTAGE: &str = "CLOUDY_PIXEL_PERCENTAGE";

/// Number of images reduced into a composite.
pub const COMPOSITE_COUNT: &str = "composite:count";

/// Parse a property value as a number. Numeric strings are accepted since
/// some catalogues serialise every property as text.
pub fn as_f64(key: &str, value: &Value) -> Result<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .ok_or_else(|| Error::InvalidProperty {
        key: key.to_string(),
        reason: format!("expected a number, got {}", value),
    })
}

/// Parse a property value as a UTC timestamp.
///
/// Bare dates are interpreted as midnight UTC.
pub fn as_datetime(key: &str, value: &Value) -> Result<DateTime<Utc>> {
    let invalid = || Error::InvalidProperty {
        key: key.to_string(),
        reason: format!("expected an RFC 3339 timestamp or YYYY-MM-DD, got {}", value),
    };

    let text = value.as_str().ok_or_else(invalid)?;
    parse_datetime(text).ok_or_else(invalid)
}

/// Parse an RFC 3339 timestamp or a `YYYY-MM-DD` date.
pub fn parse_datetime(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use serde_json::json;

    #[test]
    fn test_numbers_and_numeric_strings() {
        assert_eq!(as_f64("k", &json!(12.5)).unwrap(), 12.5);
        assert_eq!(as_f64("k", &json!("3")).unwrap(), 3.0);
        assert!(as_f64("k", &json!([1])).is_err());
    }

    #[test]
    fn test_rfc3339_and_plain_dates() {
        let dt = as_datetime("d", &json!("2023-06-01T10:30:00+02:00")).unwrap();
        assert_eq!(dt.hour(), 8);

        let day = parse_datetime("2023-06-01").unwrap();
        assert_eq!((day.year(), day.month(), day.day()), (2023, 6, 1));

        assert!(as_datetime("d", &json!("June 1st")).is_err());
        assert!(as_datetime("d", &json!(20230601)).is_err());
    }
}
