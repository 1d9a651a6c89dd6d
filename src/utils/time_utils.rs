use chrono::{DateTime, NaiveDate, Utc};

pub struct TimeUtils;

impl TimeUtils {
    pub const MS_IN_S: i64 = 1000;
    pub const MS_IN_MIN: i64 = Self::MS_IN_S * 60;
    pub const MS_IN_H: i64 = Self::MS_IN_MIN * 60;
    pub const MS_IN_D: i64 = Self::MS_IN_H * 24;
    pub const MS_IN_W: i64 = Self::MS_IN_D * 7;
    pub const STANDARD_DATE_FORMAT: &str = "%Y-%m-%d";
}

/// Current wall-clock time as epoch milliseconds.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Convert epoch milliseconds to a `YYYY-MM-DD` string (UTC).
/// Used for macro-series providers that take calendar-date query params,
/// and for display.
pub fn epoch_ms_to_date_string(epoch_ms: i64) -> String {
    match DateTime::from_timestamp_millis(epoch_ms) {
        Some(dt) => dt.format(TimeUtils::STANDARD_DATE_FORMAT).to_string(),
        // Out-of-range timestamps only come from corrupt upstream data
        None => String::new(),
    }
}

/// Parse a `YYYY-MM-DD` string into epoch milliseconds at UTC midnight.
pub fn date_string_to_epoch_ms(date: &str) -> Option<i64> {
    let parsed = NaiveDate::parse_from_str(date.trim(), TimeUtils::STANDARD_DATE_FORMAT).ok()?;
    let midnight = parsed.and_hms_opt(0, 0, 0)?;
    Some(midnight.and_utc().timestamp_millis())
}

/// Truncate epoch milliseconds to the UTC midnight of its calendar day.
pub fn floor_to_utc_day(epoch_ms: i64) -> i64 {
    // Euclidean so pre-1970 timestamps still land on their own day boundary
    epoch_ms - epoch_ms.rem_euclid(TimeUtils::MS_IN_D)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_string_round_trip() {
        let ms = date_string_to_epoch_ms("2024-11-05").unwrap();
        assert_eq!(epoch_ms_to_date_string(ms), "2024-11-05");
        assert_eq!(ms % TimeUtils::MS_IN_D, 0);
    }

    #[test]
    fn bad_date_string_is_none() {
        assert!(date_string_to_epoch_ms("05/11/2024").is_none());
        assert!(date_string_to_epoch_ms("").is_none());
    }

    #[test]
    fn floor_to_day_truncates_intraday_time() {
        let noon = date_string_to_epoch_ms("2024-11-05").unwrap() + TimeUtils::MS_IN_H * 12;
        assert_eq!(
            floor_to_utc_day(noon),
            date_string_to_epoch_ms("2024-11-05").unwrap()
        );
    }
}
