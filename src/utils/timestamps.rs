use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::utils::constants::{OUTPUT_TIMESTAMP_FORMAT, RAW_TIME_FORMAT};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Parse an ISO-like timestamp. Date-only values are stamped at midnight.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

/// Combine a calendar date with a 12-hour clock reading such as "1:51 PM".
pub fn combine_date_and_clock(date: NaiveDate, clock: &str) -> Option<NaiveDateTime> {
    NaiveTime::parse_from_str(clock.trim(), RAW_TIME_FORMAT)
        .ok()
        .map(|t| date.and_time(t))
}

pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(OUTPUT_TIMESTAMP_FORMAT).to_string()
}

/// Serde adapter writing `OUTPUT_TIMESTAMP_FORMAT` and reading any format
/// `parse_timestamp` understands.
pub mod timestamp_format {
    use chrono::NaiveDateTime;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(ts: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_timestamp(ts))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        super::parse_timestamp(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{}'", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = NaiveDate::from_ymd_opt(2020, 3, 1)
            .unwrap()
            .and_hms_opt(13, 0, 0)
            .unwrap();
        assert_eq!(parse_timestamp("2020-03-01 13:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2020-03-01T13:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2020-03-01 13:00"), Some(expected));
        assert_eq!(parse_timestamp("garbage"), None);
    }

    #[test]
    fn test_date_only_is_midnight() {
        let ts = parse_timestamp("2020-03-01").unwrap();
        assert_eq!(ts.time(), NaiveTime::MIN);
    }

    #[test]
    fn test_combine_date_and_clock() {
        let date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        assert_eq!(
            combine_date_and_clock(date, "12:20 AM"),
            date.and_hms_opt(0, 20, 0)
        );
        assert_eq!(
            combine_date_and_clock(date, "1:51 PM"),
            date.and_hms_opt(13, 51, 0)
        );
        assert_eq!(combine_date_and_clock(date, "25:00"), None);
    }
}
