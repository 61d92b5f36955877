use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{ProcessingError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CloudinessLevel {
    #[serde(rename = "Fair")]
    Fair,
    #[serde(rename = "Partly Cloudy")]
    PartlyCloudy,
    #[serde(rename = "Cloudy")]
    Cloudy,
    #[serde(rename = "Fog")]
    Fog,
    #[serde(rename = "unknown")]
    Unknown,
}

impl CloudinessLevel {
    pub fn label(&self) -> &'static str {
        match self {
            CloudinessLevel::Fair => "Fair",
            CloudinessLevel::PartlyCloudy => "Partly Cloudy",
            CloudinessLevel::Cloudy => "Cloudy",
            CloudinessLevel::Fog => "Fog",
            CloudinessLevel::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Fair" => Some(CloudinessLevel::Fair),
            "Partly Cloudy" => Some(CloudinessLevel::PartlyCloudy),
            "Cloudy" => Some(CloudinessLevel::Cloudy),
            "Fog" => Some(CloudinessLevel::Fog),
            "unknown" => Some(CloudinessLevel::Unknown),
            _ => None,
        }
    }
}

/// Ordinal precipitation intensity. `Absent` is written as `None` in
/// curated files, matching the feed's own vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrecipitationLevel {
    #[serde(rename = "None")]
    Absent,
    #[serde(rename = "Light")]
    Light,
    #[serde(rename = "Heavy")]
    Heavy,
    #[serde(rename = "unknown")]
    Unknown,
}

impl PrecipitationLevel {
    pub fn label(&self) -> &'static str {
        match self {
            PrecipitationLevel::Absent => "None",
            PrecipitationLevel::Light => "Light",
            PrecipitationLevel::Heavy => "Heavy",
            PrecipitationLevel::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "None" => Some(PrecipitationLevel::Absent),
            "Light" => Some(PrecipitationLevel::Light),
            "Heavy" => Some(PrecipitationLevel::Heavy),
            "unknown" => Some(PrecipitationLevel::Unknown),
            _ => None,
        }
    }
}

impl std::fmt::Display for CloudinessLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::fmt::Display for PrecipitationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(ProcessingError::Config(format!(
                "date range start {} is after its end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        self.start.iter_days().take(self.day_count())
    }

    pub fn day_count(&self) -> usize {
        (self.end - self.start).num_days() as usize + 1
    }

    /// Midnight opening the first day
    pub fn first_instant(&self) -> NaiveDateTime {
        self.start.and_time(NaiveTime::MIN)
    }

    /// 23:00 on the last day, the final hourly bucket of the range
    pub fn last_hour(&self) -> NaiveDateTime {
        self.end.and_time(NaiveTime::MIN) + chrono::Duration::hours(23)
    }
}

/// One raw row of a daily weather dump, all fields still free text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawObservation {
    /// 1-based data row within the source file
    pub row: usize,
    pub time: Option<String>,
    pub temperature: Option<String>,
    pub wind_speed: Option<String>,
    pub condition: Option<String>,
    pub pressure: Option<String>,
    /// Set when the row could not be split into fields at all
    pub unreadable: Option<String>,
}

impl RawObservation {
    pub fn unreadable(row: usize, reason: impl Into<String>) -> Self {
        Self {
            row,
            unreadable: Some(reason.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.unreadable.is_none()
            && self.time.is_none()
            && self.temperature.is_none()
            && self.wind_speed.is_none()
            && self.condition.is_none()
            && self.pressure.is_none()
    }
}

/// A parsed, unit-converted sub-hourly observation.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub timestamp: NaiveDateTime,
    pub temperature_c: Option<i32>,
    pub wind_speed_kph: Option<i32>,
    pub pressure_hpa: Option<i32>,
    pub condition: Option<String>,
}

/// Curated hourly weather. Fields are `None` for hours without any
/// observation; the categorical levels are `Some(Unknown)` when an
/// observation exists but its condition text is not recognised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    #[serde(rename = "Time", with = "crate::utils::timestamp_format")]
    pub timestamp: NaiveDateTime,

    #[serde(rename = "Temperature C")]
    pub temperature_c: Option<i32>,

    #[serde(rename = "Wind Speed kph")]
    pub wind_speed_kph: Option<i32>,

    #[serde(rename = "Pressure hPa")]
    pub pressure_hpa: Option<i32>,

    #[serde(rename = "Cloudiness Level")]
    pub cloudiness: Option<CloudinessLevel>,

    #[serde(rename = "Precipitation Level")]
    pub precipitation: Option<PrecipitationLevel>,
}

impl WeatherRecord {
    pub fn empty(timestamp: NaiveDateTime) -> Self {
        Self {
            timestamp,
            temperature_c: None,
            wind_speed_kph: None,
            pressure_hpa: None,
            cloudiness: None,
            precipitation: None,
        }
    }

    pub fn has_observation(&self) -> bool {
        self.temperature_c.is_some()
            || self.wind_speed_kph.is_some()
            || self.pressure_hpa.is_some()
            || self.cloudiness.is_some()
    }
}

/// Exactly one `WeatherRecord` per consecutive hour.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeatherSeries {
    records: Vec<WeatherRecord>,
}

impl WeatherSeries {
    pub fn new(records: Vec<WeatherRecord>) -> Result<Self> {
        for window in records.windows(2) {
            if window[1].timestamp - window[0].timestamp != chrono::Duration::hours(1) {
                return Err(ProcessingError::InvalidSeries(format!(
                    "weather records {} and {} are not one hour apart",
                    window[0].timestamp, window[1].timestamp
                )));
            }
        }
        Ok(Self { records })
    }

    pub fn records(&self) -> &[WeatherRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<WeatherRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn first_timestamp(&self) -> Option<NaiveDateTime> {
        self.records.first().map(|r| r.timestamp)
    }

    pub fn last_timestamp(&self) -> Option<NaiveDateTime> {
        self.records.last().map(|r| r.timestamp)
    }

    pub fn empty_hours(&self) -> usize {
        self.records.iter().filter(|r| !r.has_observation()).count()
    }
}
