use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

use crate::error::{ParseIssue, ProcessingError, Result};
use crate::models::{DateRange, Observation, RawObservation, WeatherRecord, WeatherSeries};
use crate::utils::conditions::{canonicalize_condition, cloudiness_level, precipitation_level};
use crate::utils::constants::DEFAULT_ALIGNMENT_OFFSET_HOURS;
use crate::utils::progress::ProgressReporter;
use crate::utils::timestamps::combine_date_and_clock;
use crate::utils::units::{fahrenheit_to_celsius, inhg_to_hpa, mph_to_kph};

/// Where the raw per-day dumps come from.
pub trait DailyWeatherSource {
    /// Name used in reports for the given day's input
    fn source_name(&self, date: NaiveDate) -> String;

    /// Every row of the day's dump. An error means the whole day is unusable.
    fn read_day(&self, date: NaiveDate) -> Result<Vec<RawObservation>>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WeatherCurationReport {
    pub days_requested: usize,
    pub days_read: usize,
    pub skipped_days: Vec<ParseIssue>,
    pub row_issues: Vec<ParseIssue>,
    pub empty_rows_dropped: usize,
    pub observations: usize,
    pub out_of_range: usize,
    pub trimmed_records: usize,
    pub hourly_records: usize,
    pub empty_hours: usize,
}

impl WeatherCurationReport {
    pub fn summary(&self) -> String {
        let mut summary = String::new();

        summary.push_str("=== Weather Curation Report ===\n");
        summary.push_str(&format!(
            "Days: {} read out of {} requested\n",
            self.days_read, self.days_requested
        ));
        summary.push_str(&format!(
            "Observations: {} parsed, {} empty rows dropped, {} outside the range\n",
            self.observations, self.empty_rows_dropped, self.out_of_range
        ));
        summary.push_str(&format!(
            "Hourly records: {} ({} without observations, {} trimmed at the start)\n",
            self.hourly_records, self.empty_hours, self.trimmed_records
        ));

        if !self.skipped_days.is_empty() {
            summary.push_str(&format!("\nSkipped days: {}\n", self.skipped_days.len()));
            for issue in &self.skipped_days {
                summary.push_str(&format!("  {}\n", issue));
            }
        }

        if !self.row_issues.is_empty() {
            summary.push_str(&format!("\nSkipped rows: {}\n", self.row_issues.len()));
            for (i, issue) in self.row_issues.iter().take(10).enumerate() {
                summary.push_str(&format!("  {}. {}\n", i + 1, issue));
            }
        }

        summary
    }
}

fn number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"-?\d+(?:\.\d+)?").expect("valid number pattern"))
}

/// Leading number embedded in free text such as "39 °F" or "29.92 in".
/// Blank text is a missing value, text without a number is an error.
fn extract_number(text: Option<&str>) -> std::result::Result<Option<f64>, String> {
    let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok(None);
    };
    number_pattern()
        .find(text)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .map(Some)
        .ok_or_else(|| format!("no number in '{}'", text))
}

/// Integer precision of the curated columns, truncated toward zero.
fn to_whole(value: f64) -> i32 {
    value.trunc() as i32
}

/// Builds the hourly weather series from per-day raw dumps.
pub struct WeatherCurator {
    alignment_offset: Duration,
}

impl WeatherCurator {
    pub fn new() -> Self {
        Self {
            alignment_offset: Duration::hours(DEFAULT_ALIGNMENT_OFFSET_HOURS),
        }
    }

    /// Hourly records earlier than `range start + offset` are trimmed. One
    /// hour drops the midnight opening the range; zero keeps it.
    pub fn with_alignment_offset(offset: Duration) -> Result<Self> {
        if offset < Duration::zero() {
            return Err(ProcessingError::Config(format!(
                "alignment offset must not be negative, got {}",
                offset
            )));
        }
        Ok(Self {
            alignment_offset: offset,
        })
    }

    pub fn build_hourly_series<S: DailyWeatherSource>(
        &self,
        source: &S,
        range: &DateRange,
        progress: Option<&ProgressReporter>,
    ) -> Result<(WeatherSeries, WeatherCurationReport)> {
        let mut report = WeatherCurationReport {
            days_requested: range.day_count(),
            ..Default::default()
        };
        let mut observations = Vec::new();

        for date in range.days() {
            let source_name = source.source_name(date);

            match source.read_day(date) {
                Ok(rows) => {
                    report.days_read += 1;
                    self.parse_day(date, &source_name, &rows, &mut observations, &mut report);
                }
                Err(err) => {
                    warn!("Skipping {}: {}", source_name, err);
                    let mut issue = ParseIssue::from(err);
                    issue.source_name = source_name;
                    report.skipped_days.push(issue);
                }
            }

            if let Some(p) = progress {
                p.increment(1);
            }
        }

        report.observations = observations.len();
        observations.sort_by_key(|o| o.timestamp);

        let (records, out_of_range) = self.resample_hourly(&observations, range);
        report.out_of_range = out_of_range;

        let series_start = range.first_instant() + self.alignment_offset;
        let before = records.len();
        let records: Vec<WeatherRecord> = records
            .into_iter()
            .filter(|r| r.timestamp >= series_start)
            .collect();
        report.trimmed_records = before - records.len();

        let series = WeatherSeries::new(records)?;
        report.hourly_records = series.len();
        report.empty_hours = series.empty_hours();

        info!(
            "Curated {} hourly weather records from {} of {} days ({} hours without observations)",
            report.hourly_records, report.days_read, report.days_requested, report.empty_hours
        );

        Ok((series, report))
    }

    fn parse_day(
        &self,
        date: NaiveDate,
        source_name: &str,
        rows: &[RawObservation],
        observations: &mut Vec<Observation>,
        report: &mut WeatherCurationReport,
    ) {
        for raw in rows {
            if raw.is_empty() {
                report.empty_rows_dropped += 1;
                continue;
            }

            match self.parse_observation(date, source_name, raw) {
                Ok(observation) => observations.push(observation),
                Err(err) => {
                    warn!("{}", err);
                    report.row_issues.push(ParseIssue::from(err));
                }
            }
        }
    }

    /// Timestamp from the day plus the 12-hour clock field, numbers pulled
    /// out of the free text and converted to metric.
    pub fn parse_observation(
        &self,
        date: NaiveDate,
        source_name: &str,
        raw: &RawObservation,
    ) -> Result<Observation> {
        let fail = |message: String| ProcessingError::parse(source_name, Some(raw.row), message);
        if let Some(reason) = &raw.unreadable {
            return Err(fail(format!("unreadable row: {}", reason)));
        }

        let clock = raw
            .time
            .as_deref()
            .ok_or_else(|| fail("missing time of day".to_string()))?;
        let timestamp = combine_date_and_clock(date, clock)
            .ok_or_else(|| fail(format!("invalid time of day '{}'", clock)))?;

        let temperature_f = extract_number(raw.temperature.as_deref())
            .map_err(|e| fail(format!("temperature: {}", e)))?;
        let wind_mph = extract_number(raw.wind_speed.as_deref())
            .map_err(|e| fail(format!("wind speed: {}", e)))?;
        let pressure_inhg = extract_number(raw.pressure.as_deref())
            .map_err(|e| fail(format!("pressure: {}", e)))?;

        Ok(Observation {
            timestamp,
            temperature_c: temperature_f.map(|f| to_whole(fahrenheit_to_celsius(f))),
            wind_speed_kph: wind_mph.map(|mph| to_whole(mph_to_kph(mph))),
            pressure_hpa: pressure_inhg.map(|inhg| to_whole(inhg_to_hpa(inhg))),
            condition: raw
                .condition
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string),
        })
    }

    /// One record per hour of the range. Each field takes the first
    /// non-missing value observed within its hour; hours without any
    /// observation yield an empty record. `observations` must be sorted.
    pub fn resample_hourly(
        &self,
        observations: &[Observation],
        range: &DateRange,
    ) -> (Vec<WeatherRecord>, usize) {
        let first = range.first_instant();
        let last = range.last_hour();

        let mut buckets: BTreeMap<NaiveDateTime, HourBucket> = BTreeMap::new();
        let mut out_of_range = 0;

        for observation in observations {
            let hour = floor_to_hour(observation.timestamp);
            if hour < first || hour > last {
                out_of_range += 1;
                continue;
            }
            buckets.entry(hour).or_default().absorb(observation);
        }

        if out_of_range > 0 {
            debug!("{} observations fall outside {} - {}", out_of_range, first, last);
        }

        let mut records = Vec::with_capacity(range.day_count() * 24);
        let mut hour = first;
        while hour <= last {
            let record = match buckets.remove(&hour) {
                Some(bucket) => bucket.into_record(hour),
                None => WeatherRecord::empty(hour),
            };
            records.push(record);
            hour += Duration::hours(1);
        }

        (records, out_of_range)
    }
}

impl Default for WeatherCurator {
    fn default() -> Self {
        Self::new()
    }
}

fn floor_to_hour(ts: NaiveDateTime) -> NaiveDateTime {
    ts.date()
        .and_hms_opt(ts.hour(), 0, 0)
        .unwrap_or(ts)
}

#[derive(Default)]
struct HourBucket {
    temperature_c: Option<i32>,
    wind_speed_kph: Option<i32>,
    pressure_hpa: Option<i32>,
    condition: Option<String>,
}

impl HourBucket {
    fn absorb(&mut self, observation: &Observation) {
        self.temperature_c = self.temperature_c.or(observation.temperature_c);
        self.wind_speed_kph = self.wind_speed_kph.or(observation.wind_speed_kph);
        self.pressure_hpa = self.pressure_hpa.or(observation.pressure_hpa);
        if self.condition.is_none() {
            self.condition = observation.condition.clone();
        }
    }

    fn into_record(self, timestamp: NaiveDateTime) -> WeatherRecord {
        let condition = self.condition.as_deref().map(canonicalize_condition);
        WeatherRecord {
            timestamp,
            temperature_c: self.temperature_c,
            wind_speed_kph: self.wind_speed_kph,
            pressure_hpa: self.pressure_hpa,
            cloudiness: condition.map(cloudiness_level),
            precipitation: condition.map(precipitation_level),
        }
    }
}
