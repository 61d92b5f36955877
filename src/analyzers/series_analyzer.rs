use crate::error::{ProcessingError, Result};
use crate::models::{Cadence, StationSeries};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

/// One station on one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyStatistics {
    pub date: NaiveDate,
    pub station: String,
    pub max: Option<f64>,
    pub median: Option<f64>,
    /// Share of the day's slots without a reading, in [0, 1]
    pub missing_share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationStatistics {
    pub station: String,
    pub readings: usize,
    pub missing: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
}

impl StationStatistics {
    pub fn missing_percentage(&self) -> f64 {
        let total = self.readings + self.missing;
        if total == 0 {
            return 0.0;
        }
        (self.missing as f64 / total as f64) * 100.0
    }
}

#[derive(Debug, Clone)]
pub struct SeriesStatistics {
    pub cadence: Cadence,
    pub rows: usize,
    pub time_range: (NaiveDateTime, NaiveDateTime),
    pub stations: Vec<StationStatistics>,
    pub daily: Vec<DailyStatistics>,
}

pub struct SeriesAnalyzer;

impl SeriesAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(&self, series: &StationSeries) -> Result<SeriesStatistics> {
        let (Some(first), Some(last)) = (series.timestamps().first(), series.timestamps().last())
        else {
            return Err(ProcessingError::InvalidSeries(
                "No rows to analyze".to_string(),
            ));
        };

        let stations = series
            .stations()
            .iter()
            .zip(series.columns())
            .map(|(station, column)| station_statistics(station, column))
            .collect();

        Ok(SeriesStatistics {
            cadence: series.cadence(),
            rows: series.len(),
            time_range: (*first, *last),
            stations,
            daily: self.daily_statistics(series),
        })
    }

    /// Per-day max, median and missing share of every station, ordered by
    /// day then station.
    pub fn daily_statistics(&self, series: &StationSeries) -> Vec<DailyStatistics> {
        let timestamps = series.timestamps();
        let mut daily = Vec::new();
        let mut start = 0;

        while start < timestamps.len() {
            let date = timestamps[start].date();
            let end = timestamps[start..]
                .iter()
                .position(|ts| ts.date() != date)
                .map_or(timestamps.len(), |offset| start + offset);

            for (station, column) in series.stations().iter().zip(series.columns()) {
                let slots = &column[start..end];
                let mut values: Vec<f64> = slots.iter().flatten().copied().collect();
                values.sort_by(f64::total_cmp);

                daily.push(DailyStatistics {
                    date,
                    station: station.clone(),
                    max: values.last().copied(),
                    median: median_of_sorted(&values),
                    missing_share: (slots.len() - values.len()) as f64 / slots.len() as f64,
                });
            }

            start = end;
        }

        daily
    }
}

impl Default for SeriesAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

fn station_statistics(station: &str, column: &[Option<f64>]) -> StationStatistics {
    let values: Vec<f64> = column.iter().flatten().copied().collect();
    let min = values.iter().copied().reduce(f64::min);
    let max = values.iter().copied().reduce(f64::max);
    let mean = (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64);

    StationStatistics {
        station: station.to_string(),
        readings: values.len(),
        missing: column.len() - values.len(),
        min,
        max,
        mean,
    }
}

fn median_of_sorted(values: &[f64]) -> Option<f64> {
    let n = values.len();
    match n {
        0 => None,
        _ if n % 2 == 1 => Some(values[n / 2]),
        _ => Some((values[n / 2 - 1] + values[n / 2]) / 2.0),
    }
}

fn format_value(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.1}", v))
}

impl SeriesStatistics {
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "Cadence: {}\n\
            Time Range: {} to {} ({} rows)\n\
            Stations: {}\n",
            self.cadence,
            self.time_range.0,
            self.time_range.1,
            self.rows,
            self.stations.len()
        );

        for station in &self.stations {
            summary.push_str(&format!(
                "- {}: {} readings, {:.1}% missing, min {}, max {}, mean {}\n",
                station.station,
                station.readings,
                station.missing_percentage(),
                format_value(station.min),
                format_value(station.max),
                format_value(station.mean)
            ));
        }

        summary
    }

    pub fn detailed_summary(&self) -> String {
        let mut summary = self.summary();
        summary.push_str("\nDaily statistics (max / median / missing):\n");

        for day in &self.daily {
            summary.push_str(&format!(
                "{} {}: {} / {} / {:.0}%\n",
                day.date,
                day.station,
                format_value(day.max),
                format_value(day.median),
                day.missing_share * 100.0
            ));
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn series() -> StationSeries {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(22, 0, 0)
            .unwrap();
        StationSeries::new(
            Cadence::Hourly,
            (0..4).map(|i| start + Duration::hours(i)).collect(),
            vec!["A".to_string(), "B".to_string()],
            vec![
                vec![Some(3.0), Some(1.0), Some(5.0), None],
                vec![None, None, Some(2.0), Some(4.0)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_daily_statistics() {
        let daily = SeriesAnalyzer::new().daily_statistics(&series());

        assert_eq!(daily.len(), 4);
        assert_eq!(daily[0].station, "A");
        assert_eq!(daily[0].max, Some(3.0));
        assert_eq!(daily[0].median, Some(2.0));
        assert_eq!(daily[0].missing_share, 0.0);
        assert_eq!(daily[1].station, "B");
        assert_eq!(daily[1].median, None);
        assert_eq!(daily[1].missing_share, 1.0);
        assert_eq!(daily[2].date, NaiveDate::from_ymd_opt(2020, 1, 2).unwrap());
        assert_eq!(daily[2].missing_share, 0.5);
        assert_eq!(daily[3].median, Some(3.0));
    }

    #[test]
    fn test_analyze() {
        let stats = SeriesAnalyzer::new().analyze(&series()).unwrap();

        assert_eq!(stats.rows, 4);
        assert_eq!(stats.stations[0].min, Some(1.0));
        assert_eq!(stats.stations[0].mean, Some(3.0));
        assert_eq!(stats.stations[1].missing_percentage(), 50.0);

        let text = stats.detailed_summary();
        assert!(text.contains("Stations: 2"));
        assert!(text.contains("2020-01-02 B: 4.0 / 3.0 / 0%"));
    }

    #[test]
    fn test_empty_series_is_rejected() {
        let empty = StationSeries::new(Cadence::Daily, vec![], vec![], vec![]).unwrap();
        assert!(SeriesAnalyzer::new().analyze(&empty).is_err());
    }
}
