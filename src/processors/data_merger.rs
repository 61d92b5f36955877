use chrono::{NaiveDateTime, NaiveTime};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{info, warn};

use crate::error::{ProcessingError, Result};
use crate::models::{
    Cadence, CombinedRow, CombinedTable, DatasetRecord, EnrichedRecord, Reading, StationMetadata,
    StationSeries, WeatherSeries,
};

/// Joins curated series into the final datasets.
pub struct DatasetAssembler;

impl DatasetAssembler {
    pub fn new() -> Self {
        Self
    }

    /// Full outer join on timestamp. A side without a row for a timestamp
    /// contributes missing values.
    pub fn merge_weather_and_pollution(
        &self,
        pollution: &StationSeries,
        weather: &WeatherSeries,
    ) -> CombinedTable {
        let width = pollution.station_count();
        let mut rows: BTreeMap<NaiveDateTime, CombinedRow> = BTreeMap::new();

        for (i, ts) in pollution.timestamps().iter().enumerate() {
            rows.insert(
                *ts,
                CombinedRow {
                    timestamp: *ts,
                    pollution: pollution.row(i),
                    weather: None,
                },
            );
        }

        for record in weather.records() {
            rows.entry(record.timestamp)
                .or_insert_with(|| CombinedRow {
                    timestamp: record.timestamp,
                    pollution: vec![None; width],
                    weather: None,
                })
                .weather = Some(record.clone());
        }

        let table = CombinedTable {
            pollution_columns: pollution.stations().to_vec(),
            rows: rows.into_values().collect(),
        };

        info!(
            "Combined {} pollution and {} weather rows into {} ({} with both)",
            pollution.len(),
            weather.len(),
            table.len(),
            table.rows_with_both()
        );

        table
    }

    /// Long-form readings from an hourly and a daily series of the same
    /// parameter. A station code present in the hourly series is dropped
    /// from the daily one entirely; daily values are stamped at midnight.
    pub fn merge_multi_cadence_stations(
        &self,
        hourly: &StationSeries,
        daily: &StationSeries,
        parameter: &str,
    ) -> Result<Vec<Reading>> {
        if hourly.cadence() != Cadence::Hourly || daily.cadence() != Cadence::Daily {
            return Err(ProcessingError::DataMerge(format!(
                "expected hourly and daily series, got {} and {}",
                hourly.cadence(),
                daily.cadence()
            )));
        }

        let hourly_codes: HashSet<&str> = hourly.stations().iter().map(String::as_str).collect();
        let daily_keep: Vec<usize> = daily
            .stations()
            .iter()
            .enumerate()
            .filter(|(_, code)| !hourly_codes.contains(code.as_str()))
            .map(|(i, _)| i)
            .collect();

        let shadowed = daily.station_count() - daily_keep.len();
        if shadowed > 0 {
            info!(
                "{} daily station(s) also reported hourly; keeping the hourly series",
                shadowed
            );
        }

        let daily = daily.select(&daily_keep);
        let mut readings = self.melt_readings(hourly, parameter, |ts| ts);
        readings.extend(self.melt_readings(&daily, parameter, |ts| {
            ts.date().and_time(NaiveTime::MIN)
        }));

        Ok(readings)
    }

    fn melt_readings<F>(&self, series: &StationSeries, parameter: &str, stamp: F) -> Vec<Reading>
    where
        F: Fn(NaiveDateTime) -> NaiveDateTime,
    {
        let mut readings = Vec::with_capacity(series.len() * series.station_count());
        for (station, column) in series.stations().iter().zip(series.columns()) {
            for (ts, value) in series.timestamps().iter().zip(column) {
                readings.push(Reading {
                    timestamp: stamp(*ts),
                    station_code: station.clone(),
                    parameter: parameter.to_string(),
                    cadence: series.cadence(),
                    value: *value,
                });
            }
        }
        readings
    }

    /// Melt the raw and cleaned series into one row per (timestamp, station).
    /// Both must share the same index and stations.
    pub fn melt_raw_and_filled(
        &self,
        raw: &StationSeries,
        filled: &StationSeries,
    ) -> Result<Vec<DatasetRecord>> {
        if raw.timestamps() != filled.timestamps() {
            return Err(ProcessingError::DataMerge(
                "raw and filled series have different timestamps".to_string(),
            ));
        }
        if raw.stations() != filled.stations() {
            return Err(ProcessingError::DataMerge(
                "raw and filled series have different stations".to_string(),
            ));
        }

        let mut records = Vec::with_capacity(raw.len() * raw.station_count());
        for (i, station) in raw.stations().iter().enumerate() {
            let raw_column = &raw.columns()[i];
            let filled_column = &filled.columns()[i];
            for (row, ts) in raw.timestamps().iter().enumerate() {
                records.push(DatasetRecord {
                    timestamp: *ts,
                    station_code: station.clone(),
                    raw_value: raw_column[row],
                    filled_value: filled_column[row],
                });
            }
        }

        Ok(records)
    }

    /// Inner join on station code. Rows of stations without metadata are
    /// dropped; the number of such stations is logged.
    pub fn merge_station_metadata(
        &self,
        data: &[DatasetRecord],
        metadata: &[StationMetadata],
    ) -> Vec<EnrichedRecord> {
        let by_code: HashMap<&str, &StationMetadata> = metadata
            .iter()
            .map(|m| (m.station_code.as_str(), m))
            .collect();

        let mut unmatched: HashSet<&str> = HashSet::new();
        let enriched: Vec<EnrichedRecord> = data
            .iter()
            .filter_map(|record| match by_code.get(record.station_code.as_str()) {
                Some(station) => Some(EnrichedRecord {
                    timestamp: record.timestamp,
                    station_code: record.station_code.clone(),
                    raw_value: record.raw_value,
                    filled_value: record.filled_value,
                    station_name: station.station_name.clone(),
                    latitude: station.latitude,
                    longitude: station.longitude,
                }),
                None => {
                    unmatched.insert(record.station_code.as_str());
                    None
                }
            })
            .collect();

        if !unmatched.is_empty() {
            let mut codes: Vec<&str> = unmatched.into_iter().collect();
            codes.sort_unstable();
            warn!(
                "Dropped {} station(s) without metadata: {}",
                codes.len(),
                codes.join(", ")
            );
        }

        enriched
    }
}

impl Default for DatasetAssembler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WeatherRecord;
    use chrono::{Duration, NaiveDate};

    fn at(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 1, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn hourly(stations: &[&str], start: NaiveDateTime, columns: Vec<Vec<Option<f64>>>) -> StationSeries {
        let n = columns[0].len();
        StationSeries::new(
            Cadence::Hourly,
            (0..n).map(|i| start + Duration::hours(i as i64)).collect(),
            stations.iter().map(|s| s.to_string()).collect(),
            columns,
        )
        .unwrap()
    }

    #[test]
    fn test_merge_weather_and_pollution_outer_join() {
        let pollution = hourly(&["Mean value"], at(1, 1), vec![vec![Some(10.0), Some(12.0)]]);
        let weather = WeatherSeries::new(vec![
            WeatherRecord {
                temperature_c: Some(3),
                ..WeatherRecord::empty(at(1, 2))
            },
            WeatherRecord::empty(at(1, 3)),
        ])
        .unwrap();

        let table = DatasetAssembler::new().merge_weather_and_pollution(&pollution, &weather);

        assert_eq!(table.len(), 3);
        assert_eq!(table.pollution_columns, vec!["Mean value".to_string()]);
        assert_eq!(table.rows[0].timestamp, at(1, 1));
        assert!(table.rows[0].weather.is_none());
        assert_eq!(table.rows[1].pollution, vec![Some(12.0)]);
        assert_eq!(table.rows[1].weather.as_ref().unwrap().temperature_c, Some(3));
        assert_eq!(table.rows[2].pollution, vec![None]);
        assert_eq!(table.rows_with_both(), 1);
    }

    #[test]
    fn test_multi_cadence_prefers_hourly_station() {
        let hourly_series = hourly(&["S1"], at(1, 0), vec![vec![Some(1.0), Some(2.0), Some(3.0)]]);
        let daily_series = StationSeries::new(
            Cadence::Daily,
            vec![at(1, 0), at(2, 0)],
            vec!["S1".to_string(), "S2".to_string()],
            vec![vec![Some(50.0), Some(60.0)], vec![Some(7.0), None]],
        )
        .unwrap();

        let readings = DatasetAssembler::new()
            .merge_multi_cadence_stations(&hourly_series, &daily_series, "PM10")
            .unwrap();

        let s1: Vec<&Reading> = readings.iter().filter(|r| r.station_code == "S1").collect();
        assert_eq!(s1.len(), 3);
        assert!(s1.iter().all(|r| r.cadence == Cadence::Hourly));

        let s2: Vec<&Reading> = readings.iter().filter(|r| r.station_code == "S2").collect();
        assert_eq!(s2.len(), 2);
        assert_eq!(s2[0].timestamp, at(1, 0));
        assert_eq!(s2[1].value, None);
        assert!(readings.iter().all(|r| r.parameter == "PM10"));
    }

    #[test]
    fn test_multi_cadence_rejects_swapped_inputs() {
        let hourly_series = hourly(&["S1"], at(1, 0), vec![vec![Some(1.0)]]);
        assert!(DatasetAssembler::new()
            .merge_multi_cadence_stations(&hourly_series, &hourly_series, "PM10")
            .is_err());
    }

    #[test]
    fn test_melt_raw_and_filled() {
        let raw = hourly(
            &["A", "B"],
            at(1, 1),
            vec![vec![Some(1.0), None], vec![None, Some(4.0)]],
        );
        let filled = hourly(
            &["A", "B"],
            at(1, 1),
            vec![vec![Some(1.0), Some(1.5)], vec![None, Some(4.0)]],
        );

        let records = DatasetAssembler::new().melt_raw_and_filled(&raw, &filled).unwrap();

        assert_eq!(records.len(), 4);
        assert_eq!(records[1].station_code, "A");
        assert_eq!(records[1].raw_value, None);
        assert_eq!(records[1].filled_value, Some(1.5));
        assert_eq!(records[2].station_code, "B");
    }

    #[test]
    fn test_merge_station_metadata_inner_join() {
        let data = vec![
            DatasetRecord {
                timestamp: at(1, 1),
                station_code: "A".to_string(),
                raw_value: Some(1.0),
                filled_value: Some(1.0),
            },
            DatasetRecord {
                timestamp: at(1, 1),
                station_code: "B".to_string(),
                raw_value: Some(2.0),
                filled_value: Some(2.0),
            },
        ];
        let metadata = vec![StationMetadata::new(
            "A".to_string(),
            "Station A".to_string(),
            51.1,
            17.0,
        )];

        let enriched = DatasetAssembler::new().merge_station_metadata(&data, &metadata);

        assert_eq!(enriched.len(), 1);
        assert_eq!(enriched[0].station_name, "Station A");
        assert_eq!(enriched[0].latitude, 51.1);
    }
}
