use serde::Serialize;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;
use tracing::info;

use crate::error::Result;
use crate::models::{
    CombinedTable, DatasetRecord, EnrichedRecord, Reading, StationSeries, WeatherRecord,
    WeatherSeries,
};
use crate::readers::text::decode_text;
use crate::utils::constants::{COL_TIME, DEFAULT_BUFFER_SIZE};
use crate::utils::timestamps::format_timestamp;

const WEATHER_COLUMNS: [&str; 5] = [
    "Temperature C",
    "Wind Speed kph",
    "Pressure hPa",
    "Cloudiness Level",
    "Precipitation Level",
];

pub struct CsvWriter {
    delimiter: u8,
}

impl CsvWriter {
    pub fn new() -> Self {
        Self { delimiter: b',' }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Melted dataset: timestamp, station_code, raw_value, filled_value
    pub fn write_dataset(&self, records: &[DatasetRecord], path: &Path) -> Result<()> {
        self.write_rows(records, path)
    }

    /// Dataset joined with station_name, latitude, longitude
    pub fn write_enriched(&self, records: &[EnrichedRecord], path: &Path) -> Result<()> {
        self.write_rows(records, path)
    }

    pub fn write_readings(&self, readings: &[Reading], path: &Path) -> Result<()> {
        self.write_rows(readings, path)
    }

    pub fn write_weather(&self, series: &WeatherSeries, path: &Path) -> Result<()> {
        self.write_rows(series.records(), path)
    }

    /// Read a curated weather file back. The hourly invariant is checked again.
    pub fn read_weather(&self, path: &Path) -> Result<WeatherSeries> {
        let bytes = fs::read(path)?;
        let text = decode_text(&bytes);
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let records = reader
            .deserialize::<WeatherRecord>()
            .collect::<std::result::Result<Vec<_>, _>>()?;

        WeatherSeries::new(records)
    }

    /// Wide layout: Time followed by one column per station.
    pub fn write_series(&self, series: &StationSeries, path: &Path) -> Result<()> {
        let mut writer = self.create(path)?;

        let mut header = vec![COL_TIME.to_string()];
        header.extend(series.stations().iter().cloned());
        writer.write_record(&header)?;

        for (i, ts) in series.timestamps().iter().enumerate() {
            let mut row = vec![format_timestamp(ts)];
            row.extend(series.columns().iter().map(|column| optional(column[i])));
            writer.write_record(&row)?;
        }

        writer.flush()?;
        info!("Wrote {} rows to {}", series.len(), path.display());
        Ok(())
    }

    /// Time, the pollution columns, then the curated weather columns.
    pub fn write_combined(&self, table: &CombinedTable, path: &Path) -> Result<()> {
        let mut writer = self.create(path)?;

        let mut header = vec![COL_TIME.to_string()];
        header.extend(table.pollution_columns.iter().cloned());
        header.extend(WEATHER_COLUMNS.iter().map(|c| c.to_string()));
        writer.write_record(&header)?;

        for row in &table.rows {
            let mut fields = vec![format_timestamp(&row.timestamp)];
            fields.extend(row.pollution.iter().map(|v| optional(*v)));
            match &row.weather {
                Some(w) => {
                    fields.push(optional(w.temperature_c));
                    fields.push(optional(w.wind_speed_kph));
                    fields.push(optional(w.pressure_hpa));
                    fields.push(optional(w.cloudiness));
                    fields.push(optional(w.precipitation));
                }
                None => fields.extend(std::iter::repeat(String::new()).take(WEATHER_COLUMNS.len())),
            }
            writer.write_record(&fields)?;
        }

        writer.flush()?;
        info!("Wrote {} combined rows to {}", table.len(), path.display());
        Ok(())
    }

    fn write_rows<T: Serialize>(&self, rows: &[T], path: &Path) -> Result<()> {
        let mut writer = self.create(path)?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        info!("Wrote {} rows to {}", rows.len(), path.display());
        Ok(())
    }

    fn create(&self, path: &Path) -> Result<csv::Writer<BufWriter<File>>> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, File::create(path)?);
        Ok(csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_writer(file))
    }
}

impl Default for CsvWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Cadence, CloudinessLevel, CombinedRow, PrecipitationLevel};
    use chrono::{Duration, NaiveDate, NaiveDateTime};
    use tempfile::TempDir;

    fn at(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn weather() -> WeatherSeries {
        WeatherSeries::new(vec![
            WeatherRecord {
                temperature_c: Some(-2),
                wind_speed_kph: Some(14),
                pressure_hpa: Some(1013),
                cloudiness: Some(CloudinessLevel::PartlyCloudy),
                precipitation: Some(PrecipitationLevel::Absent),
                ..WeatherRecord::empty(at(1))
            },
            WeatherRecord::empty(at(2)),
            WeatherRecord {
                temperature_c: Some(3),
                cloudiness: Some(CloudinessLevel::Unknown),
                precipitation: Some(PrecipitationLevel::Unknown),
                ..WeatherRecord::empty(at(3))
            },
        ])
        .unwrap()
    }

    #[test]
    fn test_weather_round_trip() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("nested/weather.csv");
        let writer = CsvWriter::new();

        writer.write_weather(&weather(), &path)?;
        let content = fs::read_to_string(&path)?;
        assert!(content.starts_with(
            "Time,Temperature C,Wind Speed kph,Pressure hPa,Cloudiness Level,Precipitation Level\n"
        ));
        assert!(content.contains("2020-01-01 01:00:00,-2,14,1013,Partly Cloudy,None\n"));

        let back = writer.read_weather(&path)?;
        assert_eq!(back, weather());
        Ok(())
    }

    #[test]
    fn test_write_series_wide() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("series.csv");
        let series = StationSeries::new(
            Cadence::Hourly,
            vec![at(1), at(1) + Duration::hours(1)],
            vec!["A".to_string(), "B".to_string()],
            vec![vec![Some(1.5), None], vec![Some(2.0), Some(3.0)]],
        )?;

        CsvWriter::new().write_series(&series, &path)?;

        let content = fs::read_to_string(&path)?;
        assert_eq!(
            content,
            "Time,A,B\n2020-01-01 01:00:00,1.5,2\n2020-01-01 02:00:00,,3\n"
        );
        Ok(())
    }

    #[test]
    fn test_write_combined() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("combined.csv");
        let table = CombinedTable {
            pollution_columns: vec!["Mean value".to_string()],
            rows: vec![
                CombinedRow {
                    timestamp: at(1),
                    pollution: vec![Some(20.0)],
                    weather: None,
                },
                CombinedRow {
                    timestamp: at(2),
                    pollution: vec![None],
                    weather: Some(WeatherRecord {
                        temperature_c: Some(4),
                        ..WeatherRecord::empty(at(2))
                    }),
                },
            ],
        };

        CsvWriter::new().write_combined(&table, &path)?;

        let lines: Vec<String> = fs::read_to_string(&path)?
            .lines()
            .map(str::to_string)
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "2020-01-01 01:00:00,20,,,,,");
        assert_eq!(lines[2], "2020-01-01 02:00:00,,4,,,,");
        Ok(())
    }

    #[test]
    fn test_write_dataset() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("dataset.csv");
        let records = vec![DatasetRecord {
            timestamp: at(1),
            station_code: "A".to_string(),
            raw_value: None,
            filled_value: Some(2.5),
        }];

        CsvWriter::new().write_dataset(&records, &path)?;

        assert_eq!(
            fs::read_to_string(&path)?,
            "timestamp,station_code,raw_value,filled_value\n2020-01-01 01:00:00,A,,2.5\n"
        );
        Ok(())
    }
}
