use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{ProcessingError, Result};
use crate::models::RawObservation;
use crate::processors::DailyWeatherSource;
use crate::readers::text::decode_text;
use crate::utils::constants::{
    COL_CONDITION, COL_PRESSURE, COL_TEMPERATURE, COL_TIME, COL_WIND_SPEED,
    DEFAULT_WEATHER_FILE_PREFIX,
};
use crate::utils::filename::daily_weather_path;

/// Reads the raw per-day weather dumps: {directory}/{prefix}{YYYY-MM-DD}.csv
pub struct WeatherReader {
    directory: PathBuf,
    file_prefix: String,
}

impl WeatherReader {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            file_prefix: DEFAULT_WEATHER_FILE_PREFIX.to_string(),
        }
    }

    pub fn with_file_prefix(mut self, prefix: &str) -> Self {
        self.file_prefix = prefix.to_string();
        self
    }

    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        daily_weather_path(&self.directory, &self.file_prefix, date)
    }

    pub fn read_file(&self, path: &Path) -> Result<Vec<RawObservation>> {
        let bytes = fs::read(path)?;
        let text = decode_text(&bytes);
        self.parse_observations(&text, &path.display().to_string())
    }

    /// Only the five known columns are kept; others (such as a leading
    /// index or humidity) are ignored. Blank cells become `None`.
    pub fn parse_observations(&self, text: &str, source_name: &str) -> Result<Vec<RawObservation>> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let headers = reader.headers()?.clone();
        let find = |column: &str| {
            headers
                .iter()
                .position(|h| h == column)
                .ok_or_else(|| ProcessingError::schema_mismatch(source_name, column))
        };
        let time = find(COL_TIME)?;
        let temperature = find(COL_TEMPERATURE)?;
        let wind_speed = find(COL_WIND_SPEED)?;
        let condition = find(COL_CONDITION)?;
        let pressure = find(COL_PRESSURE)?;

        let mut observations = Vec::new();
        for (idx, result) in reader.records().enumerate() {
            let row = idx + 1;
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    warn!("{}: row {} unreadable: {}", source_name, row, e);
                    observations.push(RawObservation::unreadable(row, e.to_string()));
                    continue;
                }
            };
            let cell = |i: usize| {
                record
                    .get(i)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
            };

            observations.push(RawObservation {
                row,
                time: cell(time),
                temperature: cell(temperature),
                wind_speed: cell(wind_speed),
                condition: cell(condition),
                pressure: cell(pressure),
                unreadable: None,
            });
        }

        debug!("Read {} raw rows from {}", observations.len(), source_name);
        Ok(observations)
    }
}

impl DailyWeatherSource for WeatherReader {
    fn source_name(&self, date: NaiveDate) -> String {
        self.path_for(date).display().to_string()
    }

    fn read_day(&self, date: NaiveDate) -> Result<Vec<RawObservation>> {
        self.read_file(&self.path_for(date))
    }
}
