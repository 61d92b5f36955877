use crate::error::{ParseIssue, ProcessingError, Result};
use crate::models::StationMetadata;
use crate::readers::text::decode_text;
use crate::utils::constants::{COL_LATITUDE, COL_LONGITUDE, COL_STATION_CODE, COL_STATION_NAME};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::warn;
use validator::Validate;

pub struct StationReader {
    delimiter: u8,
}

impl StationReader {
    pub fn new() -> Self {
        Self { delimiter: b',' }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Read station metadata (station_code, station_name, latitude, longitude).
    /// Rows that fail to parse or validate are skipped and reported.
    pub fn read_stations(&self, path: &Path) -> Result<(Vec<StationMetadata>, Vec<ParseIssue>)> {
        let bytes = fs::read(path)?;
        let text = decode_text(&bytes);
        self.parse_stations(&text, &path.display().to_string())
    }

    pub fn parse_stations(
        &self,
        text: &str,
        source_name: &str,
    ) -> Result<(Vec<StationMetadata>, Vec<ParseIssue>)> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let headers = reader.headers()?.clone();
        for column in [COL_STATION_CODE, COL_STATION_NAME, COL_LATITUDE, COL_LONGITUDE] {
            if !headers.iter().any(|h| h == column) {
                return Err(ProcessingError::schema_mismatch(source_name, column));
            }
        }

        let mut stations = Vec::new();
        let mut issues = Vec::new();

        for (idx, result) in reader.deserialize::<StationMetadata>().enumerate() {
            let row = idx + 1;
            let station = match result {
                Ok(station) => station,
                Err(e) => {
                    issues.push(ParseIssue::new(source_name, Some(row), e.to_string()));
                    continue;
                }
            };

            if let Err(e) = station.validate() {
                issues.push(ParseIssue::new(
                    source_name,
                    Some(row),
                    format!("station {}: {}", station.station_code, e),
                ));
                continue;
            }

            stations.push(station);
        }

        for issue in &issues {
            warn!("Skipping station row: {}", issue);
        }

        Ok((stations, issues))
    }

    /// Station metadata keyed by station code
    pub fn read_stations_map(&self, path: &Path) -> Result<HashMap<String, StationMetadata>> {
        let (stations, _) = self.read_stations(path)?;
        let mut map = HashMap::with_capacity(stations.len());

        for station in stations {
            map.insert(station.station_code.clone(), station);
        }

        Ok(map)
    }
}

impl Default for StationReader {
    fn default() -> Self {
        Self::new()
    }
}
