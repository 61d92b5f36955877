use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::models::{Cadence, WeatherRecord};

/// One long-form measurement: (timestamp, station, parameter, value).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    #[serde(with = "crate::utils::timestamp_format")]
    pub timestamp: NaiveDateTime,
    pub station_code: String,
    pub parameter: String,
    pub cadence: Cadence,
    pub value: Option<f64>,
}

/// A melted row of the output dataset: the value as read and the value
/// after cleaning, side by side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRecord {
    #[serde(with = "crate::utils::timestamp_format")]
    pub timestamp: NaiveDateTime,
    pub station_code: String,
    pub raw_value: Option<f64>,
    pub filled_value: Option<f64>,
}

/// `DatasetRecord` joined with its station's metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    #[serde(with = "crate::utils::timestamp_format")]
    pub timestamp: NaiveDateTime,
    pub station_code: String,
    pub raw_value: Option<f64>,
    pub filled_value: Option<f64>,
    pub station_name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// One timestamp of the pollution/weather outer join.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedRow {
    pub timestamp: NaiveDateTime,
    /// One value per pollution column, all `None` when only weather exists
    pub pollution: Vec<Option<f64>>,
    pub weather: Option<WeatherRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CombinedTable {
    pub pollution_columns: Vec<String>,
    pub rows: Vec<CombinedRow>,
}

impl CombinedTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows_with_both(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| r.weather.is_some() && r.pollution.iter().any(|v| v.is_some()))
            .count()
    }
}
