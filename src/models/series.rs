use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{ProcessingError, Result};

/// Regular spacing of a series. Never mixed within one `StationSeries`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cadence {
    Hourly,
    Daily,
}

impl Cadence {
    pub fn step(&self) -> Duration {
        match self {
            Cadence::Hourly => Duration::hours(1),
            Cadence::Daily => Duration::days(1),
        }
    }

    pub fn from_step(step: Duration) -> Option<Self> {
        if step == Duration::hours(1) {
            Some(Cadence::Hourly)
        } else if step == Duration::days(1) {
            Some(Cadence::Daily)
        } else {
            None
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Cadence::Hourly => "1h",
            Cadence::Daily => "24h",
        }
    }
}

impl std::fmt::Display for Cadence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One parameter measured by a fixed set of stations: a table keyed by
/// timestamp with one column per station. Missing readings are `None`.
///
/// Invariants enforced on construction:
/// - timestamps strictly increasing and spaced exactly one `cadence` step
/// - one column per station, each as long as the timestamp index
/// - station names unique
///
/// Transforms never mutate a series in place; they return a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct StationSeries {
    cadence: Cadence,
    timestamps: Vec<NaiveDateTime>,
    stations: Vec<String>,
    columns: Vec<Vec<Option<f64>>>,
}

impl StationSeries {
    pub fn new(
        cadence: Cadence,
        timestamps: Vec<NaiveDateTime>,
        stations: Vec<String>,
        columns: Vec<Vec<Option<f64>>>,
    ) -> Result<Self> {
        if stations.len() != columns.len() {
            return Err(ProcessingError::InvalidSeries(format!(
                "{} station names for {} columns",
                stations.len(),
                columns.len()
            )));
        }

        let mut seen = HashSet::with_capacity(stations.len());
        for station in &stations {
            if !seen.insert(station.as_str()) {
                return Err(ProcessingError::InvalidSeries(format!(
                    "duplicate station column '{}'",
                    station
                )));
            }
        }

        for (station, column) in stations.iter().zip(&columns) {
            if column.len() != timestamps.len() {
                return Err(ProcessingError::InvalidSeries(format!(
                    "column '{}' has {} values for {} timestamps",
                    station,
                    column.len(),
                    timestamps.len()
                )));
            }
        }

        let step = cadence.step();
        for window in timestamps.windows(2) {
            if window[1] - window[0] != step {
                return Err(ProcessingError::InvalidSeries(format!(
                    "timestamps {} and {} are not one {} step apart",
                    window[0], window[1], cadence
                )));
            }
        }

        Ok(Self {
            cadence,
            timestamps,
            stations,
            columns,
        })
    }

    /// Build a series from rows that may leave holes in the time axis.
    ///
    /// Rows are sorted and reindexed onto the regular grid between the first
    /// and last timestamp; absent timestamps become all-missing rows. Returns
    /// the series and the number of rows inserted.
    pub fn from_sparse_rows(
        cadence: Cadence,
        stations: Vec<String>,
        mut rows: Vec<(NaiveDateTime, Vec<Option<f64>>)>,
    ) -> Result<(Self, usize)> {
        rows.sort_by_key(|(ts, _)| *ts);

        let Some(first) = rows.first().map(|(ts, _)| *ts) else {
            let columns = vec![Vec::new(); stations.len()];
            return Ok((Self::new(cadence, Vec::new(), stations, columns)?, 0));
        };

        let step = cadence.step();
        let width = stations.len();
        let mut timestamps = Vec::with_capacity(rows.len());
        let mut columns: Vec<Vec<Option<f64>>> = vec![Vec::with_capacity(rows.len()); width];
        let mut inserted = 0;
        let mut expected = first;

        for (ts, values) in rows {
            if values.len() != width {
                return Err(ProcessingError::InvalidSeries(format!(
                    "row at {} has {} values for {} stations",
                    ts,
                    values.len(),
                    width
                )));
            }
            if (ts - first).num_seconds() % step.num_seconds() != 0 {
                return Err(ProcessingError::InvalidSeries(format!(
                    "timestamp {} is not on the {} grid starting at {}",
                    ts, cadence, first
                )));
            }
            if ts < expected {
                return Err(ProcessingError::InvalidSeries(format!(
                    "duplicate timestamp {}",
                    ts
                )));
            }

            while expected < ts {
                timestamps.push(expected);
                for column in columns.iter_mut() {
                    column.push(None);
                }
                inserted += 1;
                expected += step;
            }

            timestamps.push(ts);
            for (column, value) in columns.iter_mut().zip(values) {
                column.push(value);
            }
            expected = ts + step;
        }

        Ok((Self::new(cadence, timestamps, stations, columns)?, inserted))
    }

    pub fn cadence(&self) -> Cadence {
        self.cadence
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn stations(&self) -> &[String] {
        &self.stations
    }

    pub fn columns(&self) -> &[Vec<Option<f64>>] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn station_count(&self) -> usize {
        self.stations.len()
    }

    pub fn station_index(&self, station: &str) -> Option<usize> {
        self.stations.iter().position(|s| s == station)
    }

    pub fn column(&self, station: &str) -> Option<&[Option<f64>]> {
        self.station_index(station).map(|i| self.columns[i].as_slice())
    }

    /// Resolve station names to column indices, failing on the first unknown name.
    pub fn require_stations(&self, stations: &[String]) -> Result<Vec<usize>> {
        stations
            .iter()
            .map(|station| {
                self.station_index(station).ok_or_else(|| {
                    ProcessingError::schema_mismatch("station series", station.clone())
                })
            })
            .collect()
    }

    pub fn missing_count(&self, index: usize) -> usize {
        self.columns[index].iter().filter(|v| v.is_none()).count()
    }

    /// Fraction of missing readings in a column; an empty series has none.
    pub fn missing_fraction(&self, index: usize) -> f64 {
        if self.timestamps.is_empty() {
            return 0.0;
        }
        self.missing_count(index) as f64 / self.timestamps.len() as f64
    }

    pub fn total_missing(&self) -> usize {
        (0..self.stations.len()).map(|i| self.missing_count(i)).sum()
    }

    /// Keep the given column indices, in the given order.
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            cadence: self.cadence,
            timestamps: self.timestamps.clone(),
            stations: indices.iter().map(|&i| self.stations[i].clone()).collect(),
            columns: indices.iter().map(|&i| self.columns[i].clone()).collect(),
        }
    }

    /// Same index and stations with new column data. Lengths are re-checked.
    pub fn with_columns(&self, columns: Vec<Vec<Option<f64>>>) -> Result<Self> {
        Self::new(
            self.cadence,
            self.timestamps.clone(),
            self.stations.clone(),
            columns,
        )
    }

    /// Values of one timestamp across every station.
    pub fn row(&self, row: usize) -> Vec<Option<f64>> {
        self.columns.iter().map(|column| column[row]).collect()
    }
}
