use chrono::{Duration, NaiveDateTime};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::error::{ParseIssue, ProcessingError, Result};
use crate::models::{Cadence, StationSeries};
use crate::readers::text::{decode_text, skip_lines};
use crate::utils::timestamps::parse_timestamp;

/// What a `SeriesReader` pass found besides the series itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesReadReport {
    pub rows_read: usize,
    pub rows_skipped: usize,
    /// All-missing rows added to close holes in the time axis
    pub rows_inserted: usize,
    pub missing_cells: usize,
    pub issues: Vec<ParseIssue>,
}

/// Reads a wide table (one timestamp column, one column per station)
/// into a `StationSeries`.
pub struct SeriesReader {
    delimiter: u8,
    skip_rows: usize,
    timestamp_column: Option<String>,
    timestamp_offset: Duration,
    cadence: Option<Cadence>,
}

impl SeriesReader {
    pub fn new() -> Self {
        Self {
            delimiter: b',',
            skip_rows: 0,
            timestamp_column: None,
            timestamp_offset: Duration::zero(),
            cadence: None,
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Lines to discard before the header row
    pub fn with_skip_rows(mut self, skip_rows: usize) -> Self {
        self.skip_rows = skip_rows;
        self
    }

    /// Timestamp column by header name; the first column otherwise
    pub fn with_timestamp_column(mut self, column: &str) -> Self {
        self.timestamp_column = Some(column.to_string());
        self
    }

    /// Added to every parsed timestamp, e.g. -1h for end-of-interval labels
    pub fn with_timestamp_offset(mut self, offset: Duration) -> Self {
        self.timestamp_offset = offset;
        self
    }

    pub fn with_cadence(mut self, cadence: Cadence) -> Self {
        self.cadence = Some(cadence);
        self
    }

    pub fn read_series(&self, path: &Path) -> Result<(StationSeries, SeriesReadReport)> {
        let bytes = fs::read(path)?;
        let text = decode_text(&bytes);
        self.parse_series(&text, &path.display().to_string())
    }

    pub fn parse_series(
        &self,
        text: &str,
        source_name: &str,
    ) -> Result<(StationSeries, SeriesReadReport)> {
        let body = skip_lines(text, self.skip_rows);
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(body.as_bytes());

        let headers = reader.headers()?.clone();
        let time_index = match &self.timestamp_column {
            Some(name) => headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| ProcessingError::schema_mismatch(source_name, name.as_str()))?,
            None if headers.is_empty() => {
                return Err(ProcessingError::schema_mismatch(source_name, "timestamp"))
            }
            None => 0,
        };

        let station_indices: Vec<usize> = (0..headers.len())
            .filter(|&i| i != time_index && !headers[i].is_empty())
            .collect();
        let stations: Vec<String> = station_indices
            .iter()
            .map(|&i| headers[i].to_string())
            .collect();

        let mut report = SeriesReadReport::default();
        let mut rows: Vec<(usize, NaiveDateTime, Vec<Option<f64>>)> = Vec::new();
        let mut seen = HashSet::new();

        for (idx, result) in reader.records().enumerate() {
            let row = idx + 1;
            report.rows_read += 1;

            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    self.skip(&mut report, source_name, row, format!("unreadable row: {}", e));
                    continue;
                }
            };

            let raw_time = record.get(time_index).unwrap_or("");
            let Some(ts) = parse_timestamp(raw_time) else {
                self.skip(
                    &mut report,
                    source_name,
                    row,
                    format!("unparseable timestamp '{}'", raw_time),
                );
                continue;
            };
            let ts = ts + self.timestamp_offset;

            if !seen.insert(ts) {
                self.skip(&mut report, source_name, row, format!("duplicate timestamp {}", ts));
                continue;
            }

            let mut values = Vec::with_capacity(station_indices.len());
            for (&i, station) in station_indices.iter().zip(&stations) {
                let cell = record.get(i).unwrap_or("");
                let value = match parse_decimal(cell) {
                    Ok(value) => value,
                    Err(()) => {
                        let issue = ParseIssue::new(
                            source_name,
                            Some(row),
                            format!("unparseable value '{}' for {}", cell, station),
                        );
                        warn!("{}", issue);
                        report.issues.push(issue);
                        None
                    }
                };
                values.push(value);
            }
            rows.push((row, ts, values));
        }

        let cadence = match self.cadence {
            Some(cadence) => cadence,
            None => {
                let timestamps: Vec<NaiveDateTime> = rows.iter().map(|(_, ts, _)| *ts).collect();
                infer_cadence(&timestamps, source_name)?
            }
        };

        let rows = self.drop_off_grid(rows, cadence, &mut report, source_name);
        report.missing_cells = rows
            .iter()
            .map(|(_, values)| values.iter().filter(|v| v.is_none()).count())
            .sum();

        let (series, inserted) = StationSeries::from_sparse_rows(cadence, stations, rows)?;
        report.rows_inserted = inserted;

        info!(
            "Read {} rows x {} stations ({}) from {}; {} skipped, {} inserted",
            series.len(),
            series.station_count(),
            cadence,
            source_name,
            report.rows_skipped,
            report.rows_inserted
        );

        Ok((series, report))
    }

    /// Keeps the rows sharing the most common phase of the cadence grid;
    /// the rest are skipped and reported.
    fn drop_off_grid(
        &self,
        rows: Vec<(usize, NaiveDateTime, Vec<Option<f64>>)>,
        cadence: Cadence,
        report: &mut SeriesReadReport,
        source_name: &str,
    ) -> Vec<(NaiveDateTime, Vec<Option<f64>>)> {
        let Some(origin) = rows.iter().map(|(_, ts, _)| *ts).min() else {
            return Vec::new();
        };
        let step = cadence.step().num_seconds();
        let phase = |ts: NaiveDateTime| (ts - origin).num_seconds().rem_euclid(step);

        let mut counts: HashMap<i64, usize> = HashMap::new();
        for (_, ts, _) in &rows {
            *counts.entry(phase(*ts)).or_default() += 1;
        }
        // Ties go to the phase closest to the earliest timestamp.
        let grid = counts
            .into_iter()
            .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
            .map(|(p, _)| p)
            .unwrap_or(0);

        let mut kept = Vec::with_capacity(rows.len());
        for (row, ts, values) in rows {
            if phase(ts) == grid {
                kept.push((ts, values));
            } else {
                self.skip(
                    report,
                    source_name,
                    row,
                    format!("timestamp {} is off the {} grid", ts, cadence),
                );
            }
        }
        kept
    }

    fn skip(&self, report: &mut SeriesReadReport, source_name: &str, row: usize, message: String) {
        let issue = ParseIssue::new(source_name, Some(row), message);
        warn!("Skipping row: {}", issue);
        report.rows_skipped += 1;
        report.issues.push(issue);
    }
}

impl Default for SeriesReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Blank → missing. Accepts a decimal comma. NaN counts as missing.
fn parse_decimal(cell: &str) -> std::result::Result<Option<f64>, ()> {
    let cell = cell.trim();
    if cell.is_empty() {
        return Ok(None);
    }
    let normalized;
    let text = if cell.contains(',') && !cell.contains('.') {
        normalized = cell.replace(',', ".");
        normalized.as_str()
    } else {
        cell
    };
    match text.parse::<f64>() {
        Ok(v) if v.is_nan() => Ok(None),
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(()),
    }
}

/// Most frequent hourly or daily step between consecutive timestamps, so a
/// stray row cannot decide the cadence.
fn infer_cadence(timestamps: &[NaiveDateTime], source_name: &str) -> Result<Cadence> {
    if timestamps.len() < 2 {
        return Err(ProcessingError::InvalidSeries(format!(
            "{}: cannot infer cadence from fewer than two rows",
            source_name
        )));
    }
    let mut sorted = timestamps.to_vec();
    sorted.sort_unstable();

    let (mut hourly, mut daily) = (0usize, 0usize);
    for w in sorted.windows(2) {
        match Cadence::from_step(w[1] - w[0]) {
            Some(Cadence::Hourly) => hourly += 1,
            Some(Cadence::Daily) => daily += 1,
            None => {}
        }
    }

    match (hourly, daily) {
        (0, 0) => Err(ProcessingError::InvalidSeries(format!(
            "{}: no consecutive rows are one hour or one day apart",
            source_name
        ))),
        (h, d) if h >= d => Ok(Cadence::Hourly),
        _ => Ok(Cadence::Daily),
    }
}
