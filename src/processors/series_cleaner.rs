use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::error::{ProcessingError, Result};
use crate::models::{InterpolationMethod, StationSeries};
use crate::processors::cleaning_report::{
    InterpolationReport, MeanFillReport, OutlierReport, RemovedColumn, SparseColumnReport,
    StationCount,
};

/// Numeric cleaning of a `StationSeries`. Every operation returns a fresh
/// series and leaves its input untouched.
pub struct SeriesCleaner;

impl SeriesCleaner {
    pub fn new() -> Self {
        Self
    }

    /// Drop station columns missing more than `threshold` of their readings.
    pub fn drop_sparse_columns(
        &self,
        series: &StationSeries,
        threshold: f64,
    ) -> Result<(StationSeries, SparseColumnReport)> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ProcessingError::Config(format!(
                "missing-fraction threshold must be within [0, 1], got {}",
                threshold
            )));
        }

        let mut keep = Vec::with_capacity(series.station_count());
        let mut removed = Vec::new();

        for (i, station) in series.stations().iter().enumerate() {
            let fraction = series.missing_fraction(i);
            if fraction > threshold {
                debug!("Dropping {}: {:.1}% missing", station, 100.0 * fraction);
                removed.push(RemovedColumn {
                    station: station.clone(),
                    missing_fraction: fraction,
                });
            } else {
                keep.push(i);
            }
        }

        info!(
            "{} out of {} columns left",
            keep.len(),
            series.station_count()
        );

        let report = SparseColumnReport {
            threshold,
            total_columns: series.station_count(),
            removed,
        };
        Ok((series.select(&keep), report))
    }

    /// Replace readings that sit too far above their row's cross-station
    /// minimum with missing values.
    ///
    /// The cut is `std_multiplier` times the sample standard deviation of the
    /// differences between adjacent stations (in the order given). The test
    /// is repeated on its own output until a pass flags nothing, so running
    /// it again with the same parameters removes no further values.
    pub fn remove_outliers(
        &self,
        series: &StationSeries,
        stations: &[String],
        std_multiplier: f64,
    ) -> Result<(StationSeries, OutlierReport)> {
        if !(std_multiplier.is_finite() && std_multiplier > 0.0) {
            return Err(ProcessingError::Config(format!(
                "outlier standard-deviation multiplier must be positive, got {}",
                std_multiplier
            )));
        }

        let indices = series.require_stations(stations)?;
        let mut columns = series.columns().to_vec();
        let mut removed = vec![0usize; indices.len()];
        let mut initial_sigma = None;
        let mut final_cut = None;
        let mut passes = 0;

        loop {
            passes += 1;
            let Some(sigma) = adjacent_difference_std(&columns, &indices) else {
                if passes == 1 {
                    warn!("Fewer than two paired readings; outlier cut is undefined");
                }
                break;
            };
            if passes == 1 {
                initial_sigma = Some(sigma);
            }

            let cut = std_multiplier * sigma;
            final_cut = Some(cut);

            let flagged = flag_above_row_minimum(&columns, &indices, cut);
            debug!(
                "Outlier pass {}: sigma={:.4}, cut={:.4}, flagged={}",
                passes,
                sigma,
                cut,
                flagged.len()
            );
            if flagged.is_empty() {
                break;
            }

            for (k, row) in flagged {
                columns[indices[k]][row] = None;
                removed[k] += 1;
            }
        }

        let removed: Vec<StationCount> = stations
            .iter()
            .zip(removed)
            .map(|(station, count)| StationCount::new(station.clone(), count))
            .collect();

        for count in &removed {
            info!("Removed {} outliers from {}", count.count, count.station);
        }

        let report = OutlierReport {
            std_multiplier,
            initial_sigma,
            final_cut,
            passes,
            removed,
        };
        Ok((series.with_columns(columns)?, report))
    }

    /// Fill interior gaps of at most `max_gap` consecutive missing values.
    ///
    /// Longer gaps stay missing in full, as do gaps at either edge of the
    /// series (no extrapolation). Stations are processed independently.
    pub fn interpolate_gaps(
        &self,
        series: &StationSeries,
        stations: &[String],
        method: InterpolationMethod,
        max_gap: usize,
    ) -> Result<(StationSeries, InterpolationReport)> {
        if max_gap == 0 {
            return Err(ProcessingError::Config(
                "interpolation gap limit must be positive".to_string(),
            ));
        }

        let indices = series.require_stations(stations)?;
        let source = series.columns();

        let results: Vec<ColumnFill> = indices
            .par_iter()
            .map(|&i| interpolate_column(&source[i], method, max_gap))
            .collect();

        let mut columns = source.to_vec();
        let mut filled = Vec::with_capacity(indices.len());
        let mut skipped_gaps = 0;

        for ((&i, station), result) in indices.iter().zip(stations).zip(results) {
            info!("Interpolated {} values in {}", result.filled, station);
            filled.push(StationCount::new(station.clone(), result.filled));
            skipped_gaps += result.skipped_gaps;
            columns[i] = result.values;
        }

        let report = InterpolationReport {
            method,
            max_gap,
            filled,
            skipped_gaps,
        };
        Ok((series.with_columns(columns)?, report))
    }

    /// Replace every remaining missing value with its column's mean.
    /// Columns without any reading stay missing.
    pub fn fill_with_column_mean(
        &self,
        series: &StationSeries,
    ) -> Result<(StationSeries, MeanFillReport)> {
        let mut columns = Vec::with_capacity(series.station_count());
        let mut filled = Vec::with_capacity(series.station_count());

        for (station, column) in series.stations().iter().zip(series.columns()) {
            let mean = mean_of(column.iter().flatten().copied());
            let mut count = 0;
            let new_column = column
                .iter()
                .map(|v| match (v, mean) {
                    (None, Some(m)) => {
                        count += 1;
                        Some(m)
                    }
                    _ => *v,
                })
                .collect();

            if mean.is_none() {
                warn!("Column {} has no readings; left missing", station);
            }
            columns.push(new_column);
            filled.push(StationCount::new(station.clone(), count));
        }

        let report = MeanFillReport { filled };
        info!("Filled {} values with column means", report.total_filled());
        Ok((series.with_columns(columns)?, report))
    }

    /// Per-timestamp arithmetic mean of the non-missing station values,
    /// stored as a single column named `label`.
    pub fn mean_across_stations(
        &self,
        series: &StationSeries,
        label: &str,
    ) -> Result<StationSeries> {
        let mean: Vec<Option<f64>> = (0..series.len())
            .map(|row| mean_of(series.columns().iter().filter_map(|column| column[row])))
            .collect();

        StationSeries::new(
            series.cadence(),
            series.timestamps().to_vec(),
            vec![label.to_string()],
            vec![mean],
        )
    }
}

impl Default for SeriesCleaner {
    fn default() -> Self {
        Self::new()
    }
}

fn mean_of(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

/// Bessel-corrected standard deviation of `next - previous` over every pair
/// of adjacent stations and every row where both readings exist.
fn adjacent_difference_std(columns: &[Vec<Option<f64>>], indices: &[usize]) -> Option<f64> {
    let mut diffs = Vec::new();
    for pair in indices.windows(2) {
        let (left, right) = (&columns[pair[0]], &columns[pair[1]]);
        for (a, b) in left.iter().zip(right) {
            if let (Some(a), Some(b)) = (a, b) {
                diffs.push(b - a);
            }
        }
    }

    if diffs.len() < 2 {
        return None;
    }

    let n = diffs.len() as f64;
    let mean = diffs.iter().sum::<f64>() / n;
    let variance = diffs.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(variance.sqrt())
}

/// (position in `indices`, row) of every reading more than `cut` above the
/// minimum of its row. All-missing rows have no minimum and flag nothing.
fn flag_above_row_minimum(
    columns: &[Vec<Option<f64>>],
    indices: &[usize],
    cut: f64,
) -> Vec<(usize, usize)> {
    let rows = indices.first().map_or(0, |&i| columns[i].len());
    let mut flagged = Vec::new();

    for row in 0..rows {
        let minimum = indices
            .iter()
            .filter_map(|&i| columns[i][row])
            .fold(None, |min: Option<f64>, v| Some(min.map_or(v, |m| m.min(v))));

        let Some(minimum) = minimum else {
            continue;
        };

        for (k, &i) in indices.iter().enumerate() {
            if let Some(value) = columns[i][row] {
                if value - minimum > cut {
                    flagged.push((k, row));
                }
            }
        }
    }

    flagged
}

struct ColumnFill {
    values: Vec<Option<f64>>,
    filled: usize,
    skipped_gaps: usize,
}

fn interpolate_column(column: &[Option<f64>], method: InterpolationMethod, max_gap: usize) -> ColumnFill {
    let mut values = column.to_vec();
    let mut filled = 0;
    let mut skipped_gaps = 0;
    let len = column.len();
    let mut start = 0;

    while start < len {
        if column[start].is_some() {
            start += 1;
            continue;
        }

        let mut end = start;
        while end < len && column[end].is_none() {
            end += 1;
        }

        let bounded = start > 0 && end < len;
        if !bounded || end - start > max_gap {
            skipped_gaps += 1;
        } else {
            let support = support_points(column, start - 1, end, method.degree());
            for (x, value) in values.iter_mut().enumerate().take(end).skip(start) {
                *value = Some(lagrange(&support, x as f64));
                filled += 1;
            }
        }

        start = end;
    }

    ColumnFill {
        values,
        filled,
        skipped_gaps,
    }
}

/// Known points around a gap: both bounding neighbours, then the nearest
/// further known points (left first on ties) until `degree + 1` are found.
fn support_points(column: &[Option<f64>], left: usize, right: usize, degree: usize) -> Vec<(f64, f64)> {
    let known = |i: usize| column[i].map(|v| (i as f64, v));
    let mut points = Vec::with_capacity(degree + 1);
    points.extend(known(left));
    points.extend(known(right));

    let mut next_left = (0..left).rev().find(|&i| column[i].is_some());
    let mut next_right = (right + 1..column.len()).find(|&i| column[i].is_some());

    while points.len() < degree + 1 {
        let pick = match (next_left, next_right) {
            (Some(l), Some(r)) => {
                if left - l <= r - right {
                    l
                } else {
                    r
                }
            }
            (Some(l), None) => l,
            (None, Some(r)) => r,
            (None, None) => break,
        };

        points.extend(known(pick));
        if Some(pick) == next_left {
            next_left = (0..pick).rev().find(|&i| column[i].is_some());
        } else {
            next_right = (pick + 1..column.len()).find(|&i| column[i].is_some());
        }
    }

    points
}

fn lagrange(points: &[(f64, f64)], x: f64) -> f64 {
    points
        .iter()
        .enumerate()
        .map(|(j, &(xj, yj))| {
            let basis: f64 = points
                .iter()
                .enumerate()
                .filter(|&(m, _)| m != j)
                .map(|(_, &(xm, _))| (x - xm) / (xj - xm))
                .product();
            yj * basis
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Cadence;
    use chrono::{NaiveDate, NaiveDateTime};

    fn hours(n: usize) -> Vec<NaiveDateTime> {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(1, 0, 0)
            .unwrap();
        (0..n)
            .map(|i| start + chrono::Duration::hours(i as i64))
            .collect()
    }

    fn series(stations: &[&str], columns: Vec<Vec<Option<f64>>>) -> StationSeries {
        let n = columns.first().map_or(0, |c| c.len());
        StationSeries::new(
            Cadence::Hourly,
            hours(n),
            stations.iter().map(|s| s.to_string()).collect(),
            columns,
        )
        .unwrap()
    }

    fn names(stations: &[&str]) -> Vec<String> {
        stations.iter().map(|s| s.to_string()).collect()
    }

    fn some(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().map(|&v| Some(v)).collect()
    }

    #[test]
    fn test_drop_sparse_columns_keeps_order() {
        let input = series(
            &["A", "B", "C"],
            vec![
                vec![Some(1.0), None, Some(1.0), Some(1.0)],
                vec![None, None, None, Some(1.0)],
                vec![Some(1.0), Some(1.0), Some(1.0), Some(1.0)],
            ],
        );

        let (output, report) = SeriesCleaner::new()
            .drop_sparse_columns(&input, 0.25)
            .unwrap();

        assert_eq!(output.stations(), &["A".to_string(), "C".to_string()]);
        assert_eq!(report.removed_count(), 1);
        assert_eq!(report.removed[0].station, "B");
        for i in 0..output.station_count() {
            assert!(output.missing_fraction(i) <= 0.25);
        }
        // the input is untouched
        assert_eq!(input.station_count(), 3);
    }

    #[test]
    fn test_drop_sparse_columns_rejects_bad_threshold() {
        let input = series(&["A"], vec![some(&[1.0])]);
        let cleaner = SeriesCleaner::new();
        assert!(cleaner.drop_sparse_columns(&input, 1.2).is_err());
        assert!(cleaner.drop_sparse_columns(&input, f64::NAN).is_err());
    }

    #[test]
    fn test_remove_outliers_worked_example() {
        // diffs B - A = [0, 0, 40]: sigma ~ 23.09, cut ~ 92.4, 50 - 10 is kept
        let input = series(
            &["A", "B"],
            vec![some(&[10.0, 10.0, 10.0]), some(&[10.0, 10.0, 50.0])],
        );

        let (output, report) = SeriesCleaner::new()
            .remove_outliers(&input, &names(&["A", "B"]), 4.0)
            .unwrap();

        let sigma = report.initial_sigma.unwrap();
        assert!((sigma - 23.094).abs() < 1e-3);
        assert!((report.initial_cut().unwrap() - 92.376).abs() < 1e-2);
        assert_eq!(report.total_removed(), 0);
        assert_eq!(output, input);
    }

    #[test]
    fn test_remove_outliers_flags_single_sensor_fault() {
        let mut a = vec![20.0; 40];
        let mut b = vec![21.0; 40];
        for i in 0..40 {
            a[i] += (i % 3) as f64;
            b[i] += (i % 4) as f64;
        }
        b[17] = 400.0;

        let input = series(&["A", "B"], vec![some(&a), some(&b)]);
        let (output, report) = SeriesCleaner::new()
            .remove_outliers(&input, &names(&["A", "B"]), 4.0)
            .unwrap();

        assert_eq!(output.column("B").unwrap()[17], None);
        assert_eq!(report.removed[1], StationCount::new("B", 1));
        assert_eq!(report.removed[0].count, 0);
    }

    #[test]
    fn test_remove_outliers_is_idempotent() {
        let a: Vec<f64> = (0..30).map(|i| 10.0 + (i % 5) as f64).collect();
        let mut b: Vec<f64> = (0..30).map(|i| 11.0 + (i % 7) as f64).collect();
        let c: Vec<f64> = (0..30).map(|i| 9.0 + (i % 4) as f64).collect();
        b[3] = 90.0;
        b[20] = 60.0;

        let input = series(&["A", "B", "C"], vec![some(&a), some(&b), some(&c)]);
        let stations = names(&["A", "B", "C"]);
        let cleaner = SeriesCleaner::new();

        let (once, first) = cleaner.remove_outliers(&input, &stations, 4.0).unwrap();
        let (twice, second) = cleaner.remove_outliers(&once, &stations, 4.0).unwrap();

        assert!(first.total_removed() > 0);
        assert_eq!(second.total_removed(), 0);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_remove_outliers_skips_all_missing_rows() {
        let input = series(
            &["A", "B"],
            vec![
                vec![Some(1.0), None, Some(2.0), Some(1.5)],
                vec![Some(1.2), None, Some(2.1), Some(1.4)],
            ],
        );
        let (output, report) = SeriesCleaner::new()
            .remove_outliers(&input, &names(&["A", "B"]), 4.0)
            .unwrap();
        assert_eq!(report.total_removed(), 0);
        assert_eq!(output.row(1), vec![None, None]);
    }

    #[test]
    fn test_remove_outliers_unknown_station() {
        let input = series(&["A"], vec![some(&[1.0, 2.0])]);
        let err = SeriesCleaner::new()
            .remove_outliers(&input, &names(&["Z"]), 4.0)
            .unwrap_err();
        assert!(matches!(err, ProcessingError::SchemaMismatch { .. }));
    }

    #[test]
    fn test_interpolate_two_point_gap() {
        let input = series(&["A"], vec![vec![Some(5.0), None, None, Some(8.0)]]);
        let (output, report) = SeriesCleaner::new()
            .interpolate_gaps(&input, &names(&["A"]), InterpolationMethod::Polynomial2, 3)
            .unwrap();

        let filled = output.column("A").unwrap();
        assert!((filled[1].unwrap() - 6.0).abs() < 1e-9);
        assert!((filled[2].unwrap() - 7.0).abs() < 1e-9);
        assert_eq!(report.total_filled(), 2);
    }

    #[test]
    fn test_interpolate_polynomial_uses_third_point() {
        // y = (x + 1)^2
        let input = series(&["A"], vec![vec![Some(1.0), Some(4.0), None, Some(16.0)]]);
        let cleaner = SeriesCleaner::new();

        let (poly, _) = cleaner
            .interpolate_gaps(&input, &names(&["A"]), InterpolationMethod::Polynomial2, 3)
            .unwrap();
        assert!((poly.column("A").unwrap()[2].unwrap() - 9.0).abs() < 1e-9);

        let (linear, _) = cleaner
            .interpolate_gaps(&input, &names(&["A"]), InterpolationMethod::Linear, 3)
            .unwrap();
        assert!((linear.column("A").unwrap()[2].unwrap() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_interpolate_leaves_long_and_edge_gaps() {
        let input = series(
            &["A"],
            vec![vec![
                None,
                Some(1.0),
                None,
                None,
                None,
                None,
                Some(2.0),
                None,
                Some(3.0),
                None,
            ]],
        );
        let (output, report) = SeriesCleaner::new()
            .interpolate_gaps(&input, &names(&["A"]), InterpolationMethod::Linear, 3)
            .unwrap();

        let column = output.column("A").unwrap();
        assert_eq!(column[0], None);
        assert!(column[2..6].iter().all(|v| v.is_none()));
        assert!((column[7].unwrap() - 2.5).abs() < 1e-9);
        assert_eq!(column[9], None);
        assert_eq!(report.total_filled(), 1);
        assert_eq!(report.skipped_gaps, 3);
    }

    #[test]
    fn test_interpolate_gap_of_exactly_max_gap() {
        let input = series(&["A"], vec![vec![Some(1.0), None, None, None, Some(5.0)]]);
        let (output, report) = SeriesCleaner::new()
            .interpolate_gaps(&input, &names(&["A"]), InterpolationMethod::Linear, 3)
            .unwrap();

        let column = output.column("A").unwrap();
        for (i, expected) in [(1, 2.0), (2, 3.0), (3, 4.0)] {
            assert!((column[i].unwrap() - expected).abs() < 1e-9);
        }
        assert_eq!(report.total_filled(), 3);
        assert_eq!(report.skipped_gaps, 0);
    }

    #[test]
    fn test_interpolate_only_named_stations() {
        let input = series(
            &["A", "B"],
            vec![
                vec![Some(1.0), None, Some(3.0)],
                vec![Some(1.0), None, Some(3.0)],
            ],
        );
        let (output, _) = SeriesCleaner::new()
            .interpolate_gaps(&input, &names(&["B"]), InterpolationMethod::Linear, 1)
            .unwrap();
        assert_eq!(output.column("A").unwrap()[1], None);
        assert_eq!(output.column("B").unwrap()[1], Some(2.0));
    }

    #[test]
    fn test_interpolate_rejects_zero_gap() {
        let input = series(&["A"], vec![some(&[1.0])]);
        assert!(SeriesCleaner::new()
            .interpolate_gaps(&input, &names(&["A"]), InterpolationMethod::Linear, 0)
            .is_err());
    }

    #[test]
    fn test_fill_with_column_mean() {
        let input = series(
            &["A", "B"],
            vec![vec![Some(2.0), None, Some(4.0)], vec![None, None, None]],
        );
        let (output, report) = SeriesCleaner::new().fill_with_column_mean(&input).unwrap();

        assert_eq!(output.column("A").unwrap(), &[Some(2.0), Some(3.0), Some(4.0)]);
        assert_eq!(output.column("B").unwrap(), &[None, None, None]);
        assert_eq!(report.total_filled(), 1);
    }

    #[test]
    fn test_mean_across_stations() {
        let input = series(
            &["A", "B", "C"],
            vec![
                vec![Some(1.0), None, None],
                vec![Some(3.0), Some(7.0), None],
                vec![Some(5.0), None, None],
            ],
        );
        let mean = SeriesCleaner::new()
            .mean_across_stations(&input, "Mean value")
            .unwrap();

        assert_eq!(mean.stations(), &["Mean value".to_string()]);
        assert_eq!(mean.column("Mean value").unwrap(), &[Some(3.0), Some(7.0), None]);
        assert_eq!(mean.timestamps(), input.timestamps());
    }
}
