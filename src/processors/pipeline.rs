use tracing::info;

use crate::error::Result;
use crate::models::{CurationThreshold, StationSeries};
use crate::processors::cleaning_report::CleaningReport;
use crate::processors::series_cleaner::SeriesCleaner;
use crate::utils::constants::MEAN_VALUE_LABEL;
use crate::utils::progress::ProgressReporter;

/// Output of one pipeline run.
#[derive(Debug, Clone)]
pub struct CurationOutcome {
    /// Input restricted to the stations that survived pruning
    pub raw: StationSeries,
    pub cleaned: StationSeries,
    /// Single-column cross-station mean of `cleaned`
    pub mean: StationSeries,
    pub report: CleaningReport,
}

pub struct CurationPipeline {
    threshold: CurationThreshold,
    fill_with_column_mean: bool,
    mean_label: String,
}

impl CurationPipeline {
    pub fn new(threshold: CurationThreshold) -> Result<Self> {
        threshold.check()?;
        Ok(Self {
            threshold,
            fill_with_column_mean: false,
            mean_label: MEAN_VALUE_LABEL.to_string(),
        })
    }

    pub fn with_column_mean_fill(mut self, enabled: bool) -> Self {
        self.fill_with_column_mean = enabled;
        self
    }

    pub fn with_mean_label(mut self, label: &str) -> Self {
        self.mean_label = label.to_string();
        self
    }

    pub fn threshold(&self) -> &CurationThreshold {
        &self.threshold
    }

    /// Prune sparse stations, remove outliers, interpolate short gaps,
    /// optionally fill what is left with column means, then average across
    /// stations.
    pub fn run(
        &self,
        series: &StationSeries,
        progress: Option<&ProgressReporter>,
    ) -> Result<CurationOutcome> {
        let cleaner = SeriesCleaner::new();
        let missing_before = series.total_missing();

        if let Some(p) = progress {
            p.set_message("Dropping sparse columns...");
        }
        let (raw, sparse_columns) =
            cleaner.drop_sparse_columns(series, self.threshold.max_missing_fraction)?;
        let stations = raw.stations().to_vec();

        if let Some(p) = progress {
            p.set_message("Removing outliers...");
        }
        let (without_outliers, outliers) =
            cleaner.remove_outliers(&raw, &stations, self.threshold.outlier_std_multiplier)?;

        if let Some(p) = progress {
            p.set_message("Interpolating gaps...");
        }
        let (mut cleaned, interpolation) = cleaner.interpolate_gaps(
            &without_outliers,
            &stations,
            self.threshold.interpolation_method,
            self.threshold.max_gap,
        )?;

        let mean_fill = if self.fill_with_column_mean {
            let (filled, report) = cleaner.fill_with_column_mean(&cleaned)?;
            cleaned = filled;
            Some(report)
        } else {
            None
        };

        let mean = cleaner.mean_across_stations(&cleaned, &self.mean_label)?;

        let report = CleaningReport {
            rows: series.len(),
            missing_before,
            missing_after: cleaned.total_missing(),
            sparse_columns,
            outliers,
            interpolation,
            mean_fill,
        };

        info!(
            "Curated {} rows: {} stations kept, {} outliers removed, {} values interpolated",
            report.rows,
            report.sparse_columns.kept_count(),
            report.outliers.total_removed(),
            report.interpolation.total_filled()
        );

        if let Some(p) = progress {
            p.finish_with_message("Curation complete");
        }

        Ok(CurationOutcome {
            raw,
            cleaned,
            mean,
            report,
        })
    }
}

impl Default for CurationPipeline {
    fn default() -> Self {
        Self {
            threshold: CurationThreshold::default(),
            fill_with_column_mean: false,
            mean_label: MEAN_VALUE_LABEL.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Cadence, InterpolationMethod};
    use chrono::{Duration, NaiveDate};

    fn series(columns: Vec<Vec<Option<f64>>>) -> StationSeries {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(1, 0, 0)
            .unwrap();
        let n = columns[0].len();
        let stations = (0..columns.len()).map(|i| format!("S{}", i + 1)).collect();
        StationSeries::new(
            Cadence::Hourly,
            (0..n).map(|i| start + Duration::hours(i as i64)).collect(),
            stations,
            columns,
        )
        .unwrap()
    }

    #[test]
    fn test_pipeline_prunes_interpolates_and_averages() {
        // S3 is half missing and gets dropped; S1/S2 differences stay well
        // inside the outlier cut.
        let input = series(vec![
            vec![Some(10.0), None, Some(14.0), Some(16.0)],
            vec![Some(11.0), Some(13.0), Some(18.0), Some(15.0)],
            vec![None, None, Some(1.0), Some(1.0)],
        ]);
        let threshold = CurationThreshold::new(0.3, 4.0, 3, InterpolationMethod::Linear).unwrap();

        let outcome = CurationPipeline::new(threshold).unwrap().run(&input, None).unwrap();

        assert_eq!(outcome.raw.stations(), &["S1".to_string(), "S2".to_string()]);
        assert_eq!(outcome.cleaned.column("S1").unwrap()[1], Some(12.0));
        assert_eq!(outcome.mean.stations(), &[MEAN_VALUE_LABEL.to_string()]);
        assert_eq!(outcome.mean.columns()[0][1], Some(12.5));
        assert_eq!(outcome.report.sparse_columns.removed_count(), 1);
        assert_eq!(outcome.report.interpolation.total_filled(), 1);
        assert_eq!(outcome.report.missing_before, 3);
        assert_eq!(outcome.report.missing_after, 0);
        assert!(outcome.report.mean_fill.is_none());
        assert!(outcome.report.summary().contains("Values interpolated: 1"));
    }

    #[test]
    fn test_pipeline_optional_mean_fill() {
        // Leading gap is never interpolated; the mean fill picks it up.
        let input = series(vec![
            vec![None, Some(2.0), Some(4.0), Some(6.0)],
            vec![Some(1.0), Some(1.0), Some(1.0), Some(1.0)],
        ]);
        let threshold = CurationThreshold::new(0.5, 4.0, 3, InterpolationMethod::Linear).unwrap();

        let without = CurationPipeline::new(threshold)
            .unwrap()
            .run(&input, None)
            .unwrap();
        assert_eq!(without.cleaned.column("S1").unwrap()[0], None);

        let with = CurationPipeline::new(threshold)
            .unwrap()
            .with_column_mean_fill(true)
            .run(&input, None)
            .unwrap();
        assert_eq!(with.cleaned.column("S1").unwrap()[0], Some(4.0));
        assert_eq!(with.report.mean_fill.as_ref().unwrap().total_filled(), 1);
        assert_eq!(with.report.missing_after, 0);
    }

    #[test]
    fn test_pipeline_rejects_invalid_threshold() {
        let threshold = CurationThreshold {
            max_missing_fraction: 1.5,
            ..CurationThreshold::default()
        };
        assert!(CurationPipeline::new(threshold).is_err());
    }
}
