use serde::Serialize;

use crate::models::InterpolationMethod;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationCount {
    pub station: String,
    pub count: usize,
}

impl StationCount {
    pub fn new(station: impl Into<String>, count: usize) -> Self {
        Self {
            station: station.into(),
            count,
        }
    }
}

fn total(counts: &[StationCount]) -> usize {
    counts.iter().map(|c| c.count).sum()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemovedColumn {
    pub station: String,
    pub missing_fraction: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SparseColumnReport {
    pub threshold: f64,
    pub total_columns: usize,
    pub removed: Vec<RemovedColumn>,
}

impl SparseColumnReport {
    pub fn removed_count(&self) -> usize {
        self.removed.len()
    }

    pub fn kept_count(&self) -> usize {
        self.total_columns - self.removed.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlierReport {
    pub std_multiplier: f64,
    /// Spread of adjacent-station differences in the first pass
    pub initial_sigma: Option<f64>,
    /// Cut applied by the final (fixed-point) pass
    pub final_cut: Option<f64>,
    pub passes: usize,
    pub removed: Vec<StationCount>,
}

impl OutlierReport {
    pub fn total_removed(&self) -> usize {
        total(&self.removed)
    }

    pub fn initial_cut(&self) -> Option<f64> {
        self.initial_sigma.map(|s| s * self.std_multiplier)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterpolationReport {
    pub method: InterpolationMethod,
    pub max_gap: usize,
    pub filled: Vec<StationCount>,
    /// Gaps left alone: longer than `max_gap` or touching a series edge
    pub skipped_gaps: usize,
}

impl InterpolationReport {
    pub fn total_filled(&self) -> usize {
        total(&self.filled)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeanFillReport {
    pub filled: Vec<StationCount>,
}

impl MeanFillReport {
    pub fn total_filled(&self) -> usize {
        total(&self.filled)
    }
}

/// Provenance of one pipeline run: every correction, with counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleaningReport {
    pub rows: usize,
    pub missing_before: usize,
    pub missing_after: usize,
    pub sparse_columns: SparseColumnReport,
    pub outliers: OutlierReport,
    pub interpolation: InterpolationReport,
    pub mean_fill: Option<MeanFillReport>,
}

impl CleaningReport {
    pub fn summary(&self) -> String {
        let mut summary = String::new();

        summary.push_str("=== Cleaning Report ===\n");
        summary.push_str(&format!("Rows: {}\n", self.rows));
        summary.push_str(&format!(
            "Columns: {} out of {} left (missing-fraction cutoff {:.3})\n",
            self.sparse_columns.kept_count(),
            self.sparse_columns.total_columns,
            self.sparse_columns.threshold
        ));
        for column in &self.sparse_columns.removed {
            summary.push_str(&format!(
                "  dropped {} ({:.1}% missing)\n",
                column.station,
                100.0 * column.missing_fraction
            ));
        }

        match self.outliers.final_cut {
            Some(cut) => summary.push_str(&format!(
                "\nOutliers removed: {} (cut {:.3} = {} x sigma, {} pass(es))\n",
                self.outliers.total_removed(),
                cut,
                self.outliers.std_multiplier,
                self.outliers.passes
            )),
            None => summary.push_str(
                "\nOutliers removed: 0 (too few paired readings to estimate spread)\n",
            ),
        }
        for count in self.outliers.removed.iter().filter(|c| c.count > 0) {
            summary.push_str(&format!("  {}: {}\n", count.station, count.count));
        }

        summary.push_str(&format!(
            "\nValues interpolated: {} ({}, gaps up to {}; {} gap(s) left open)\n",
            self.interpolation.total_filled(),
            self.interpolation.method,
            self.interpolation.max_gap,
            self.interpolation.skipped_gaps
        ));
        for count in self.interpolation.filled.iter().filter(|c| c.count > 0) {
            summary.push_str(&format!("  {}: {}\n", count.station, count.count));
        }

        if let Some(mean_fill) = &self.mean_fill {
            summary.push_str(&format!(
                "\nValues filled with column mean: {}\n",
                mean_fill.total_filled()
            ));
        }

        summary.push_str(&format!(
            "\nMissing values: {} before, {} after\n",
            self.missing_before, self.missing_after
        ));

        summary
    }
}
