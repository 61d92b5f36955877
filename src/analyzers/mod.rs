pub mod series_analyzer;

pub use series_analyzer::{DailyStatistics, SeriesAnalyzer, SeriesStatistics, StationStatistics};
