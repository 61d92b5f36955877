pub mod cleaning_report;
pub mod data_merger;
pub mod pipeline;
pub mod series_cleaner;
pub mod weather_curator;

pub use cleaning_report::{
    CleaningReport, InterpolationReport, MeanFillReport, OutlierReport, RemovedColumn,
    SparseColumnReport, StationCount,
};
pub use data_merger::DatasetAssembler;
pub use pipeline::{CurationOutcome, CurationPipeline};
pub use series_cleaner::SeriesCleaner;
pub use weather_curator::{DailyWeatherSource, WeatherCurationReport, WeatherCurator};
