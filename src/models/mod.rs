pub mod dataset;
pub mod series;
pub mod station;
pub mod threshold;
pub mod weather;

pub use dataset::{CombinedRow, CombinedTable, DatasetRecord, EnrichedRecord, Reading};
pub use series::{Cadence, StationSeries};
pub use station::StationMetadata;
pub use threshold::{CurationThreshold, InterpolationMethod, ParameterSet};
pub use weather::{
    CloudinessLevel, DateRange, Observation, PrecipitationLevel, RawObservation, WeatherRecord, WeatherSeries,
};
