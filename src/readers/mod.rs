pub mod series_reader;
pub mod station_reader;
pub mod text;
pub mod weather_reader;

pub use series_reader::{SeriesReadReport, SeriesReader};
pub use station_reader::StationReader;
pub use weather_reader::WeatherReader;
