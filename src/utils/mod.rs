pub mod conditions;
pub mod constants;
pub mod filename;
pub mod progress;
pub mod settings;
pub mod timestamps;
pub mod units;

pub use conditions::{canonicalize_condition, cloudiness_level, precipitation_level};
pub use constants::*;
pub use filename::{daily_weather_path, generate_default_dataset_filename};
pub use progress::ProgressReporter;
pub use settings::{Settings, WeatherSettings};
pub use timestamps::{combine_date_and_clock, format_timestamp, parse_timestamp, timestamp_format};
pub use units::{fahrenheit_to_celsius, inhg_to_hpa, mph_to_kph};
