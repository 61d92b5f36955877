/// Parameter codes accepted when no explicit set is configured
pub const DEFAULT_PARAMETERS: &[&str] = &[
    "C6H6", "CO", "NO", "NO2", "NOx", "O3", "PM10", "PM25", "SO2",
];

/// Cleaning defaults
pub const DEFAULT_MAX_MISSING_FRACTION: f64 = 0.06;
pub const DEFAULT_OUTLIER_STD_MULTIPLIER: f64 = 4.0;
pub const DEFAULT_MAX_GAP: usize = 3;

/// Raw weather feed
pub const DEFAULT_WEATHER_FILE_PREFIX: &str = "wunderground_";
pub const DEFAULT_ALIGNMENT_OFFSET_HOURS: i64 = 1;
pub const WINDY_SUFFIX: &str = " / Windy";
pub const RAW_TIME_FORMAT: &str = "%I:%M %p";

/// Raw weather columns
pub const COL_TIME: &str = "Time";
pub const COL_TEMPERATURE: &str = "Temperature";
pub const COL_WIND_SPEED: &str = "Wind Speed";
pub const COL_CONDITION: &str = "Condition";
pub const COL_PRESSURE: &str = "Pressure";

/// Station metadata columns
pub const COL_STATION_CODE: &str = "station_code";
pub const COL_STATION_NAME: &str = "station_name";
pub const COL_LATITUDE: &str = "latitude";
pub const COL_LONGITUDE: &str = "longitude";

/// Label of the cross-station aggregate column
pub const MEAN_VALUE_LABEL: &str = "Mean value";

/// Timestamp written to every CSV output
pub const OUTPUT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Processing defaults
pub const DEFAULT_BUFFER_SIZE: usize = 8192 * 16; // 128KB
