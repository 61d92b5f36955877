use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::error::{ProcessingError, Result};
use crate::models::{CurationThreshold, ParameterSet};
use crate::utils::constants::{DEFAULT_ALIGNMENT_OFFSET_HOURS, DEFAULT_WEATHER_FILE_PREFIX};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherSettings {
    pub file_prefix: String,
    /// Hourly records before `range start + offset` are trimmed
    pub alignment_offset_hours: i64,
}

impl Default for WeatherSettings {
    fn default() -> Self {
        Self {
            file_prefix: DEFAULT_WEATHER_FILE_PREFIX.to_string(),
            alignment_offset_hours: DEFAULT_ALIGNMENT_OFFSET_HOURS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub thresholds: CurationThreshold,
    pub parameters: ParameterSet,
    pub fill_with_column_mean: bool,
    pub weather: WeatherSettings,
}

impl Settings {
    /// Layer an optional TOML file and `AIRQ__*` environment variables
    /// over the defaults, then validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            debug!("Loading settings from {}", path.display());
            builder = builder.add_source(File::from(path));
        }
        builder = builder.add_source(
            Environment::with_prefix("AIRQ")
                .prefix_separator("__")
                .separator("__"),
        );

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.check()?;
        Ok(settings)
    }

    pub fn check(&self) -> Result<()> {
        self.thresholds.check()?;
        if self.parameters.codes().is_empty() {
            return Err(ProcessingError::Config(
                "at least one parameter code must be configured".to_string(),
            ));
        }
        if self.weather.alignment_offset_hours < 0 {
            return Err(ProcessingError::Config(format!(
                "weather.alignment_offset_hours must not be negative, got {}",
                self.weather.alignment_offset_hours
            )));
        }
        Ok(())
    }
}
