use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct StationMetadata {
    #[validate(length(min = 1))]
    pub station_code: String,

    #[validate(length(min = 1))]
    pub station_name: String,

    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,

    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
}

impl StationMetadata {
    pub fn new(station_code: String, station_name: String, latitude: f64, longitude: f64) -> Self {
        Self {
            station_code,
            station_name,
            latitude,
            longitude,
        }
    }
}
