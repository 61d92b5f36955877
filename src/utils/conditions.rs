//! Free-text weather condition → ordinal categories.
//!
//! The feed's vocabulary is open-ended, so anything outside the tables maps
//! to `Unknown` instead of failing.

use crate::models::{CloudinessLevel, PrecipitationLevel};
use crate::utils::constants::WINDY_SUFFIX;

const CLOUDINESS_TABLE: &[(CloudinessLevel, &[&str])] = &[
    (CloudinessLevel::Fair, &["Fair"]),
    (
        CloudinessLevel::PartlyCloudy,
        &["Partly Cloudy", "Thunder in the Vicinity"],
    ),
    (
        CloudinessLevel::Cloudy,
        &[
            "Cloudy",
            "Light Rain",
            "Light Rain Shower",
            "Light Drizzle",
            "Light Snow Shower",
            "Rain",
            "Rain Shower",
            "Wintry Mix",
            "Light Rain with Thunder",
            "Light Snow",
            "Thunder",
            "T-Storm",
            "Drizzle",
            "Snow",
            "Heavy T-Storm",
            "Mostly Cloudy",
        ],
    ),
    (
        CloudinessLevel::Fog,
        &["Mist", "Fog", "Shallow Fog", "Patches of Fog", "Haze"],
    ),
];

const PRECIPITATION_TABLE: &[(PrecipitationLevel, &[&str])] = &[
    (
        PrecipitationLevel::Heavy,
        &["Rain", "Rain Shower", "Wintry Mix", "T-Storm", "Snow", "Heavy T-Storm"],
    ),
    (
        PrecipitationLevel::Light,
        &[
            "Light Rain",
            "Light Rain Shower",
            "Light Drizzle",
            "Light Snow Shower",
            "Light Rain with Thunder",
            "Light Snow",
            "Drizzle",
        ],
    ),
    (
        PrecipitationLevel::Absent,
        &[
            "Fair",
            "Partly Cloudy",
            "Thunder in the Vicinity",
            "Cloudy",
            "Mostly Cloudy",
            "Thunder",
            "Mist",
            "Fog",
            "Shallow Fog",
            "Patches of Fog",
            "Haze",
        ],
    ),
];

/// Strip surrounding whitespace and the trailing " / Windy" qualifier.
pub fn canonicalize_condition(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed.strip_suffix(WINDY_SUFFIX).unwrap_or(trimmed).trim_end()
}

fn lookup<T: Copy>(table: &[(T, &[&str])], condition: &str, fallback: T) -> T {
    let condition = canonicalize_condition(condition);
    table
        .iter()
        .find(|(_, names)| names.contains(&condition))
        .map(|(level, _)| *level)
        .unwrap_or(fallback)
}

pub fn cloudiness_level(condition: &str) -> CloudinessLevel {
    lookup(CLOUDINESS_TABLE, condition, CloudinessLevel::Unknown)
}

pub fn precipitation_level(condition: &str) -> PrecipitationLevel {
    lookup(PRECIPITATION_TABLE, condition, PrecipitationLevel::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_strips_windy() {
        assert_eq!(canonicalize_condition("Light Rain / Windy"), "Light Rain");
        assert_eq!(canonicalize_condition(" Fair "), "Fair");
        assert_eq!(canonicalize_condition("Windy"), "Windy");
    }

    #[test]
    fn test_cloudiness_mapping() {
        assert_eq!(cloudiness_level("Fair"), CloudinessLevel::Fair);
        assert_eq!(
            cloudiness_level("Thunder in the Vicinity"),
            CloudinessLevel::PartlyCloudy
        );
        assert_eq!(cloudiness_level("Mostly Cloudy / Windy"), CloudinessLevel::Cloudy);
        assert_eq!(cloudiness_level("Heavy T-Storm"), CloudinessLevel::Cloudy);
        assert_eq!(cloudiness_level("Haze"), CloudinessLevel::Fog);
        assert_eq!(cloudiness_level("Sandstorm"), CloudinessLevel::Unknown);
        // case-sensitive
        assert_eq!(cloudiness_level("fair"), CloudinessLevel::Unknown);
    }

    #[test]
    fn test_precipitation_mapping() {
        assert_eq!(precipitation_level("Snow"), PrecipitationLevel::Heavy);
        assert_eq!(precipitation_level("Drizzle"), PrecipitationLevel::Light);
        assert_eq!(precipitation_level("Light Snow / Windy"), PrecipitationLevel::Light);
        assert_eq!(precipitation_level("Thunder"), PrecipitationLevel::Absent);
        assert_eq!(precipitation_level("Patches of Fog"), PrecipitationLevel::Absent);
        assert_eq!(precipitation_level("Hail"), PrecipitationLevel::Unknown);
    }

    #[test]
    fn test_every_cloudiness_entry_has_precipitation() {
        for (_, names) in CLOUDINESS_TABLE {
            for name in *names {
                assert_ne!(
                    precipitation_level(name),
                    PrecipitationLevel::Unknown,
                    "{} has no precipitation level",
                    name
                );
            }
        }
    }
}
