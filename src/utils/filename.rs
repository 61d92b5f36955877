use chrono::{Datelike, Local, NaiveDate};
use std::path::{Path, PathBuf};

/// Default dataset output: output/airq-{parameter}-{YYMMDD}.csv
pub fn generate_default_dataset_filename(parameter: &str) -> PathBuf {
    let now = Local::now();
    let year = now.year() % 100; // Get last 2 digits of year
    let filename = format!(
        "airq-{}-{:02}{:02}{:02}.csv",
        parameter,
        year,
        now.month(),
        now.day()
    );
    PathBuf::from("output").join(filename)
}

/// Raw weather dump for one day: {dir}/{prefix}{YYYY-MM-DD}.csv
pub fn daily_weather_path(dir: &Path, prefix: &str, date: NaiveDate) -> PathBuf {
    dir.join(format!("{}{}.csv", prefix, date.format("%Y-%m-%d")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_default_dataset_filename() {
        let filename = generate_default_dataset_filename("PM10");
        let filename_str = filename.to_string_lossy();

        assert!(filename_str.starts_with("output/"));
        assert!(filename_str.ends_with(".csv"));

        let parts: Vec<&str> = filename_str.split('/').collect();
        assert_eq!(parts.len(), 2);
        assert!(parts[1].starts_with("airq-PM10-"));
    }

    #[test]
    fn test_daily_weather_path() {
        let date = NaiveDate::from_ymd_opt(2020, 2, 29).unwrap();
        let path = daily_weather_path(Path::new("data/weather"), "wunderground_", date);
        assert_eq!(path, PathBuf::from("data/weather/wunderground_2020-02-29.csv"));
    }
}
