use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::models::Cadence;

#[derive(Parser)]
#[command(name = "airq-processor")]
#[command(about = "Air-quality and weather time-series curation")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Settings file (TOML)")]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Hide progress bars")]
    pub quiet: bool,

    #[arg(long, global = true, default_value_t = num_cpus::get())]
    pub max_workers: usize,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Clean one parameter's station series and write the melted dataset
    Clean {
        #[arg(short, long, help = "Wide input table: timestamp plus one column per station")]
        input: PathBuf,

        #[arg(short, long, help = "Parameter code, e.g. PM10")]
        parameter: String,

        #[arg(
            short,
            long,
            help = "Output dataset path [default: output/airq-{parameter}-{YYMMDD}.csv]"
        )]
        output: Option<PathBuf>,

        #[arg(long, help = "Station metadata to join onto the dataset")]
        stations: Option<PathBuf>,

        #[arg(long, help = "Write the cross-station mean series here")]
        mean_output: Option<PathBuf>,

        #[arg(long, help = "Write the cleaning report as JSON here")]
        report: Option<PathBuf>,

        #[command(flatten)]
        table: TableArgs,
    },

    /// Build the hourly weather series from per-day raw dumps
    CurateWeather {
        #[arg(short, long, help = "Directory holding the daily files")]
        input_dir: PathBuf,

        #[arg(long, help = "First day (YYYY-MM-DD)")]
        start: NaiveDate,

        #[arg(long, help = "Last day, inclusive (YYYY-MM-DD)")]
        end: NaiveDate,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Outer-join a pollution series with curated weather
    Combine {
        #[arg(long, help = "Wide pollution table, e.g. a mean series")]
        pollution: PathBuf,

        #[arg(long, help = "Curated hourly weather")]
        weather: PathBuf,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Merge hourly and daily tables of one parameter into long-form readings
    MergeCadence {
        #[arg(long)]
        hourly: PathBuf,

        #[arg(long)]
        daily: PathBuf,

        #[arg(short, long)]
        parameter: String,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Per-station and per-day statistics of a wide table
    Summary {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(long, help = "Include per-day statistics")]
        detailed: bool,

        #[command(flatten)]
        table: TableArgs,
    },
}

/// Layout options of a wide input table.
#[derive(clap::Args, Clone)]
pub struct TableArgs {
    #[arg(long, default_value_t = ',')]
    pub delimiter: char,

    #[arg(long, default_value_t = 0, help = "Lines to skip before the header")]
    pub skip_rows: usize,

    #[arg(long, help = "Timestamp column name [default: first column]")]
    pub timestamp_column: Option<String>,

    #[arg(
        long,
        default_value_t = 0,
        allow_hyphen_values = true,
        help = "Hours added to every timestamp"
    )]
    pub timestamp_offset_hours: i64,

    #[arg(long, value_parser = parse_cadence, help = "hourly or daily [default: inferred]")]
    pub cadence: Option<Cadence>,
}

fn parse_cadence(s: &str) -> Result<Cadence, String> {
    match s.to_lowercase().as_str() {
        "hourly" | "1h" => Ok(Cadence::Hourly),
        "daily" | "24h" | "1d" => Ok(Cadence::Daily),
        other => Err(format!("unsupported cadence '{}'", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_clean_command() {
        let cli = Cli::try_parse_from([
            "airq-processor",
            "clean",
            "--input",
            "pm10.csv",
            "--parameter",
            "PM10",
            "--delimiter",
            ";",
            "--timestamp-offset-hours",
            "-1",
            "--cadence",
            "1h",
        ])
        .unwrap();

        match cli.command {
            Commands::Clean {
                parameter, table, ..
            } => {
                assert_eq!(parameter, "PM10");
                assert_eq!(table.delimiter, ';');
                assert_eq!(table.timestamp_offset_hours, -1);
                assert_eq!(table.cadence, Some(Cadence::Hourly));
            }
            _ => panic!("expected clean"),
        }
    }

    #[test]
    fn test_parse_curate_weather_dates() {
        let cli = Cli::try_parse_from([
            "airq-processor",
            "curate-weather",
            "--input-dir",
            "data/weather",
            "--start",
            "2020-01-01",
            "--end",
            "2020-12-31",
            "--output",
            "weather.csv",
        ])
        .unwrap();

        assert!(matches!(cli.command, Commands::CurateWeather { .. }));
        assert!(parse_cadence("weekly").is_err());
    }
}
