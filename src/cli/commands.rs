use chrono::Duration;
use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use tracing::{info, Level};

use crate::analyzers::SeriesAnalyzer;
use crate::cli::args::{Cli, Commands, TableArgs};
use crate::error::{ProcessingError, Result};
use crate::models::{Cadence, DateRange, StationSeries};
use crate::processors::{CurationPipeline, DatasetAssembler, WeatherCurator};
use crate::readers::{SeriesReader, StationReader, WeatherReader};
use crate::utils::filename::generate_default_dataset_filename;
use crate::utils::progress::ProgressReporter;
use crate::utils::settings::Settings;
use crate::writers::CsvWriter;

pub fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbose, cli.log_file.as_deref())?;

    rayon::ThreadPoolBuilder::new()
        .num_threads(cli.max_workers.max(1))
        .build_global()
        .map_err(|e| ProcessingError::Config(e.to_string()))?;

    let settings = Settings::load(cli.config.as_deref())?;
    let quiet = cli.quiet;

    match cli.command {
        Commands::Clean {
            input,
            parameter,
            output,
            stations,
            mean_output,
            report,
            table,
        } => {
            settings.parameters.validate_code(&parameter)?;
            let output = output.unwrap_or_else(|| generate_default_dataset_filename(&parameter));

            println!("Cleaning {} series...", parameter);
            println!("Input file: {}", input.display());
            println!("Output file: {}", output.display());

            let (series, read_report) = series_reader(&table)?.read_series(&input)?;
            if !read_report.issues.is_empty() {
                println!(
                    "Skipped {} row(s), {} unparseable value(s)",
                    read_report.rows_skipped,
                    read_report.issues.len() - read_report.rows_skipped
                );
            }

            let progress = ProgressReporter::new_spinner("Curating series...", quiet);
            let pipeline = CurationPipeline::new(settings.thresholds)?
                .with_column_mean_fill(settings.fill_with_column_mean);
            let outcome = pipeline.run(&series, Some(&progress))?;

            println!("\n{}", outcome.report.summary());

            let assembler = DatasetAssembler::new();
            let records = assembler.melt_raw_and_filled(&outcome.raw, &outcome.cleaned)?;
            let writer = CsvWriter::new();

            match stations {
                Some(path) => {
                    let (metadata, issues) = StationReader::new().read_stations(&path)?;
                    if !issues.is_empty() {
                        println!("Skipped {} station metadata row(s)", issues.len());
                    }
                    let enriched = assembler.merge_station_metadata(&records, &metadata);
                    writer.write_enriched(&enriched, &output)?;
                }
                None => writer.write_dataset(&records, &output)?,
            }

            if let Some(path) = mean_output {
                writer.write_series(&outcome.mean, &path)?;
            }

            if let Some(path) = report {
                write_json_report(&outcome.report, &path)?;
            }

            println!("Processing complete!");
        }

        Commands::CurateWeather {
            input_dir,
            start,
            end,
            output,
        } => {
            let range = DateRange::new(start, end)?;
            println!(
                "Curating weather for {} to {} ({} days)",
                range.start(),
                range.end(),
                range.day_count()
            );

            let reader = WeatherReader::new(input_dir).with_file_prefix(&settings.weather.file_prefix);
            let curator = WeatherCurator::with_alignment_offset(Duration::hours(
                settings.weather.alignment_offset_hours,
            ))?;

            let progress = ProgressReporter::new(range.day_count() as u64, "Reading daily files...", quiet);
            let (series, report) = curator.build_hourly_series(&reader, &range, Some(&progress))?;
            progress.finish_with_message(&format!("Read {} days", report.days_read));

            println!("\n{}", report.summary());
            CsvWriter::new().write_weather(&series, &output)?;
            println!("Wrote {} hourly records to {}", series.len(), output.display());
        }

        Commands::Combine {
            pollution,
            weather,
            output,
        } => {
            let (series, _) = SeriesReader::new().read_series(&pollution)?;
            let writer = CsvWriter::new();
            let weather = writer.read_weather(&weather)?;

            let table = DatasetAssembler::new().merge_weather_and_pollution(&series, &weather);
            writer.write_combined(&table, &output)?;

            println!(
                "Wrote {} rows ({} with both pollution and weather) to {}",
                table.len(),
                table.rows_with_both(),
                output.display()
            );
        }

        Commands::MergeCadence {
            hourly,
            daily,
            parameter,
            output,
        } => {
            settings.parameters.validate_code(&parameter)?;

            let hourly = read_with_cadence(&hourly, Cadence::Hourly)?;
            let daily = read_with_cadence(&daily, Cadence::Daily)?;

            let readings =
                DatasetAssembler::new().merge_multi_cadence_stations(&hourly, &daily, &parameter)?;
            CsvWriter::new().write_readings(&readings, &output)?;

            println!("Wrote {} readings to {}", readings.len(), output.display());
        }

        Commands::Summary {
            input,
            detailed,
            table,
        } => {
            println!("Analyzing {}", input.display());

            let (series, _) = series_reader(&table)?.read_series(&input)?;
            let stats = SeriesAnalyzer::new().analyze(&series)?;

            if detailed {
                println!("\n{}", stats.detailed_summary());
            } else {
                println!("\n{}", stats.summary());
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let builder = tracing_subscriber::fmt().with_max_level(level);

    let installed = match log_file {
        Some(path) => {
            let file = File::create(path)?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    };

    installed.map_err(|e| ProcessingError::Config(format!("cannot install logger: {}", e)))?;
    if verbose {
        info!("Verbose logging enabled");
    }
    Ok(())
}

fn series_reader(table: &TableArgs) -> Result<SeriesReader> {
    if !table.delimiter.is_ascii() {
        return Err(ProcessingError::Config(format!(
            "delimiter must be a single ASCII character, got '{}'",
            table.delimiter
        )));
    }

    let mut reader = SeriesReader::new()
        .with_delimiter(table.delimiter as u8)
        .with_skip_rows(table.skip_rows)
        .with_timestamp_offset(Duration::hours(table.timestamp_offset_hours));
    if let Some(column) = &table.timestamp_column {
        reader = reader.with_timestamp_column(column);
    }
    if let Some(cadence) = table.cadence {
        reader = reader.with_cadence(cadence);
    }
    Ok(reader)
}

fn read_with_cadence(path: &Path, cadence: Cadence) -> Result<StationSeries> {
    let (series, _) = SeriesReader::new().with_cadence(cadence).read_series(path)?;
    Ok(series)
}

fn write_json_report<T: serde::Serialize>(report: &T, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, report)?;
    Ok(())
}
