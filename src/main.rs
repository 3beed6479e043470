use std::path::PathBuf;
use std::process::ExitCode;

use agrotech::config::AgroTechConfig;
use agrotech::data_quality::{QualityReport, audit};
use agrotech::datasets::DatasetLoader;
use agrotech::weather::MAX_FORECAST_DAYS;
use agrotech::{
    AgroTechError, Dashboard, DecisionThresholds, Location, OpenMeteoClient, SimulatedSoilSensor,
    WeatherProvider, compare_costs, decide, logging,
};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(
    name = "agrotech",
    version,
    about = "AgroTech smart irrigation advisor: weather-aware irrigation decisions and pump energy costs"
)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true, env = "AGROTECH_CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Override the configured latitude
    #[arg(long, global = true, allow_hyphen_values = true)]
    latitude: Option<f64>,

    /// Override the configured longitude
    #[arg(long, global = true, allow_hyphen_values = true)]
    longitude: Option<f64>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Refresh the dashboard: weather, soil, decision and costs
    Status,
    /// Run the irrigation decision rule on given values
    Decide {
        /// Soil moisture in percent
        #[arg(long, allow_hyphen_values = true)]
        moisture: f64,
        /// Forecast rain in mm
        #[arg(long, allow_hyphen_values = true)]
        rain: f64,
        #[arg(long, allow_hyphen_values = true)]
        moisture_threshold: Option<f64>,
        #[arg(long, allow_hyphen_values = true)]
        rain_threshold: Option<f64>,
    },
    /// Compare conventional and smart pump energy costs
    Costs {
        /// Tariff CSV (path or URL); defaults to the configured source
        #[arg(long)]
        tariffs: Option<String>,
        /// Ignore any tariff table and use the default rates
        #[arg(long, conflicts_with = "tariffs")]
        no_tariffs: bool,
    },
    /// Daily rain forecast
    Forecast {
        #[arg(long, default_value_t = 7, value_parser = clap::value_parser!(u8).range(1..=i64::from(MAX_FORECAST_DAYS)))]
        days: u8,
    },
    /// Observed daily weather between two dates
    History {
        /// First day, YYYY-MM-DD
        #[arg(long)]
        start: NaiveDate,
        /// Last day, YYYY-MM-DD
        #[arg(long)]
        end: NaiveDate,
    },
    /// Audit the raw sensor history for implausible readings
    Audit {
        /// Sensor history CSV (path or URL); defaults to the configured source
        #[arg(long)]
        source: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let message = e
                .downcast_ref::<AgroTechError>()
                .map_or_else(|| format!("{e:#}"), AgroTechError::user_message);
            eprintln!("Error: {message}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = AgroTechConfig::load_from_path(cli.config.clone())?;
    logging::init(&config.logging, cli.verbose)?;

    if let Some(path) = &cli.config {
        debug!("Using config from: {}", path.display());
    }

    let location = resolve_location(&cli, &config)?;

    match cli.command.unwrap_or(Command::Status) {
        Command::Status => status(&config, location, cli.json).await,
        Command::Decide {
            moisture,
            rain,
            moisture_threshold,
            rain_threshold,
        } => {
            let defaults = config.irrigation.thresholds();
            let thresholds = DecisionThresholds {
                moisture_threshold: moisture_threshold.unwrap_or(defaults.moisture_threshold),
                rain_threshold: rain_threshold.unwrap_or(defaults.rain_threshold),
            };
            let decision = decide(moisture, rain, &thresholds)?;
            emit(cli.json, &decision, || decision.to_string())
        }
        Command::Costs {
            tariffs,
            no_tariffs,
        } => {
            let loader = DatasetLoader::new(config.weather.timeout())?;
            let source = if no_tariffs {
                None
            } else {
                tariffs.or_else(|| config.datasets.tariffs.clone())
            };
            let table = loader.load_tariffs(source.as_deref()).await;
            let comparison = compare_costs(table.as_ref(), &config.costs.assumptions());
            emit(cli.json, &comparison, || {
                format!("💰 Energy cost comparison\n{comparison}")
            })
        }
        Command::Forecast { days } => {
            let client = OpenMeteoClient::from_config(&config)?;
            let forecast = client
                .fetch_forecast(location.latitude, location.longitude, days)
                .await;
            let rain_threshold = config.irrigation.rain_threshold;
            emit(cli.json, &forecast, || {
                if forecast.is_empty() {
                    return "No forecast available right now.".to_string();
                }
                let mut out = format!("🌧️ Rain forecast for {}\n", location.name);
                for day in &forecast {
                    let marker = if day.rain_mm >= rain_threshold {
                        "  (enough rain to skip irrigation)"
                    } else {
                        ""
                    };
                    out.push_str(&format!(
                        "   {}  {:>6.1} mm  {:>3}%{}\n",
                        day.date, day.rain_mm, day.rain_probability_pct, marker
                    ));
                }
                out
            })
        }
        Command::History { start, end } => {
            if start > end {
                return Err(AgroTechError::validation(format!(
                    "start date {start} is after end date {end}"
                ))
                .into());
            }
            let client = OpenMeteoClient::from_config(&config)?;
            let history = client
                .fetch_history(location.latitude, location.longitude, start, end)
                .await;
            emit(cli.json, &history, || {
                if history.is_empty() {
                    return "No history available for that period.".to_string();
                }
                let mut out = format!("📈 Weather history for {}\n", location.name);
                for day in &history {
                    out.push_str(&format!(
                        "   {}  {:>5.1}°C  {:>6.1} mm\n",
                        day.date, day.temp_max_c, day.rain_mm
                    ));
                }
                let total_rain: f64 = history.iter().map(|d| d.rain_mm).sum();
                #[allow(clippy::cast_precision_loss)]
                let mean_max =
                    history.iter().map(|d| d.temp_max_c).sum::<f64>() / history.len() as f64;
                out.push_str(&format!(
                    "   Total rain {total_rain:.1} mm, mean max temperature {mean_max:.1}°C\n"
                ));
                out
            })
        }
        Command::Audit { source } => {
            let loader = DatasetLoader::new(config.weather.timeout())?;
            let source = source.or_else(|| config.datasets.sensor_history.clone());
            match loader.load_sensor_history(source.as_deref()).await {
                Some(history) => {
                    let report = audit(&history, config.datasets.max_plausible_temp_c);
                    emit(cli.json, &report, || {
                        format!("🕵️ Sensor history audit\n{report}")
                    })
                }
                None => emit(cli.json, &None::<QualityReport>, || {
                    "No sensor history available.".to_string()
                }),
            }
        }
    }
}

async fn status(config: &AgroTechConfig, location: Location, json: bool) -> Result<()> {
    let client = OpenMeteoClient::from_config(config)?;
    let sensor = SimulatedSoilSensor::new(config.sensor.moisture_min, config.sensor.moisture_max)?;
    let loader = DatasetLoader::new(config.weather.timeout())?;
    let tariffs = loader.load_tariffs(config.datasets.tariffs.as_deref()).await;

    let dashboard = Dashboard::new(
        client,
        sensor,
        location,
        config.irrigation.thresholds(),
        config.costs.assumptions(),
    );
    let snapshot = dashboard.refresh(tariffs.as_ref()).await?;
    emit(json, &snapshot, || snapshot.to_string())
}

fn resolve_location(cli: &Cli, config: &AgroTechConfig) -> Result<Location> {
    match (cli.latitude, cli.longitude) {
        (None, None) => Ok(config.location.to_location()),
        (Some(latitude), Some(longitude)) => {
            if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
                return Err(AgroTechError::validation(format!(
                    "coordinates out of range: {latitude}, {longitude}"
                ))
                .into());
            }
            Ok(Location::from_coordinates(latitude, longitude))
        }
        _ => Err(AgroTechError::validation("--latitude and --longitude must be given together").into()),
    }
}

fn emit<T: Serialize>(json: bool, value: &T, render: impl FnOnce() -> String) -> Result<()> {
    if json {
        let text = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
        println!("{text}");
    } else {
        print!("{}", render());
        println!();
    }
    Ok(())
}
