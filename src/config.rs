//! Configuration management for the `AgroTech` advisor
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings. Every value
//! the decision rule and the cost model depend on lives here, so callers
//! pass an explicit record instead of reaching for module constants.

use crate::AgroTechError;
use crate::costs::CostAssumptions;
use crate::irrigation::DecisionThresholds;
use crate::models::Location;
use anyhow::{Context, Result};
use ::config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure for the `AgroTech` application
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgroTechConfig {
    /// Farm location used for weather lookups
    #[serde(default)]
    pub location: LocationConfig,
    /// Weather API configuration
    #[serde(default)]
    pub weather: WeatherConfig,
    /// Irrigation decision thresholds
    #[serde(default)]
    pub irrigation: IrrigationConfig,
    /// Pump and tariff assumptions for the cost comparison
    #[serde(default)]
    pub costs: CostsConfig,
    /// Simulated soil sensor range
    #[serde(default)]
    pub sensor: SensorConfig,
    /// Optional CSV inputs
    #[serde(default)]
    pub datasets: DatasetsConfig,
    /// Cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Farm location settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    #[serde(default = "default_latitude")]
    pub latitude: f64,
    #[serde(default = "default_longitude")]
    pub longitude: f64,
    #[serde(default = "default_location_name")]
    pub name: String,
}

/// Weather API configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Base URL of the forecast API
    #[serde(default = "default_forecast_base_url")]
    pub forecast_base_url: String,
    /// Base URL of the historical archive API
    #[serde(default = "default_archive_base_url")]
    pub archive_base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_weather_timeout")]
    pub timeout_seconds: u32,
    /// IANA timezone used for hourly and daily aggregation
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

/// Irrigation decision thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrrigationConfig {
    /// Soil moisture (%) at or above which no irrigation is needed
    #[serde(default = "default_moisture_threshold")]
    pub moisture_threshold: f64,
    /// Forecast rain (mm) at or above which irrigation is suspended
    #[serde(default = "default_rain_threshold")]
    pub rain_threshold: f64,
}

/// Pump and tariff assumptions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostsConfig {
    #[serde(default = "default_pump_kw")]
    pub pump_kw: f64,
    #[serde(default = "default_pump_hours")]
    pub conventional_hours_per_day: f64,
    #[serde(default = "default_pump_hours")]
    pub smart_hours_per_day: f64,
    /// Fraction of days the smart system actually runs the pump
    #[serde(default = "default_smart_duty_fraction")]
    pub smart_duty_fraction: f64,
    #[serde(default = "default_days_per_month")]
    pub days_per_month: u32,
    /// Peak rate used when the tariff table has no usable peak rows
    #[serde(default = "default_peak_rate")]
    pub default_peak_rate: f64,
    /// Off-peak rate used when the tariff table has no usable off-peak rows
    #[serde(default = "default_offpeak_rate")]
    pub default_offpeak_rate: f64,
}

/// Simulated soil sensor range
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    #[serde(default = "default_moisture_min")]
    pub moisture_min: f64,
    #[serde(default = "default_moisture_max")]
    pub moisture_max: f64,
}

/// Optional CSV inputs, given as a local path or an http(s) URL
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetsConfig {
    /// Tariff table with `posto` and `valor` columns
    #[serde(default = "default_tariffs_source")]
    pub tariffs: Option<String>,
    /// Raw sensor history with `timestamp` and `temp_ambiente` columns
    #[serde(default = "default_sensor_history_source")]
    pub sensor_history: Option<String>,
    /// Ambient temperatures above this value are flagged as anomalies
    #[serde(default = "default_max_plausible_temp")]
    pub max_plausible_temp_c: f64,
}

/// Cache configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    /// Cache directory location
    #[serde(default = "default_cache_location")]
    pub location: String,
    /// Forecast TTL in hours
    #[serde(default = "default_forecast_ttl")]
    pub forecast_ttl_hours: u32,
    /// History TTL in hours
    #[serde(default = "default_history_ttl")]
    pub history_ttl_hours: u32,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

const DATASET_BASE_URL: &str = "https://raw.githubusercontent.com/ChiaviniK/agrogencase/main";

// Default value functions
fn default_latitude() -> f64 {
    -22.9519
}

fn default_longitude() -> f64 {
    -43.2105
}

fn default_location_name() -> String {
    "Rio de Janeiro - Cristo Redentor".to_string()
}

fn default_forecast_base_url() -> String {
    "https://api.open-meteo.com/v1".to_string()
}

fn default_archive_base_url() -> String {
    "https://archive-api.open-meteo.com/v1".to_string()
}

fn default_weather_timeout() -> u32 {
    5
}

fn default_timezone() -> String {
    "America/Sao_Paulo".to_string()
}

fn default_moisture_threshold() -> f64 {
    60.0
}

fn default_rain_threshold() -> f64 {
    5.0
}

fn default_pump_kw() -> f64 {
    15.0
}

fn default_pump_hours() -> f64 {
    2.0
}

fn default_smart_duty_fraction() -> f64 {
    0.6
}

fn default_days_per_month() -> u32 {
    30
}

fn default_peak_rate() -> f64 {
    1.85
}

fn default_offpeak_rate() -> f64 {
    0.65
}

fn default_moisture_min() -> f64 {
    30.0
}

fn default_moisture_max() -> f64 {
    80.0
}

fn default_tariffs_source() -> Option<String> {
    Some(format!("{DATASET_BASE_URL}/tarifas_energia.csv"))
}

fn default_sensor_history_source() -> Option<String> {
    Some(format!("{DATASET_BASE_URL}/historico_leituras_sujo.csv"))
}

fn default_max_plausible_temp() -> f64 {
    100.0
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_location() -> String {
    dirs::cache_dir()
        .map(|dir| dir.join("agrotech"))
        .unwrap_or_else(|| PathBuf::from(".agrotech-cache"))
        .to_string_lossy()
        .into_owned()
}

fn default_forecast_ttl() -> u32 {
    1
}

fn default_history_ttl() -> u32 {
    24
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            latitude: default_latitude(),
            longitude: default_longitude(),
            name: default_location_name(),
        }
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            forecast_base_url: default_forecast_base_url(),
            archive_base_url: default_archive_base_url(),
            timeout_seconds: default_weather_timeout(),
            timezone: default_timezone(),
        }
    }
}

impl Default for IrrigationConfig {
    fn default() -> Self {
        Self {
            moisture_threshold: default_moisture_threshold(),
            rain_threshold: default_rain_threshold(),
        }
    }
}

impl Default for CostsConfig {
    fn default() -> Self {
        Self {
            pump_kw: default_pump_kw(),
            conventional_hours_per_day: default_pump_hours(),
            smart_hours_per_day: default_pump_hours(),
            smart_duty_fraction: default_smart_duty_fraction(),
            days_per_month: default_days_per_month(),
            default_peak_rate: default_peak_rate(),
            default_offpeak_rate: default_offpeak_rate(),
        }
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            moisture_min: default_moisture_min(),
            moisture_max: default_moisture_max(),
        }
    }
}

impl Default for DatasetsConfig {
    fn default() -> Self {
        Self {
            tariffs: default_tariffs_source(),
            sensor_history: default_sensor_history_source(),
            max_plausible_temp_c: default_max_plausible_temp(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            location: default_cache_location(),
            forecast_ttl_hours: default_forecast_ttl(),
            history_ttl_hours: default_history_ttl(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl IrrigationConfig {
    #[must_use]
    pub fn thresholds(&self) -> DecisionThresholds {
        DecisionThresholds {
            moisture_threshold: self.moisture_threshold,
            rain_threshold: self.rain_threshold,
        }
    }
}

impl CostsConfig {
    #[must_use]
    pub fn assumptions(&self) -> CostAssumptions {
        CostAssumptions {
            pump_kw: self.pump_kw,
            conventional_hours_per_day: self.conventional_hours_per_day,
            smart_hours_per_day: self.smart_hours_per_day,
            smart_duty_fraction: self.smart_duty_fraction,
            days_per_month: self.days_per_month,
            default_peak_rate: self.default_peak_rate,
            default_offpeak_rate: self.default_offpeak_rate,
        }
    }
}

impl LocationConfig {
    #[must_use]
    pub fn to_location(&self) -> Location {
        Location::new(self.latitude, self.longitude, self.name.clone())
    }
}

impl WeatherConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.into())
    }
}

impl CacheConfig {
    #[must_use]
    pub fn forecast_ttl(&self) -> Duration {
        Duration::from_secs(u64::from(self.forecast_ttl_hours) * 60 * 60)
    }

    #[must_use]
    pub fn history_ttl(&self) -> Duration {
        Duration::from_secs(u64::from(self.history_ttl_hours) * 60 * 60)
    }
}

impl AgroTechConfig {
    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        Self::load_with_environment(config_path, Self::environment())
    }

    // AGROTECH_IRRIGATION__MOISTURE_THRESHOLD=55 style overrides
    fn environment() -> Environment {
        Environment::with_prefix("AGROTECH")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    fn load_with_environment(
        config_path: Option<PathBuf>,
        environment: Environment,
    ) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(FileFormat::Toml),
            );
        }

        builder = builder.add_source(environment);

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: AgroTechConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("agrotech").join("config.toml"))
    }

    /// Apply default values to empty configuration fields
    pub fn apply_defaults(&mut self) {
        if self.weather.forecast_base_url.is_empty() {
            self.weather.forecast_base_url = default_forecast_base_url();
        }
        if self.weather.archive_base_url.is_empty() {
            self.weather.archive_base_url = default_archive_base_url();
        }
        if self.weather.timeout_seconds == 0 {
            self.weather.timeout_seconds = default_weather_timeout();
        }
        if self.weather.timezone.is_empty() {
            self.weather.timezone = default_timezone();
        }
        if self.costs.days_per_month == 0 {
            self.costs.days_per_month = default_days_per_month();
        }
        if self.cache.location.is_empty() {
            self.cache.location = default_cache_location();
        }
        if self.cache.forecast_ttl_hours == 0 {
            self.cache.forecast_ttl_hours = default_forecast_ttl();
        }
        if self.cache.history_ttl_hours == 0 {
            self.cache.history_ttl_hours = default_history_ttl();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
        // An empty string in a config file means "no dataset"
        if self.datasets.tariffs.as_deref().is_some_and(str::is_empty) {
            self.datasets.tariffs = None;
        }
        if self
            .datasets
            .sensor_history
            .as_deref()
            .is_some_and(str::is_empty)
        {
            self.datasets.sensor_history = None;
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_location()?;
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    fn validate_location(&self) -> Result<()> {
        if !(-90.0..=90.0).contains(&self.location.latitude) {
            return Err(AgroTechError::config("Latitude must be between -90 and 90").into());
        }
        if !(-180.0..=180.0).contains(&self.location.longitude) {
            return Err(AgroTechError::config("Longitude must be between -180 and 180").into());
        }
        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.weather.timeout_seconds > 60 {
            return Err(
                AgroTechError::config("Weather API timeout cannot exceed 60 seconds").into(),
            );
        }

        self.irrigation
            .thresholds()
            .validate()
            .map_err(|e| match e {
                AgroTechError::Validation { message } => AgroTechError::config(message),
                other => other,
            })?;

        if !(self.costs.pump_kw > 0.0 && self.costs.pump_kw.is_finite()) {
            return Err(AgroTechError::config("Pump power must be a positive number").into());
        }

        if !(0.0..=24.0).contains(&self.costs.conventional_hours_per_day)
            || !(0.0..=24.0).contains(&self.costs.smart_hours_per_day)
        {
            return Err(
                AgroTechError::config("Pump hours per day must be between 0 and 24").into(),
            );
        }

        if !(0.0..=1.0).contains(&self.costs.smart_duty_fraction) {
            return Err(
                AgroTechError::config("Smart duty fraction must be between 0 and 1").into(),
            );
        }

        if self.costs.days_per_month > 31 {
            return Err(AgroTechError::config("Days per month cannot exceed 31").into());
        }

        for rate in [self.costs.default_peak_rate, self.costs.default_offpeak_rate] {
            if !(rate.is_finite() && rate >= 0.0) {
                return Err(AgroTechError::config(
                    "Default tariff rates must be finite non-negative numbers",
                )
                .into());
            }
        }

        let percent = 0.0..=100.0;
        if !percent.contains(&self.sensor.moisture_min)
            || !percent.contains(&self.sensor.moisture_max)
            || self.sensor.moisture_min >= self.sensor.moisture_max
        {
            return Err(AgroTechError::config(
                "Sensor moisture range must satisfy 0 <= min < max <= 100",
            )
            .into());
        }

        if self.cache.forecast_ttl_hours > 168 || self.cache.history_ttl_hours > 168 {
            return Err(
                AgroTechError::config("Cache TTL cannot exceed 168 hours (1 week)").into(),
            );
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(AgroTechError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(AgroTechError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        for url in [
            &self.weather.forecast_base_url,
            &self.weather.archive_base_url,
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(AgroTechError::config(
                    "Weather API base URLs must be valid HTTP or HTTPS URLs",
                )
                .into());
            }
        }

        Ok(())
    }
}
