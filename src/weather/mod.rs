//! Weather data access
//!
//! The rest of the crate only sees the [`WeatherProvider`] capability. Its
//! methods never fail: an unreachable or misbehaving service yields
//! [`WeatherReading::fallback`] or an empty series.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::models::{DailyRainForecast, DailyWeatherHistory, WeatherReading};

pub mod open_meteo;

pub use open_meteo::OpenMeteoClient;

/// Longest daily forecast the provider serves
pub const MAX_FORECAST_DAYS: u8 = 16;

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Current temperature and rain plus the rain expected over the next hours
    async fn fetch_current(&self, latitude: f64, longitude: f64) -> WeatherReading;

    /// Daily rain outlook for the next `days` days, today included
    async fn fetch_forecast(
        &self,
        latitude: f64,
        longitude: f64,
        days: u8,
    ) -> Vec<DailyRainForecast>;

    /// Observed daily maximum temperature and rain between two dates, inclusive
    async fn fetch_history(
        &self,
        latitude: f64,
        longitude: f64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Vec<DailyWeatherHistory>;
}
