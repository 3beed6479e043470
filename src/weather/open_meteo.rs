//! Open-Meteo weather client
//!
//! Uses the forecast API for current conditions and the daily rain outlook
//! and the archive API for observed history. Neither requires an API key.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::{Serialize, de::DeserializeOwned};
use std::fmt::Debug;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

use super::{MAX_FORECAST_DAYS, WeatherProvider};
use crate::AgroTechError;
use crate::cache::ResponseCache;
use crate::config::{AgroTechConfig, WeatherConfig};
use crate::fallback::{FallbackPolicy, with_fallback};
use crate::models::{
    DailyRainForecast, DailyWeatherHistory, Location, RAIN_WINDOW_HOURS, WeatherReading,
};

const SLOW_RESPONSE: Duration = Duration::from_secs(3);

/// Open-Meteo HTTP client with optional response cache
pub struct OpenMeteoClient {
    client: Client,
    forecast_base_url: String,
    archive_base_url: String,
    timezone: String,
    cache: Option<ResponseCache>,
    forecast_ttl: Duration,
    history_ttl: Duration,
}

impl OpenMeteoClient {
    /// Create a client without a response cache
    pub fn new(config: &WeatherConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("AgroTech/", env!("CARGO_PKG_VERSION")))
            .build()
            .with_context(|| "Failed to create HTTP client")?;

        Ok(Self {
            client,
            forecast_base_url: config.forecast_base_url.trim_end_matches('/').to_string(),
            archive_base_url: config.archive_base_url.trim_end_matches('/').to_string(),
            timezone: config.timezone.clone(),
            cache: None,
            forecast_ttl: Duration::from_secs(60 * 60),
            history_ttl: Duration::from_secs(24 * 60 * 60),
        })
    }

    /// Create a client from the full configuration, opening the cache when
    /// enabled. A cache that cannot be opened is skipped, not fatal.
    pub fn from_config(config: &AgroTechConfig) -> Result<Self> {
        let client = Self::new(&config.weather)?;
        if !config.cache.enabled {
            return Ok(client);
        }

        match ResponseCache::open(&config.cache.location) {
            Ok(cache) => Ok(client.with_cache(
                cache,
                config.cache.forecast_ttl(),
                config.cache.history_ttl(),
            )),
            Err(e) => {
                warn!(
                    "Failed to open cache database at {}: {:#}. Continuing without cache.",
                    config.cache.location, e
                );
                Ok(client)
            }
        }
    }

    #[must_use]
    pub fn with_cache(
        mut self,
        cache: ResponseCache,
        forecast_ttl: Duration,
        history_ttl: Duration,
    ) -> Self {
        self.cache = Some(cache);
        self.forecast_ttl = forecast_ttl;
        self.history_ttl = history_ttl;
        self
    }

    /// Current conditions and the rain summed over the next three hours
    #[instrument(skip(self))]
    pub async fn try_current(&self, latitude: f64, longitude: f64) -> Result<WeatherReading> {
        // forecast_hours makes the hourly series start at the current hour
        let url = format!(
            "{}/forecast?latitude={}&longitude={}&current=temperature_2m,rain&hourly=rain&forecast_hours={}&timezone={}",
            self.forecast_base_url,
            latitude,
            longitude,
            RAIN_WINDOW_HOURS,
            urlencoding::encode(&self.timezone)
        );

        let response: openmeteo::ForecastResponse = self.get_json(&url).await?;
        let reading = response.into_reading(RAIN_WINDOW_HOURS)?;

        info!(
            "Current weather: {} with {:.1} mm rain expected",
            reading.format_temperature(),
            reading.rain_next_3h_mm
        );
        Ok(reading)
    }

    /// Daily rain outlook, cached for the forecast TTL
    #[instrument(skip(self))]
    pub async fn try_forecast(
        &self,
        latitude: f64,
        longitude: f64,
        days: u8,
    ) -> Result<Vec<DailyRainForecast>> {
        if days == 0 || days > MAX_FORECAST_DAYS {
            return Err(AgroTechError::validation(format!(
                "forecast days must be between 1 and {MAX_FORECAST_DAYS}, got {days}"
            ))
            .into());
        }

        let key = Location::from_coordinates(latitude, longitude)
            .cache_key("forecast", &format!("{days}:{}", self.timezone));

        self.cached(key, self.forecast_ttl, async {
            let url = format!(
                "{}/forecast?latitude={}&longitude={}&daily=precipitation_sum,precipitation_probability_max&forecast_days={}&timezone={}",
                self.forecast_base_url,
                latitude,
                longitude,
                days,
                urlencoding::encode(&self.timezone)
            );
            let response: openmeteo::ForecastResponse = self.get_json(&url).await?;
            response.into_rain_forecast()
        })
        .await
    }

    /// Observed daily history, cached for the history TTL
    #[instrument(skip(self))]
    pub async fn try_history(
        &self,
        latitude: f64,
        longitude: f64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyWeatherHistory>> {
        if start > end {
            return Err(AgroTechError::validation(format!(
                "history start {start} is after end {end}"
            ))
            .into());
        }

        let key = Location::from_coordinates(latitude, longitude)
            .cache_key("history", &format!("{start}:{end}"));

        self.cached(key, self.history_ttl, async {
            let url = format!(
                "{}/archive?latitude={}&longitude={}&start_date={}&end_date={}&daily=temperature_2m_max,precipitation_sum&timezone={}",
                self.archive_base_url,
                latitude,
                longitude,
                start,
                end,
                urlencoding::encode(&self.timezone)
            );
            let response: openmeteo::ForecastResponse = self.get_json(&url).await?;
            response.into_history()
        })
        .await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!("Open-Meteo request URL: {}", url);
        let start_time = Instant::now();

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AgroTechError::api(format!("request failed: {e}")))?
            .error_for_status()
            .map_err(|e| AgroTechError::api(format!("unexpected status: {e}")))?;

        let body: T = response
            .json()
            .await
            .map_err(|e| AgroTechError::api(format!("invalid response body: {e}")))?;

        let elapsed = start_time.elapsed();
        if elapsed > SLOW_RESPONSE {
            warn!("Slow Open-Meteo response: {:.3}s", elapsed.as_secs_f64());
        } else {
            debug!("Open-Meteo responded in {:.3}s", elapsed.as_secs_f64());
        }
        Ok(body)
    }

    async fn cached<T, F>(&self, key: String, ttl: Duration, fetch: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Clone + Debug + Send + 'static,
        F: Future<Output = Result<T>>,
    {
        if let Some(cache) = &self.cache {
            match cache.get::<T>(&key).await {
                Ok(Some(hit)) => {
                    debug!("Serving {} from cache", key);
                    return Ok(hit);
                }
                Ok(None) => {}
                Err(e) => warn!("Cache lookup for {} failed: {:#}", key, e),
            }
        }

        let value = fetch.await?;

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.put(&key, value.clone(), ttl).await {
                warn!("Failed to cache {}: {:#}", key, e);
            }
        }
        Ok(value)
    }
}

#[async_trait]
impl WeatherProvider for OpenMeteoClient {
    async fn fetch_current(&self, latitude: f64, longitude: f64) -> WeatherReading {
        with_fallback(
            "current weather",
            FallbackPolicy::Warn,
            WeatherReading::fallback(),
            self.try_current(latitude, longitude),
        )
        .await
    }

    async fn fetch_forecast(
        &self,
        latitude: f64,
        longitude: f64,
        days: u8,
    ) -> Vec<DailyRainForecast> {
        with_fallback(
            "rain forecast",
            FallbackPolicy::Warn,
            Vec::new(),
            self.try_forecast(latitude, longitude, days),
        )
        .await
    }

    async fn fetch_history(
        &self,
        latitude: f64,
        longitude: f64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Vec<DailyWeatherHistory> {
        with_fallback(
            "weather history",
            FallbackPolicy::Warn,
            Vec::new(),
            self.try_history(latitude, longitude, start, end),
        )
        .await
    }
}

/// `OpenMeteo` API response structures and conversion utilities
mod openmeteo {
    use anyhow::Result;
    use chrono::NaiveDate;
    use serde::Deserialize;

    use crate::AgroTechError;
    use crate::models::{DailyRainForecast, DailyWeatherHistory, WeatherReading};

    /// Response shared by the forecast and archive endpoints
    #[derive(Debug, Deserialize)]
    pub struct ForecastResponse {
        pub current: Option<CurrentData>,
        pub hourly: Option<HourlyData>,
        pub daily: Option<DailyData>,
    }

    #[derive(Debug, Deserialize)]
    pub struct CurrentData {
        #[serde(rename = "temperature_2m")]
        pub temperature: f64,
        pub rain: f64,
    }

    #[derive(Debug, Deserialize)]
    pub struct HourlyData {
        pub rain: Vec<Option<f64>>,
    }

    #[derive(Debug, Deserialize)]
    pub struct DailyData {
        pub time: Vec<NaiveDate>,
        #[serde(rename = "temperature_2m_max")]
        pub temperature_max: Option<Vec<Option<f64>>>,
        #[serde(rename = "precipitation_sum")]
        pub precipitation: Option<Vec<Option<f64>>>,
        #[serde(rename = "precipitation_probability_max")]
        pub precipitation_probability: Option<Vec<Option<f64>>>,
    }

    fn value_at(series: Option<&Vec<Option<f64>>>, index: usize) -> Option<f64> {
        series.and_then(|values| values.get(index).copied().flatten())
    }

    impl ForecastResponse {
        /// Reading from the `current` block and the first `window` hourly
        /// rain values; missing or null hours count as dry.
        pub fn into_reading(self, window: usize) -> Result<WeatherReading> {
            let current = self
                .current
                .ok_or_else(|| AgroTechError::api("response has no current weather block"))?;
            let hourly = self
                .hourly
                .ok_or_else(|| AgroTechError::api("response has no hourly rain series"))?;

            let rain_next: f64 = hourly.rain.iter().take(window).map(|r| r.unwrap_or(0.0)).sum();

            Ok(WeatherReading {
                current_temperature_c: current.temperature,
                current_rain_mm: current.rain,
                rain_next_3h_mm: rain_next,
            })
        }

        pub fn into_rain_forecast(self) -> Result<Vec<DailyRainForecast>> {
            let daily = self
                .daily
                .ok_or_else(|| AgroTechError::api("response has no daily series"))?;

            Ok(daily
                .time
                .iter()
                .enumerate()
                .map(|(i, date)| {
                    let probability = value_at(daily.precipitation_probability.as_ref(), i)
                        .unwrap_or(0.0)
                        .clamp(0.0, 100.0)
                        .round();
                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    let rain_probability_pct = probability as u8;
                    DailyRainForecast {
                        date: *date,
                        rain_mm: value_at(daily.precipitation.as_ref(), i).unwrap_or(0.0),
                        rain_probability_pct,
                    }
                })
                .collect())
        }

        /// Days without an observed maximum temperature are skipped; the
        /// archive reports those as null for the most recent days.
        pub fn into_history(self) -> Result<Vec<DailyWeatherHistory>> {
            let daily = self
                .daily
                .ok_or_else(|| AgroTechError::api("response has no daily series"))?;

            Ok(daily
                .time
                .iter()
                .enumerate()
                .filter_map(|(i, date)| {
                    let temp_max_c = value_at(daily.temperature_max.as_ref(), i)?;
                    Some(DailyWeatherHistory {
                        date: *date,
                        temp_max_c,
                        rain_mm: value_at(daily.precipitation.as_ref(), i).unwrap_or(0.0),
                    })
                })
                .collect())
        }
    }
}
