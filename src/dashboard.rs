//! Dashboard refresh
//!
//! A refresh reads the weather and the soil sensor, runs the decision rule
//! and the cost comparison and returns everything needed to render one
//! screen. Refreshes share no state and may run in any order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, instrument};

use crate::Result;
use crate::costs::{CostAssumptions, CostComparison, compare_costs};
use crate::irrigation::{Decision, DecisionThresholds, decide};
use crate::models::{Location, SoilReading, WeatherReading};
use crate::sensor::SoilSensor;
use crate::tariff::TariffTable;
use crate::weather::WeatherProvider;

/// Everything shown on one dashboard screen
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub location: Location,
    pub weather: WeatherReading,
    pub soil: SoilReading,
    pub decision: Decision,
    pub costs: CostComparison,
    pub generated_at: DateTime<Utc>,
}

pub struct Dashboard<W, S> {
    weather: W,
    sensor: S,
    location: Location,
    thresholds: DecisionThresholds,
    assumptions: CostAssumptions,
}

impl<W: WeatherProvider, S: SoilSensor> Dashboard<W, S> {
    pub fn new(
        weather: W,
        sensor: S,
        location: Location,
        thresholds: DecisionThresholds,
        assumptions: CostAssumptions,
    ) -> Self {
        Self {
            weather,
            sensor,
            location,
            thresholds,
            assumptions,
        }
    }

    /// Take one reading of every source and evaluate it
    #[instrument(skip(self, tariffs), fields(location = %self.location.name))]
    pub async fn refresh(&self, tariffs: Option<&TariffTable>) -> Result<DashboardSnapshot> {
        let weather = self
            .weather
            .fetch_current(self.location.latitude, self.location.longitude)
            .await;
        let soil = self.sensor.read_soil();

        let decision = decide(soil.moisture_pct, weather.rain_next_3h_mm, &self.thresholds)?;
        let costs = compare_costs(tariffs, &self.assumptions);

        info!(action = ?decision.action, "Dashboard refreshed");

        Ok(DashboardSnapshot {
            location: self.location.clone(),
            weather,
            soil,
            decision,
            costs,
            generated_at: Utc::now(),
        })
    }
}

impl fmt::Display for DashboardSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "🌱 Smart Irrigation System")?;
        writeln!(
            f,
            "📍 {} ({})",
            self.location.name,
            self.location.format_coordinates()
        )?;
        writeln!(f, "🕒 {}", self.generated_at.format("%Y-%m-%d %H:%M:%S UTC"))?;
        writeln!(f)?;
        writeln!(f, "🌡️ Temperature:   {}", self.weather.format_temperature())?;
        writeln!(f, "🌧️ Rain (3h):     {}", self.weather.format_rain_outlook())?;
        writeln!(f, "💧 Soil moisture: {}", self.soil.format_moisture())?;
        writeln!(f, "⚙️ Pump:          {}", self.soil.format_pump())?;
        writeln!(f)?;
        writeln!(f, "🧠 Decision")?;
        writeln!(f, "   {}", self.decision)?;
        writeln!(f)?;
        writeln!(f, "💰 Energy cost comparison")?;
        write!(f, "{}", self.costs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::irrigation::IrrigationAction;
    use crate::models::{DailyRainForecast, DailyWeatherHistory};
    use crate::sensor::FixedSoilSensor;
    use async_trait::async_trait;
    use chrono::NaiveDate;

    struct StubWeather(WeatherReading);

    #[async_trait]
    impl WeatherProvider for StubWeather {
        async fn fetch_current(&self, _latitude: f64, _longitude: f64) -> WeatherReading {
            self.0
        }

        async fn fetch_forecast(&self, _: f64, _: f64, _: u8) -> Vec<DailyRainForecast> {
            Vec::new()
        }

        async fn fetch_history(
            &self,
            _: f64,
            _: f64,
            _: NaiveDate,
            _: NaiveDate,
        ) -> Vec<DailyWeatherHistory> {
            Vec::new()
        }
    }

    fn dashboard(moisture: f64, rain: f64) -> Dashboard<StubWeather, FixedSoilSensor> {
        Dashboard::new(
            StubWeather(WeatherReading {
                current_temperature_c: 29.0,
                current_rain_mm: 0.0,
                rain_next_3h_mm: rain,
            }),
            FixedSoilSensor(SoilReading {
                moisture_pct: moisture,
                pump_active: false,
            }),
            Location::new(-22.9519, -43.2105, "Cristo Redentor".to_string()),
            DecisionThresholds::default(),
            CostAssumptions::default(),
        )
    }

    #[tokio::test]
    async fn test_refresh_dry_soil_with_rain_coming() {
        let snapshot = dashboard(35.0, 8.0).refresh(None).await.unwrap();
        assert_eq!(snapshot.decision.action, IrrigationAction::SuspendDueToRain);
        assert_eq!(snapshot.weather.current_temperature_c, 29.0);
        assert!((snapshot.costs.monthly_savings - 1314.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_refresh_wet_soil() {
        let snapshot = dashboard(75.0, 0.0).refresh(None).await.unwrap();
        assert_eq!(snapshot.decision.action, IrrigationAction::Standby);
    }

    #[tokio::test]
    async fn test_refresh_with_fallback_weather_irrigates_dry_soil() {
        let mut board = dashboard(20.0, 0.0);
        board.weather = StubWeather(WeatherReading::fallback());
        let snapshot = board.refresh(None).await.unwrap();
        assert_eq!(snapshot.decision.action, IrrigationAction::Irrigate);
        assert_eq!(snapshot.weather.format_temperature(), "25.0°C");
    }

    #[tokio::test]
    async fn test_snapshot_renders_all_sections() {
        let snapshot = dashboard(35.0, 0.0).refresh(None).await.unwrap();
        let rendered = snapshot.to_string();
        assert!(rendered.contains("Cristo Redentor"));
        assert!(rendered.contains("29.0°C"));
        assert!(rendered.contains("35.0 %"));
        assert!(rendered.contains("Irrigate"));
        assert!(rendered.contains("1665.00"));
    }
}
