//! `AgroTech` - Smart irrigation advisor
//!
//! This library provides the irrigation decision rule, the pump energy cost
//! comparison, a fail-soft Open-Meteo weather client, a simulated soil
//! sensor and the CSV datasets the dashboard draws on.

pub mod cache;
pub mod config;
pub mod costs;
pub mod dashboard;
pub mod data_quality;
pub mod datasets;
pub mod error;
pub mod fallback;
pub mod irrigation;
pub mod logging;
pub mod models;
pub mod sensor;
pub mod tariff;
pub mod weather;

// Re-export core types for public API
pub use crate::config::AgroTechConfig;
pub use costs::{CostAssumptions, CostComparison, compare_costs};
pub use dashboard::{Dashboard, DashboardSnapshot};
pub use error::AgroTechError;
pub use irrigation::{Decision, DecisionThresholds, IrrigationAction, decide};
pub use models::{DailyRainForecast, DailyWeatherHistory, Location, SoilReading, WeatherReading};
pub use sensor::{FixedSoilSensor, SimulatedSoilSensor, SoilSensor};
pub use tariff::{TariffRow, TariffTable};
pub use weather::{OpenMeteoClient, WeatherProvider};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, AgroTechError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
