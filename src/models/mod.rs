//! Data models for the `AgroTech` advisor
//!
//! This module contains the domain models organized by concern:
//! - Location: Farm coordinates used for weather lookups
//! - Weather: Current reading, daily rain forecast and daily history
//! - Soil: Soil sensor readings

pub mod location;
pub mod soil;
pub mod weather;

// Re-export all public types for convenient access
pub use location::Location;
pub use soil::SoilReading;
pub use weather::{DailyRainForecast, DailyWeatherHistory, RAIN_WINDOW_HOURS, WeatherReading};
