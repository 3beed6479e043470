//! Weather data models

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Hours of upcoming hourly rain summed into [`WeatherReading::rain_next_3h_mm`]
pub const RAIN_WINDOW_HOURS: usize = 3;

/// Current conditions plus the short-range rain outlook
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct WeatherReading {
    /// Air temperature at 2 m in Celsius
    pub current_temperature_c: f64,
    /// Rain in the current hour in mm
    pub current_rain_mm: f64,
    /// Rain expected over the next three hours in mm
    pub rain_next_3h_mm: f64,
}

impl WeatherReading {
    pub const FALLBACK_TEMPERATURE_C: f64 = 25.0;

    /// Reading reported when the weather service cannot be reached
    #[must_use]
    pub const fn fallback() -> Self {
        Self {
            current_temperature_c: Self::FALLBACK_TEMPERATURE_C,
            current_rain_mm: 0.0,
            rain_next_3h_mm: 0.0,
        }
    }

    /// Format temperature with unit
    #[must_use]
    pub fn format_temperature(&self) -> String {
        format!("{:.1}°C", self.current_temperature_c)
    }

    #[must_use]
    pub fn format_rain_outlook(&self) -> String {
        format!("{:.1} mm", self.rain_next_3h_mm)
    }
}

impl Default for WeatherReading {
    fn default() -> Self {
        Self::fallback()
    }
}

/// Daily rain outlook
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DailyRainForecast {
    pub date: NaiveDate,
    /// Total precipitation for the day in mm
    pub rain_mm: f64,
    /// Highest hourly precipitation probability of the day (0-100)
    pub rain_probability_pct: u8,
}

/// Observed daily weather
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DailyWeatherHistory {
    pub date: NaiveDate,
    pub temp_max_c: f64,
    pub rain_mm: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_reading() {
        let reading = WeatherReading::fallback();
        assert_eq!(reading.current_temperature_c, 25.0);
        assert_eq!(reading.current_rain_mm, 0.0);
        assert_eq!(reading.rain_next_3h_mm, 0.0);
        assert_eq!(reading, WeatherReading::default());
    }

    #[test]
    fn test_format_helpers() {
        let reading = WeatherReading {
            current_temperature_c: 27.36,
            current_rain_mm: 0.2,
            rain_next_3h_mm: 1.26,
        };
        assert_eq!(reading.format_temperature(), "27.4°C");
        assert_eq!(reading.format_rain_outlook(), "1.3 mm");
    }
}
