//! Soil sensor reading

use serde::{Deserialize, Serialize};

/// A single soil sensor sample
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct SoilReading {
    /// Volumetric soil moisture in percent (0-100)
    pub moisture_pct: f64,
    /// Whether the pump reports itself as running
    pub pump_active: bool,
}

impl SoilReading {
    #[must_use]
    pub fn format_moisture(&self) -> String {
        format!("{:.1} %", self.moisture_pct)
    }

    #[must_use]
    pub fn format_pump(&self) -> &'static str {
        if self.pump_active { "ON" } else { "OFF" }
    }
}
