//! Soil sensor access
//!
//! There is no physical sensor attached: the dashboard reads a simulated sensor that
//! draws a uniformly distributed moisture value. Code that needs repeatable
//! readings uses [`FixedSoilSensor`] instead.

use rand::RngExt;
use tracing::debug;

use crate::models::SoilReading;
use crate::{AgroTechError, Result};

pub trait SoilSensor: Send + Sync {
    fn read_soil(&self) -> SoilReading;
}

/// Random moisture in `[min, max)` and an independent fair pump flag
#[derive(Debug, Clone, Copy)]
pub struct SimulatedSoilSensor {
    min: f64,
    max: f64,
}

impl SimulatedSoilSensor {
    pub fn new(min: f64, max: f64) -> Result<Self> {
        if !(0.0..=100.0).contains(&min) || !(0.0..=100.0).contains(&max) || min >= max {
            return Err(AgroTechError::validation(format!(
                "moisture range must satisfy 0 <= min < max <= 100, got {min}..{max}"
            )));
        }
        Ok(Self { min, max })
    }

    #[must_use]
    pub fn range(&self) -> (f64, f64) {
        (self.min, self.max)
    }
}

impl Default for SimulatedSoilSensor {
    fn default() -> Self {
        Self {
            min: 30.0,
            max: 80.0,
        }
    }
}

impl SoilSensor for SimulatedSoilSensor {
    fn read_soil(&self) -> SoilReading {
        let mut rng = rand::rng();
        let reading = SoilReading {
            moisture_pct: rng.random_range(self.min..self.max),
            pump_active: rng.random_bool(0.5),
        };
        debug!(
            moisture = reading.moisture_pct,
            pump_active = reading.pump_active,
            "Simulated soil reading"
        );
        reading
    }
}

/// Always returns the same reading
#[derive(Debug, Clone, Copy)]
pub struct FixedSoilSensor(pub SoilReading);

impl SoilSensor for FixedSoilSensor {
    fn read_soil(&self) -> SoilReading {
        self.0
    }
}
