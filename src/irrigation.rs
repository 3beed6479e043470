//! Irrigation decision rule
//!
//! Maps a soil moisture reading and the short-range rain forecast to one of
//! three actions. Moisture is checked first: adequately wet soil never
//! irrigates, whatever the forecast says. Dry soil irrigates unless enough
//! rain is on its way. Both thresholds are inclusive.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::{AgroTechError, Result};

/// What the pump should do right now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IrrigationAction {
    /// Soil is dry and no significant rain is expected
    Irrigate,
    /// Soil is dry but the forecast rain will do the job
    SuspendDueToRain,
    /// Soil moisture is adequate
    Standby,
}

/// Thresholds the decision is taken against
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecisionThresholds {
    /// Moisture (%) at or above which the soil counts as adequately wet
    pub moisture_threshold: f64,
    /// Forecast rain (mm) at or above which irrigation is skipped
    pub rain_threshold: f64,
}

impl DecisionThresholds {
    /// Check that both thresholds can actually be reached by clamped inputs
    pub fn validate(&self) -> Result<()> {
        if !self.moisture_threshold.is_finite()
            || !(0.0..=100.0).contains(&self.moisture_threshold)
        {
            return Err(AgroTechError::validation(format!(
                "moisture threshold must be between 0 and 100, got {}",
                self.moisture_threshold
            )));
        }
        if !self.rain_threshold.is_finite() || self.rain_threshold < 0.0 {
            return Err(AgroTechError::validation(format!(
                "rain threshold must be a finite non-negative amount in mm, got {}",
                self.rain_threshold
            )));
        }
        Ok(())
    }
}

impl Default for DecisionThresholds {
    fn default() -> Self {
        Self {
            moisture_threshold: 60.0,
            rain_threshold: 5.0,
        }
    }
}

/// Outcome of the decision rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub action: IrrigationAction,
    pub message: String,
    /// Moisture the decision was taken on, after clamping to 0-100
    pub moisture_pct: f64,
    /// Rain the decision was taken on, after clamping to >= 0
    pub rain_forecast_mm: f64,
}

/// Decide whether to irrigate.
///
/// Finite moisture values outside 0-100 are clamped into range and negative
/// rain is treated as no rain. NaN or infinite inputs are rejected, as are
/// thresholds outside their valid range.
pub fn decide(
    moisture_pct: f64,
    rain_forecast_mm: f64,
    thresholds: &DecisionThresholds,
) -> Result<Decision> {
    thresholds.validate()?;
    if !moisture_pct.is_finite() {
        return Err(AgroTechError::validation(format!(
            "soil moisture must be a finite percentage, got {moisture_pct}"
        )));
    }
    if !rain_forecast_mm.is_finite() {
        return Err(AgroTechError::validation(format!(
            "rain forecast must be a finite amount in mm, got {rain_forecast_mm}"
        )));
    }

    let moisture = moisture_pct.clamp(0.0, 100.0);
    let rain = rain_forecast_mm.max(0.0);

    let (action, message) = if moisture >= thresholds.moisture_threshold {
        (
            IrrigationAction::Standby,
            format!(
                "Soil moisture {moisture:.1}% is at or above {:.1}%. No irrigation needed.",
                thresholds.moisture_threshold
            ),
        )
    } else if rain >= thresholds.rain_threshold {
        (
            IrrigationAction::SuspendDueToRain,
            format!(
                "Soil is dry ({moisture:.1}%) but {rain:.1} mm of rain is forecast. Irrigation suspended to save water."
            ),
        )
    } else {
        (
            IrrigationAction::Irrigate,
            format!(
                "Soil is dry ({moisture:.1}%) and only {rain:.1} mm of rain is forecast. Start irrigation."
            ),
        )
    };

    debug!(?action, moisture, rain, "Irrigation decision taken");

    Ok(Decision {
        action,
        message,
        moisture_pct: moisture,
        rain_forecast_mm: rain,
    })
}

impl IrrigationAction {
    #[must_use]
    pub fn emoji(&self) -> &'static str {
        match self {
            IrrigationAction::Irrigate => "💧",
            IrrigationAction::SuspendDueToRain => "🌧️",
            IrrigationAction::Standby => "✅",
        }
    }
}

impl fmt::Display for IrrigationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            IrrigationAction::Irrigate => "Irrigate",
            IrrigationAction::SuspendDueToRain => "Suspended (rain expected)",
            IrrigationAction::Standby => "Standby",
        };
        write!(f, "{label}")
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.action.emoji(), self.action, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn defaults() -> DecisionThresholds {
        DecisionThresholds::default()
    }

    #[rstest]
    #[case(60.0, 0.0, IrrigationAction::Standby)]
    #[case(59.9, 10.0, IrrigationAction::SuspendDueToRain)]
    #[case(59.9, 4.9, IrrigationAction::Irrigate)]
    #[case(60.0, 5.0, IrrigationAction::Standby)]
    #[case(59.9, 5.0, IrrigationAction::SuspendDueToRain)]
    #[case(100.0, 50.0, IrrigationAction::Standby)]
    #[case(0.0, 0.0, IrrigationAction::Irrigate)]
    fn test_decision_table(
        #[case] moisture: f64,
        #[case] rain: f64,
        #[case] expected: IrrigationAction,
    ) {
        let decision = decide(moisture, rain, &defaults()).unwrap();
        assert_eq!(decision.action, expected);
    }

    #[test]
    fn test_wet_soil_is_standby_for_any_rain() {
        for rain in [0.0, 4.99, 5.0, 12.5, 50.0] {
            for moisture in [60.0, 72.5, 100.0] {
                let decision = decide(moisture, rain, &defaults()).unwrap();
                assert_eq!(decision.action, IrrigationAction::Standby);
            }
        }
    }

    #[test]
    fn test_grid_always_yields_a_consistent_action() {
        let thresholds = defaults();
        for m in 0..=100 {
            for r in 0..=50 {
                let (moisture, rain) = (f64::from(m), f64::from(r));
                let decision = decide(moisture, rain, &thresholds).unwrap();
                let expected = if moisture >= 60.0 {
                    IrrigationAction::Standby
                } else if rain >= 5.0 {
                    IrrigationAction::SuspendDueToRain
                } else {
                    IrrigationAction::Irrigate
                };
                assert_eq!(decision.action, expected, "moisture={moisture} rain={rain}");
            }
        }
    }

    #[test]
    fn test_custom_thresholds() {
        let thresholds = DecisionThresholds {
            moisture_threshold: 40.0,
            rain_threshold: 2.0,
        };
        assert_eq!(
            decide(45.0, 0.0, &thresholds).unwrap().action,
            IrrigationAction::Standby
        );
        assert_eq!(
            decide(35.0, 2.0, &thresholds).unwrap().action,
            IrrigationAction::SuspendDueToRain
        );
        assert_eq!(
            decide(35.0, 1.9, &thresholds).unwrap().action,
            IrrigationAction::Irrigate
        );
    }

    #[test]
    fn test_out_of_range_inputs_are_clamped() {
        let decision = decide(130.0, 0.0, &defaults()).unwrap();
        assert_eq!(decision.moisture_pct, 100.0);
        assert_eq!(decision.action, IrrigationAction::Standby);

        let decision = decide(-12.0, -3.0, &defaults()).unwrap();
        assert_eq!(decision.moisture_pct, 0.0);
        assert_eq!(decision.rain_forecast_mm, 0.0);
        assert_eq!(decision.action, IrrigationAction::Irrigate);
    }

    #[test]
    fn test_non_finite_inputs_are_rejected() {
        assert!(matches!(
            decide(f64::NAN, 0.0, &defaults()),
            Err(AgroTechError::Validation { .. })
        ));
        assert!(matches!(
            decide(30.0, f64::INFINITY, &defaults()),
            Err(AgroTechError::Validation { .. })
        ));
    }

    #[rstest]
    #[case(f64::NAN, 5.0)]
    #[case(150.0, 5.0)]
    #[case(-1.0, 5.0)]
    #[case(60.0, f64::NAN)]
    #[case(60.0, f64::INFINITY)]
    #[case(60.0, -0.5)]
    fn test_invalid_thresholds_are_rejected(
        #[case] moisture_threshold: f64,
        #[case] rain_threshold: f64,
    ) {
        let thresholds = DecisionThresholds {
            moisture_threshold,
            rain_threshold,
        };
        assert!(matches!(
            decide(95.0, 40.0, &thresholds),
            Err(AgroTechError::Validation { .. })
        ));
    }

    #[test]
    fn test_threshold_bounds_are_accepted() {
        let thresholds = DecisionThresholds {
            moisture_threshold: 100.0,
            rain_threshold: 0.0,
        };
        assert_eq!(
            decide(100.0, 0.0, &thresholds).unwrap().action,
            IrrigationAction::Standby
        );
        assert_eq!(
            decide(99.0, 0.0, &thresholds).unwrap().action,
            IrrigationAction::SuspendDueToRain
        );
    }

    #[test]
    fn test_messages_describe_the_action() {
        let decision = decide(42.0, 7.5, &defaults()).unwrap();
        assert!(decision.message.contains("7.5 mm"));
        assert!(decision.message.contains("suspended"));

        let decision = decide(42.0, 0.0, &defaults()).unwrap();
        assert!(decision.message.contains("Start irrigation"));
        assert!(decision.to_string().starts_with("💧 Irrigate"));
    }
}
