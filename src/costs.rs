//! Pump energy cost comparison
//!
//! A conventional installation runs the pump on a fixed schedule every day,
//! usually during the peak tariff window. The smart installation only runs
//! on the fraction of days the decision rule asks for, and shifts the run to
//! the off-peak window.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::tariff::{RateSource, ResolvedRates, TariffTable, resolve_rates};

const MONTHS_PER_YEAR: f64 = 12.0;

/// Fixed assumptions behind the comparison
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostAssumptions {
    /// Pump electrical draw in kW
    pub pump_kw: f64,
    pub conventional_hours_per_day: f64,
    pub smart_hours_per_day: f64,
    /// Fraction of days the smart system actually irrigates
    pub smart_duty_fraction: f64,
    pub days_per_month: u32,
    pub default_peak_rate: f64,
    pub default_offpeak_rate: f64,
}

impl Default for CostAssumptions {
    fn default() -> Self {
        Self {
            pump_kw: 15.0,
            conventional_hours_per_day: 2.0,
            smart_hours_per_day: 2.0,
            smart_duty_fraction: 0.6,
            days_per_month: 30,
            default_peak_rate: 1.85,
            default_offpeak_rate: 0.65,
        }
    }
}

/// Monthly and annual costs of both strategies
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostComparison {
    pub conventional_monthly_cost: f64,
    pub smart_monthly_cost: f64,
    pub monthly_savings: f64,
    pub annual_savings: f64,
    /// Savings relative to the conventional cost, 0 when that cost is 0
    pub savings_pct: f64,
    pub rates: ResolvedRates,
}

/// Compare the conventional and the smart pump schedule
#[must_use]
pub fn compare_costs(table: Option<&TariffTable>, assumptions: &CostAssumptions) -> CostComparison {
    let rates = resolve_rates(
        table,
        assumptions.default_peak_rate,
        assumptions.default_offpeak_rate,
    );
    let days = f64::from(assumptions.days_per_month);

    let conventional_monthly_cost =
        assumptions.conventional_hours_per_day * days * assumptions.pump_kw * rates.peak;
    let smart_monthly_cost = assumptions.smart_hours_per_day
        * days
        * assumptions.smart_duty_fraction
        * assumptions.pump_kw
        * rates.offpeak;

    let monthly_savings = conventional_monthly_cost - smart_monthly_cost;
    let annual_savings = monthly_savings * MONTHS_PER_YEAR;

    let savings_pct = if conventional_monthly_cost == 0.0 {
        0.0
    } else {
        monthly_savings / conventional_monthly_cost * 100.0
    };

    debug!(
        peak = rates.peak,
        offpeak = rates.offpeak,
        conventional_monthly_cost,
        smart_monthly_cost,
        "Cost comparison computed"
    );

    CostComparison {
        conventional_monthly_cost,
        smart_monthly_cost,
        monthly_savings,
        annual_savings,
        savings_pct,
        rates,
    }
}

fn source_label(source: RateSource) -> &'static str {
    match source {
        RateSource::Tariff => "tariff table",
        RateSource::Default => "default",
    }
}

impl fmt::Display for CostComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "   Peak rate:     {:.2} /kWh ({})",
            self.rates.peak,
            source_label(self.rates.peak_source)
        )?;
        writeln!(
            f,
            "   Off-peak rate: {:.2} /kWh ({})",
            self.rates.offpeak,
            source_label(self.rates.offpeak_source)
        )?;
        writeln!(f, "   Conventional:  {:.2} /month", self.conventional_monthly_cost)?;
        writeln!(f, "   Smart:         {:.2} /month", self.smart_monthly_cost)?;
        writeln!(
            f,
            "   Savings:       {:.2} /month ({:.1}%), {:.2} /year",
            self.monthly_savings, self.savings_pct, self.annual_savings
        )
    }
}
