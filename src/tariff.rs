//! Electricity tariff table
//!
//! The table comes from a CSV file with a period label column (`posto`) and
//! a rate column (`valor`), for example the Brazilian "Tarifa Branca" where
//! periods are named "Ponta", "Intermediário" and "Fora Ponta". Only the
//! peak and off-peak periods matter for the cost comparison.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{AgroTechError, Result};

const LABEL_COLUMN: &str = "posto";
const RATE_COLUMN: &str = "valor";

const OFFPEAK_MARKERS: [&str; 4] = ["fora", "off-peak", "off peak", "offpeak"];
const PEAK_MARKERS: [&str; 2] = ["ponta", "peak"];

/// One row of the tariff table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TariffRow {
    pub period_label: String,
    /// Rate per kWh
    pub rate: f64,
}

/// Tariff period a row label belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TariffPeriod {
    Peak,
    OffPeak,
    Other,
}

/// Where a resolved rate came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RateSource {
    Tariff,
    Default,
}

/// Peak and off-peak rates after applying the per-rate fallback
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedRates {
    pub peak: f64,
    pub offpeak: f64,
    pub peak_source: RateSource,
    pub offpeak_source: RateSource,
}

/// Externally supplied tariff table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TariffTable {
    pub rows: Vec<TariffRow>,
}

/// Classify a period label.
///
/// Matching is case-insensitive and by substring. Off-peak markers are
/// tested first because "Fora Ponta" also contains "ponta".
#[must_use]
pub fn classify_period(label: &str) -> TariffPeriod {
    let label = label.to_lowercase();
    if OFFPEAK_MARKERS.iter().any(|m| label.contains(m)) {
        TariffPeriod::OffPeak
    } else if PEAK_MARKERS.iter().any(|m| label.contains(m)) {
        TariffPeriod::Peak
    } else {
        TariffPeriod::Other
    }
}

/// Parse a number, accepting a decimal comma ("0,65")
pub(crate) fn parse_decimal(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    raw.parse::<f64>()
        .ok()
        .or_else(|| raw.replace(',', ".").parse::<f64>().ok())
        .filter(|rate| rate.is_finite())
}

/// Pick `;` when the header uses it, as spreadsheets in pt-BR locales do
pub(crate) fn sniff_delimiter(text: &str) -> u8 {
    let header = text.lines().next().unwrap_or_default();
    if header.matches(';').count() > header.matches(',').count() {
        b';'
    } else {
        b','
    }
}

pub(crate) fn column_index(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|header| header.trim().trim_start_matches('\u{feff}').eq_ignore_ascii_case(name))
}

impl TariffTable {
    #[must_use]
    pub fn new(rows: Vec<TariffRow>) -> Self {
        Self { rows }
    }

    /// Parse the table from CSV text.
    ///
    /// Rows whose rate is not a number are skipped. A table without the
    /// `posto` and `valor` columns is an error.
    pub fn from_csv(text: &str) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(sniff_delimiter(text))
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers = reader
            .headers()
            .map_err(|e| AgroTechError::dataset(format!("unreadable tariff header: {e}")))?
            .clone();

        let (Some(label_idx), Some(rate_idx)) = (
            column_index(&headers, LABEL_COLUMN),
            column_index(&headers, RATE_COLUMN),
        ) else {
            return Err(AgroTechError::dataset(format!(
                "tariff table needs '{LABEL_COLUMN}' and '{RATE_COLUMN}' columns"
            )));
        };

        let mut rows = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    warn!("Skipping malformed tariff row {}: {}", line + 1, e);
                    continue;
                }
            };
            let label = record.get(label_idx).unwrap_or_default();
            match record.get(rate_idx).and_then(parse_decimal) {
                Some(rate) => rows.push(TariffRow {
                    period_label: label.to_string(),
                    rate,
                }),
                None => debug!("Skipping tariff row {} with non-numeric rate", line + 1),
            }
        }

        Ok(Self { rows })
    }

    /// Mean rate of the rows in `period`, if any
    #[must_use]
    pub fn average_rate(&self, period: TariffPeriod) -> Option<f64> {
        let rates: Vec<f64> = self
            .rows
            .iter()
            .filter(|row| classify_period(&row.period_label) == period)
            .map(|row| row.rate)
            .collect();

        if rates.is_empty() {
            return None;
        }

        #[allow(clippy::cast_precision_loss)]
        let mean = rates.iter().sum::<f64>() / rates.len() as f64;
        mean.is_finite().then_some(mean)
    }
}

/// Resolve the peak and off-peak rates.
///
/// Each rate falls back to its default on its own: a table that only lists
/// off-peak rows still provides the off-peak rate.
#[must_use]
pub fn resolve_rates(
    table: Option<&TariffTable>,
    default_peak: f64,
    default_offpeak: f64,
) -> ResolvedRates {
    let pick = |period: TariffPeriod, default: f64| {
        table
            .and_then(|t| t.average_rate(period))
            .map_or((default, RateSource::Default), |rate| {
                (rate, RateSource::Tariff)
            })
    };

    let (peak, peak_source) = pick(TariffPeriod::Peak, default_peak);
    let (offpeak, offpeak_source) = pick(TariffPeriod::OffPeak, default_offpeak);

    ResolvedRates {
        peak,
        offpeak,
        peak_source,
        offpeak_source,
    }
}
