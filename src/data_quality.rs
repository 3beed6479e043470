//! Raw sensor history audit
//!
//! The exported sensor history is known to be dirty: broken timestamps,
//! empty cells and ambient temperature spikes well above anything
//! physically plausible. The audit reports those rows; it never corrects
//! or drops them from the dataset.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

use crate::tariff::{column_index, parse_decimal, sniff_delimiter};
use crate::{AgroTechError, Result};

const TIMESTAMP_COLUMN: &str = "timestamp";
const TEMPERATURE_COLUMN: &str = "temp_ambiente";

const TIMESTAMP_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%d/%m/%Y %H:%M",
];

/// One row of the sensor history, as found in the file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorHistoryRecord {
    /// 1-based data row number, header excluded
    pub row: usize,
    pub raw_timestamp: String,
    pub timestamp: Option<NaiveDateTime>,
    pub temp_ambiente: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorHistory {
    pub records: Vec<SensorHistoryRecord>,
}

/// Findings of [`audit`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub total_rows: usize,
    pub invalid_timestamps: usize,
    pub missing_temperatures: usize,
    pub max_plausible_temp_c: f64,
    /// Rows whose temperature exceeds `max_plausible_temp_c`
    pub anomalies: Vec<SensorHistoryRecord>,
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
}

impl SensorHistory {
    /// Parse the history from CSV text; needs `timestamp` and `temp_ambiente` columns
    pub fn from_csv(text: &str) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(sniff_delimiter(text))
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers = reader
            .headers()
            .map_err(|e| AgroTechError::dataset(format!("unreadable history header: {e}")))?
            .clone();

        let (Some(ts_idx), Some(temp_idx)) = (
            column_index(&headers, TIMESTAMP_COLUMN),
            column_index(&headers, TEMPERATURE_COLUMN),
        ) else {
            return Err(AgroTechError::dataset(format!(
                "sensor history needs '{TIMESTAMP_COLUMN}' and '{TEMPERATURE_COLUMN}' columns"
            )));
        };

        let mut records = Vec::new();
        for (i, record) in reader.records().enumerate() {
            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    warn!("Skipping unreadable history row {}: {}", i + 1, e);
                    continue;
                }
            };
            let raw_timestamp = record.get(ts_idx).unwrap_or_default().to_string();
            records.push(SensorHistoryRecord {
                row: i + 1,
                timestamp: parse_timestamp(&raw_timestamp),
                raw_timestamp,
                temp_ambiente: record.get(temp_idx).and_then(parse_decimal),
            });
        }

        Ok(Self { records })
    }
}

/// Count bad timestamps, missing temperatures and implausible spikes
#[must_use]
pub fn audit(history: &SensorHistory, max_plausible_temp_c: f64) -> QualityReport {
    let records = &history.records;
    QualityReport {
        total_rows: records.len(),
        invalid_timestamps: records.iter().filter(|r| r.timestamp.is_none()).count(),
        missing_temperatures: records.iter().filter(|r| r.temp_ambiente.is_none()).count(),
        max_plausible_temp_c,
        anomalies: records
            .iter()
            .filter(|r| r.temp_ambiente.is_some_and(|t| t > max_plausible_temp_c))
            .cloned()
            .collect(),
    }
}

impl QualityReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.invalid_timestamps == 0 && self.missing_temperatures == 0 && self.anomalies.is_empty()
    }
}

impl fmt::Display for QualityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "   Rows:                 {}", self.total_rows)?;
        writeln!(f, "   Invalid timestamps:   {}", self.invalid_timestamps)?;
        writeln!(f, "   Missing temperatures: {}", self.missing_temperatures)?;
        writeln!(
            f,
            "   Readings above {:.0}°C: {}",
            self.max_plausible_temp_c,
            self.anomalies.len()
        )?;
        for anomaly in self.anomalies.iter().take(10) {
            writeln!(
                f,
                "     ⚠️ row {} at {}: {:.1}°C",
                anomaly.row,
                anomaly.raw_timestamp,
                anomaly.temp_ambiente.unwrap_or_default()
            )?;
        }
        if self.anomalies.len() > 10 {
            writeln!(f, "     ... and {} more", self.anomalies.len() - 10)?;
        }
        Ok(())
    }
}
