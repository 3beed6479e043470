//! Optional CSV inputs
//!
//! Datasets are referenced by local path or by `http(s)` URL. A dataset
//! that cannot be fetched or parsed is treated as absent: loaders return
//! `None` and callers fall back to defaults or skip the dependent output.

use anyhow::{Context, Result};
use reqwest::Client;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument};

use crate::AgroTechError;
use crate::data_quality::SensorHistory;
use crate::fallback::{FallbackPolicy, fallback_or, with_fallback};
use crate::tariff::TariffTable;

/// Loads CSV datasets from disk or over HTTP
pub struct DatasetLoader {
    client: Client,
}

fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

impl DatasetLoader {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("AgroTech/", env!("CARGO_PKG_VERSION")))
            .build()
            .with_context(|| "Failed to create HTTP client")?;
        Ok(Self { client })
    }

    /// Fetch the raw text of a dataset
    #[instrument(skip(self))]
    pub async fn try_load_text(&self, source: &str) -> Result<String> {
        if source.trim().is_empty() {
            return Err(AgroTechError::dataset("empty dataset source").into());
        }

        let text = if is_remote(source) {
            self.client
                .get(source)
                .send()
                .await
                .map_err(|e| AgroTechError::dataset(format!("request failed: {e}")))?
                .error_for_status()
                .map_err(|e| AgroTechError::dataset(format!("unexpected status: {e}")))?
                .text()
                .await
                .map_err(|e| AgroTechError::dataset(format!("unreadable body: {e}")))?
        } else {
            tokio::fs::read_to_string(Path::new(source))
                .await
                .with_context(|| format!("Failed to read dataset file {source}"))?
        };

        debug!("Loaded {} bytes from {}", text.len(), source);
        Ok(text)
    }

    /// Raw text of a dataset, or `None` when it cannot be loaded
    pub async fn load_text(&self, source: &str) -> Option<String> {
        with_fallback(
            "dataset load",
            FallbackPolicy::Warn,
            None,
            async { self.try_load_text(source).await.map(Some) },
        )
        .await
    }

    /// Tariff table, or `None` when absent, unreachable or malformed
    pub async fn load_tariffs(&self, source: Option<&str>) -> Option<TariffTable> {
        let source = source?;
        let text = self.load_text(source).await?;
        let parsed = TariffTable::from_csv(&text).map(|table| {
            info!("Loaded tariff table with {} rows from {}", table.rows.len(), source);
            Some(table)
        });
        fallback_or("tariff table parse", FallbackPolicy::Warn, None, parsed)
    }

    /// Raw sensor history, or `None` when absent, unreachable or malformed
    pub async fn load_sensor_history(&self, source: Option<&str>) -> Option<SensorHistory> {
        let source = source?;
        let text = self.load_text(source).await?;
        let parsed = SensorHistory::from_csv(&text).map(|history| {
            info!("Loaded {} sensor history rows from {}", history.records.len(), source);
            Some(history)
        });
        fallback_or("sensor history parse", FallbackPolicy::Warn, None, parsed)
    }
}
