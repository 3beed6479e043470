//! Integration tests for the AgroTech CLI and library

use std::io::Write;
use std::process::{Command, Output};
use std::time::Duration;

use agrotech::datasets::DatasetLoader;
use agrotech::{
    CostAssumptions, Dashboard, DecisionThresholds, FixedSoilSensor, IrrigationAction, Location,
    OpenMeteoClient, SoilReading, config::WeatherConfig,
};
use serde_json::{Value, json};
use tempfile::NamedTempFile;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Config whose weather service and datasets are unreachable
fn offline_config() -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
        file,
        r#"
[weather]
forecast_base_url = "http://127.0.0.1:9"
archive_base_url = "http://127.0.0.1:9"
timeout_seconds = 1

[datasets]
tariffs = ""
sensor_history = ""

[cache]
enabled = false
"#
    )
    .unwrap();
    file
}

fn agrotech(config: &NamedTempFile, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_agrotech"))
        .arg("--config")
        .arg(config.path())
        .args(args)
        .output()
        .expect("Failed to execute command")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = Command::new(env!("CARGO_BIN_EXE_agrotech"))
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("smart irrigation advisor"));
    assert!(stdout.contains("decide"));
    assert!(stdout.contains("costs"));
}

#[test]
fn test_decide_command() {
    let config = offline_config();
    let output = agrotech(&config, &["decide", "--moisture", "59.9", "--rain", "10"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Suspended"));
}

#[test]
fn test_decide_command_json_boundary() {
    let config = offline_config();
    let output = agrotech(&config, &["--json", "decide", "--moisture", "60", "--rain", "5"]);

    assert!(output.status.success());
    let decision: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(decision["action"], "Standby");
}

#[test]
fn test_decide_rejects_nan() {
    let config = offline_config();
    let output = agrotech(&config, &["decide", "--moisture", "NaN", "--rain", "0"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid input"));
}

#[test]
fn test_decide_threshold_override() {
    let config = offline_config();
    let output = agrotech(
        &config,
        &["--json", "decide", "--moisture", "45", "--rain", "0", "--moisture-threshold", "40"],
    );

    assert!(output.status.success());
    let decision: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(decision["action"], "Standby");
}

#[test]
fn test_decide_rejects_unreachable_thresholds() {
    let config = offline_config();
    for threshold in ["NaN", "150"] {
        let output = agrotech(
            &config,
            &["decide", "--moisture", "95", "--rain", "0", "--moisture-threshold", threshold],
        );
        assert!(!output.status.success(), "threshold {threshold} was accepted");
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("moisture threshold"));
    }

    let output = agrotech(
        &config,
        &["decide", "--moisture", "30", "--rain", "0", "--rain-threshold", "-1"],
    );
    assert!(!output.status.success());
}

#[test]
fn test_environment_overrides_thresholds() {
    let config = offline_config();
    let output = Command::new(env!("CARGO_BIN_EXE_agrotech"))
        .arg("--config")
        .arg(config.path())
        .args(["--json", "decide", "--moisture", "45", "--rain", "0"])
        .env("AGROTECH_IRRIGATION__MOISTURE_THRESHOLD", "40")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let decision: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(decision["action"], "Standby");
}

#[test]
fn test_costs_tariff_flags_conflict() {
    let config = offline_config();
    let output = agrotech(&config, &["costs", "--tariffs", "tarifas.csv", "--no-tariffs"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("cannot be used with"));
}

#[test]
fn test_costs_with_default_rates() {
    let config = offline_config();
    let output = agrotech(&config, &["--json", "costs", "--no-tariffs"]);

    assert!(output.status.success());
    let costs: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(costs["conventional_monthly_cost"].as_f64().unwrap().round(), 1665.0);
    assert_eq!(costs["smart_monthly_cost"].as_f64().unwrap().round(), 351.0);
    assert_eq!(costs["annual_savings"].as_f64().unwrap().round(), 15768.0);
}

#[test]
fn test_costs_with_local_tariff_file() {
    let config = offline_config();
    let mut tariffs = NamedTempFile::new().unwrap();
    writeln!(tariffs, "posto,valor\nFora Ponta,0.50").unwrap();

    let output = agrotech(
        &config,
        &["--json", "costs", "--tariffs", tariffs.path().to_str().unwrap()],
    );

    assert!(output.status.success());
    let costs: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(costs["rates"]["peak_source"], "Default");
    assert_eq!(costs["rates"]["offpeak_source"], "Tariff");
    assert_eq!(costs["smart_monthly_cost"].as_f64().unwrap().round(), 270.0);
}

/// The dashboard keeps working when the weather service is unreachable
#[test]
fn test_status_degrades_to_fallback_weather() {
    let config = offline_config();
    let output = agrotech(&config, &["status"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Smart Irrigation System"));
    assert!(stdout.contains("25.0°C"));
    assert!(stdout.contains("0.0 mm"));
}

#[test]
fn test_forecast_offline_reports_no_data() {
    let config = offline_config();
    let output = agrotech(&config, &["forecast", "--days", "3"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("No forecast available"));
}

#[test]
fn test_history_rejects_inverted_dates() {
    let config = offline_config();
    let output = agrotech(
        &config,
        &["history", "--start", "2024-02-01", "--end", "2024-01-01"],
    );
    assert!(!output.status.success());
}

#[test]
fn test_audit_local_file() {
    let config = offline_config();
    let mut history = NamedTempFile::new().unwrap();
    writeln!(
        history,
        "timestamp,temp_ambiente\n2024-01-01 08:00:00,24.0\n2024-01-01 09:00:00,180.5"
    )
    .unwrap();

    let output = agrotech(
        &config,
        &["--json", "audit", "--source", history.path().to_str().unwrap()],
    );

    assert!(output.status.success());
    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["total_rows"], 2);
    assert_eq!(report["anomalies"].as_array().unwrap().len(), 1);
}

#[test]
fn test_audit_without_source_prints_json_null() {
    let config = offline_config();
    let output = agrotech(&config, &["--json", "audit"]);

    assert!(output.status.success());
    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(report.is_null());
}

/// Full refresh against simulated weather and tariff hosts
#[tokio::test]
async fn test_dashboard_refresh_against_mock_services() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "current": { "temperature_2m": 30.2, "rain": 0.0 },
            "hourly": { "rain": [0.5, 0.5, 0.5] }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/tarifas_energia.csv"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("posto,valor\nPonta,2.00\nFora Ponta,0.50\n"),
        )
        .mount(&server)
        .await;

    let weather_config = WeatherConfig {
        forecast_base_url: server.uri(),
        archive_base_url: server.uri(),
        timeout_seconds: 2,
        ..WeatherConfig::default()
    };
    let client = OpenMeteoClient::new(&weather_config).unwrap();
    let loader = DatasetLoader::new(Duration::from_secs(2)).unwrap();
    let tariffs = loader
        .load_tariffs(Some(&format!("{}/tarifas_energia.csv", server.uri())))
        .await;
    assert!(tariffs.is_some());

    let dashboard = Dashboard::new(
        client,
        FixedSoilSensor(SoilReading {
            moisture_pct: 41.0,
            pump_active: false,
        }),
        Location::new(-22.9519, -43.2105, "Cristo Redentor".to_string()),
        DecisionThresholds::default(),
        CostAssumptions::default(),
    );

    let snapshot = dashboard.refresh(tariffs.as_ref()).await.unwrap();
    assert_eq!(snapshot.weather.current_temperature_c, 30.2);
    assert!((snapshot.weather.rain_next_3h_mm - 1.5).abs() < 1e-9);
    assert_eq!(snapshot.decision.action, IrrigationAction::Irrigate);
    assert!((snapshot.costs.conventional_monthly_cost - 1800.0).abs() < 1e-6);
    assert!((snapshot.costs.smart_monthly_cost - 270.0).abs() < 1e-6);
}
