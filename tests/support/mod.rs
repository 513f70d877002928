#![allow(dead_code)]
//! Shared fixtures for the collector integration tests.

use forecast_solar_collector::config::Config;
use serde_json::{json, Value};
use wiremock::MockServer;

pub const TOKEN: &str = "secret";
pub const BUCKET: &str = "solar";

/// forecast.solar style `/estimate` success body
pub fn estimate_body(timezone: &str, watts: Value) -> Value {
    json!({
        "result": {
            "watts": watts,
            "watt_hours": {},
            "watt_hours_day": {}
        },
        "message": {
            "code": 0,
            "type": "success",
            "text": "",
            "info": {
                "latitude": 40.0,
                "longitude": -74.0,
                "distance": 0,
                "place": "Trenton",
                "timezone": timezone
            },
            "ratelimit": { "period": 3600, "limit": 12, "remaining": 9 }
        }
    })
}

pub fn error_body(text: &str) -> Value {
    json!({
        "result": null,
        "message": { "code": 429, "type": "error", "text": text, "info": {} }
    })
}

/// `/estimate` path for an array at the test location
pub fn estimate_path(azimuth: f64) -> String {
    format!("/estimate/40.000000/-74.000000/30.000000/{azimuth:.6}/4.200000")
}

/// Config pointing both forecast.solar and InfluxDB at `uri`
pub fn config(uri: &str, arrays: &[(&str, f64)], compute_totals: bool) -> Config {
    let arrays_yaml: String = arrays
        .iter()
        .map(|(name, azimuth)| {
            format!("    - {{ name: {name}, declination: 30, azimuth: {azimuth}, power: 4.2 }}\n")
        })
        .collect();
    let yaml = format!(
        "solar_panels:\n  location:\n    latitude: 40.0\n    longitude: -74.0\n  arrays:\n{arrays_yaml}\
         forecast_solar:\n  url: {uri}\n  no_compute_totals: {no_totals}\n  timeout_seconds: 5\n\
         influxdb:\n  address: {uri}\n  token: {TOKEN}\n  organization: home\n  bucket: {BUCKET}\n  timeout_seconds: 5\n",
        no_totals = !compute_totals,
    );
    Config::from_yaml_str(&yaml).expect("test config parses")
}

/// Line protocol bodies received by the write endpoint, in arrival order
pub async fn written_lines(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|req| req.url.path() == "/api/v2/write")
        .map(|req| String::from_utf8_lossy(&req.body).into_owned())
        .collect()
}

/// Number of `/estimate` calls received
pub async fn estimate_calls(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|req| req.url.path().starts_with("/estimate/"))
        .count()
}
