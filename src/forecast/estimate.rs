//! Wire types of the forecast.solar `/estimate` endpoint.

use serde::Deserialize;

use crate::config::{ArrayConfig, LocationConfig};
use crate::domain::{RateLimit, RawSeries, SiteInfo};

/// Message type the API reports for a usable estimate
pub const SUCCESS_MESSAGE_TYPE: &str = "success";

/// Parameters of a single `/estimate` call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimateRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub declination: f64,
    pub azimuth: f64,
    /// kWp
    pub power: f64,
}

impl EstimateRequest {
    pub fn new(location: &LocationConfig, array: &ArrayConfig) -> Self {
        Self {
            latitude: location.latitude,
            longitude: location.longitude,
            declination: array.declination,
            azimuth: array.azimuth,
            power: array.power,
        }
    }

    /// Path below the base URL, numbers rendered with six decimals
    pub fn path(&self) -> String {
        format!(
            "/estimate/{:.6}/{:.6}/{:.6}/{:.6}/{:.6}",
            self.latitude, self.longitude, self.declination, self.azimuth, self.power
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EstimateResponse {
    /// `null` on error responses
    #[serde(default)]
    pub result: Option<EstimateResult>,
    #[serde(default)]
    pub message: EstimateMessage,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EstimateResult {
    #[serde(default)]
    pub watts: RawSeries,
    #[serde(default)]
    pub watt_hours: RawSeries,
    #[serde(default)]
    pub watt_hours_day: RawSeries,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EstimateMessage {
    #[serde(default)]
    pub code: i64,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub info: SiteInfo,
    #[serde(default)]
    pub ratelimit: RateLimit,
}

impl EstimateMessage {
    pub fn is_success(&self) -> bool {
        self.kind == SUCCESS_MESSAGE_TYPE
    }
}
