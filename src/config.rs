use figment::{
    providers::{Env, Format, Yaml},
    Figment,
};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::domain::AGGREGATE_ARRAY_NAME;

pub const DEFAULT_FORECAST_SOLAR_URL: &str = "https://api.forecast.solar";
const ENV_PREFIX: &str = "FSC__";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),
    #[error("unable to decode configuration: {0}")]
    Load(#[from] figment::Error),
    #[error("array name '{0}' conflicts with reserved name for logical array that sums all arrays")]
    ReservedArrayName(String),
    #[error("array name '{0}' is configured more than once")]
    DuplicateArrayName(String),
    #[error("no solar panel arrays configured")]
    NoArrays,
    #[error("must configure at least one of bucket or database/retention policy")]
    MissingWriteDestination,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub solar_panels: SolarPanelsConfig,
    #[serde(default)]
    pub forecast_solar: ForecastSolarConfig,
    pub influxdb: InfluxDbConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SolarPanelsConfig {
    pub location: LocationConfig,
    #[serde(default)]
    pub arrays: Vec<ArrayConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct LocationConfig { pub latitude: f64, pub longitude: f64 }

/// Physical properties of one set of panels
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ArrayConfig {
    pub name: String,
    /// Tilt in degrees, 0 (horizontal) to 90 (vertical)
    pub declination: f64,
    /// Orientation in degrees, -180..180 with 0 = south
    pub azimuth: f64,
    /// Installed modules power in kWp
    pub power: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastSolarConfig {
    #[serde(default = "default_forecast_solar_url")]
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub skip_verify_ssl: bool,
    #[serde(default)]
    pub no_compute_totals: bool,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for ForecastSolarConfig {
    fn default() -> Self {
        Self {
            url: default_forecast_solar_url(),
            api_key: String::new(),
            skip_verify_ssl: false,
            no_compute_totals: false,
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InfluxDbConfig {
    pub address: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub organization: String,
    #[serde(default)]
    pub bucket: String,
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub retention_policy: String,
    #[serde(default)]
    pub measurement_prefix: String,
    #[serde(default)]
    pub skip_verify_ssl: bool,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl InfluxDbConfig {
    /// Token, or `username:password`, or nothing
    pub fn auth(&self) -> Option<String> {
        if !self.token.is_empty() {
            Some(self.token.clone())
        } else if !self.username.is_empty() && !self.password.is_empty() {
            Some(format!("{}:{}", self.username, self.password))
        } else {
            None
        }
    }

    /// Bucket, or `database/retention_policy` for 1.x servers
    pub fn write_destination(&self) -> Option<String> {
        if !self.bucket.is_empty() {
            Some(self.bucket.clone())
        } else if !self.database.is_empty() && !self.retention_policy.is_empty() {
            Some(format!("{}/{}", self.database, self.retention_policy))
        } else {
            None
        }
    }
}

fn default_forecast_solar_url() -> String {
    DEFAULT_FORECAST_SOLAR_URL.to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

impl Config {
    /// Loads the YAML file at `path`, with `FSC__SECTION__KEY` environment
    /// variables taking precedence.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let figment = Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));
        Ok(figment.extract()?)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(Figment::new().merge(Yaml::string(yaml)).extract()?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let arrays = &self.solar_panels.arrays;
        if arrays.is_empty() {
            return Err(ConfigError::NoArrays);
        }

        let mut seen = HashSet::new();
        for array in arrays {
            if array.name == AGGREGATE_ARRAY_NAME {
                return Err(ConfigError::ReservedArrayName(array.name.clone()));
            }
            if !seen.insert(array.name.as_str()) {
                return Err(ConfigError::DuplicateArrayName(array.name.clone()));
            }
        }

        if self.influxdb.write_destination().is_none() {
            return Err(ConfigError::MissingWriteDestination);
        }
        Ok(())
    }

    /// Whether the "all" aggregate is computed and written
    pub fn compute_totals(&self) -> bool {
        !self.forecast_solar.no_compute_totals
    }
}
