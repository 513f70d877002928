//! Collects forecast.solar production estimates for a set of panel arrays
//! and writes them, optionally summed into an "all" array, to InfluxDB.

pub mod collector;
pub mod config;
pub mod domain;
pub mod export;
pub mod forecast;
pub mod telemetry;
