use thiserror::Error;
use tracing::info;

use crate::config::{Config, ConfigError};
use crate::domain::RateLimit;
use crate::export::{write_all, ExportError, PointWriter};
use crate::forecast::{aggregate, fetch_all, ForecastError, ForecastSource};

#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to query all forecasts: {0}")]
    Forecast(#[from] ForecastError),
    #[error("failed to write data to InfluxDB: {0}")]
    Export(#[from] ExportError),
}

impl CollectorError {
    /// Step of the cycle that failed, for log fields
    pub fn op(&self) -> &'static str {
        match self {
            Self::Config(_) => "config.validate",
            Self::Forecast(_) => "forecast.fetch_all",
            Self::Export(_) => "export.write_all",
        }
    }
}

/// Outcome of one successful collection cycle
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub arrays: usize,
    pub aggregated: bool,
    pub points_written: usize,
    /// Quota as reported with the last fetched forecast
    pub rate_limit: RateLimit,
}

/// Runs one fetch, aggregate and write cycle.
///
/// The configuration is validated before anything is requested.
pub async fn run_cycle<S, W>(
    cfg: &Config,
    source: &S,
    writer: &W,
) -> Result<CycleReport, CollectorError>
where
    S: ForecastSource + ?Sized,
    W: PointWriter + ?Sized,
{
    cfg.validate()?;

    let panels = &cfg.solar_panels;
    let forecasts = fetch_all(source, &panels.location, &panels.arrays).await?;
    let total = aggregate(&forecasts, cfg.compute_totals());

    let points_written = write_all(
        writer,
        &cfg.influxdb.measurement_prefix,
        &forecasts,
        total.as_ref(),
    )
    .await?;

    let report = CycleReport {
        arrays: forecasts.len(),
        aggregated: total.is_some(),
        points_written,
        rate_limit: forecasts.last().map(|f| f.rate_limit).unwrap_or_default(),
    };
    info!(
        arrays = report.arrays,
        aggregated = report.aggregated,
        points = report.points_written,
        "collection cycle complete"
    );
    Ok(report)
}
