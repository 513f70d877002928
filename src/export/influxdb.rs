use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::point::{forecast_points, Point, MEASUREMENT};
use crate::config::InfluxDbConfig;
use crate::domain::ArrayForecast;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("InfluxDB request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("InfluxDB rejected write with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("must configure at least one of bucket or database/retention policy")]
    MissingWriteDestination,
    #[error("InfluxDB credentials are not a valid header value")]
    InvalidCredentials,
}

/// Destination for single-point writes
#[async_trait]
pub trait PointWriter: Send + Sync {
    /// Writes one point, returning once the server has accepted it.
    async fn write_point(&self, point: &Point) -> Result<(), ExportError>;
}

/// InfluxDB `/api/v2/write` client; also works against 1.8+ through the
/// v2 compatibility endpoint with a `database/retention_policy` bucket.
#[derive(Clone)]
pub struct InfluxWriter {
    client: reqwest::Client,
    write_url: String,
    organization: String,
    bucket: String,
}

impl InfluxWriter {
    pub fn new(cfg: &InfluxDbConfig) -> Result<Self, ExportError> {
        let bucket = cfg
            .write_destination()
            .ok_or(ExportError::MissingWriteDestination)?;

        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("forecast-solar-collector/", env!("CARGO_PKG_VERSION"))),
        );
        if let Some(auth) = cfg.auth() {
            let mut value = HeaderValue::from_str(&format!("Token {auth}"))
                .map_err(|_| ExportError::InvalidCredentials)?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_seconds))
            .default_headers(headers)
            .danger_accept_invalid_certs(cfg.skip_verify_ssl)
            .build()?;

        Ok(Self {
            client,
            write_url: format!("{}/api/v2/write", cfg.address.trim_end_matches('/')),
            organization: cfg.organization.clone(),
            bucket,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl PointWriter for InfluxWriter {
    async fn write_point(&self, point: &Point) -> Result<(), ExportError> {
        let resp = self
            .client
            .post(&self.write_url)
            .query(&[
                ("org", self.organization.as_str()),
                ("bucket", self.bucket.as_str()),
                ("precision", "s"),
            ])
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(point.to_line())
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = match resp.text().await {
                Ok(body) => body,
                Err(err) => format!("<body unavailable: {err}>"),
            };
            return Err(ExportError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

/// Writes the aggregate (if any) followed by every per-array forecast.
///
/// Points are written one at a time and the first failure aborts the rest.
/// Returns the number of points written.
pub async fn write_all<W>(
    writer: &W,
    measurement_prefix: &str,
    forecasts: &[ArrayForecast],
    aggregate: Option<&ArrayForecast>,
) -> Result<usize, ExportError>
where
    W: PointWriter + ?Sized,
{
    let measurement = format!("{measurement_prefix}{MEASUREMENT}");
    let mut written = 0;

    for forecast in aggregate.into_iter().chain(forecasts) {
        for point in forecast_points(forecast, &measurement) {
            writer.write_point(&point).await?;
            written += 1;
        }
        debug!(array = %forecast.name, points = forecast.point_count(), "forecast written");
    }

    Ok(written)
}
