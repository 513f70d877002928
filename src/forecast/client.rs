use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, USER_AGENT};
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::estimate::{EstimateRequest, EstimateResponse};
use crate::config::ForecastSolarConfig;

const EXPECTED_HTTP_STATUS: StatusCode = StatusCode::OK;

/// Failure of a single `/estimate` call
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("expected HTTP status {expected} but got {status}; raw body {body}")]
    UnexpectedStatus {
        expected: u16,
        status: u16,
        body: String,
    },
    #[error("invalid JSON: {source}; raw body {body}")]
    Decode {
        #[source]
        source: serde_json::Error,
        body: String,
    },
}

/// Source of per-array production estimates
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ForecastSource: Send + Sync {
    async fn estimate(&self, request: &EstimateRequest) -> Result<EstimateResponse, FetchError>;
}

/// HTTP client for forecast.solar
///
/// Holds one connection pool for the lifetime of the value; idle
/// connections are closed when it is dropped.
#[derive(Clone)]
pub struct ForecastSolarClient {
    client: reqwest::Client,
    base_url: String,
}

impl ForecastSolarClient {
    pub fn new(cfg: &ForecastSolarConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("forecast-solar-collector/", env!("CARGO_PKG_VERSION"))),
        );
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_seconds))
            .default_headers(headers)
            .danger_accept_invalid_certs(cfg.skip_verify_ssl)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url(&cfg.url, &cfg.api_key),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// The API key, when set, is the first path segment below the root URL.
fn base_url(url: &str, api_key: &str) -> String {
    let url = url.trim_end_matches('/');
    if api_key.is_empty() {
        url.to_string()
    } else {
        format!("{url}/{api_key}")
    }
}

#[async_trait]
impl ForecastSource for ForecastSolarClient {
    async fn estimate(&self, request: &EstimateRequest) -> Result<EstimateResponse, FetchError> {
        let url = format!("{}{}", self.base_url, request.path());
        debug!(path = %request.path(), "requesting forecast.solar estimate");

        let resp = self
            .client
            .get(&url)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;

        if status != EXPECTED_HTTP_STATUS {
            return Err(FetchError::UnexpectedStatus {
                expected: EXPECTED_HTTP_STATUS.as_u16(),
                status: status.as_u16(),
                body,
            });
        }

        let parsed = serde_json::from_str::<EstimateResponse>(&body);
        parsed.map_err(|source| FetchError::Decode { source, body })
    }
}
