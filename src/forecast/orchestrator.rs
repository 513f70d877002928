use thiserror::Error;
use tracing::{debug, info};

use super::client::{FetchError, ForecastSource};
use super::estimate::{EstimateRequest, EstimateResponse, SUCCESS_MESSAGE_TYPE};
use super::normalize::{normalize_result, NormalizeError};
use crate::config::{ArrayConfig, LocationConfig};
use crate::domain::ArrayForecast;

/// Failure while collecting forecasts, tagged with the array it hit
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("array '{array}': {source}")]
    Fetch {
        array: String,
        #[source]
        source: FetchError,
    },
    #[error("array '{array}': expected message type {expected} but got {actual} ({text})")]
    UnexpectedMessageType {
        array: String,
        expected: &'static str,
        actual: String,
        text: String,
    },
    #[error("array '{array}': {source}")]
    Normalize {
        array: String,
        #[source]
        source: NormalizeError,
    },
}

impl ForecastError {
    pub fn array(&self) -> &str {
        match self {
            Self::Fetch { array, .. }
            | Self::UnexpectedMessageType { array, .. }
            | Self::Normalize { array, .. } => array,
        }
    }

    /// Processing step that failed, for log fields
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Fetch { .. } => "fetch",
            Self::UnexpectedMessageType { .. } => "validate",
            Self::Normalize { .. } => "normalize",
        }
    }
}

/// Fetches and normalizes every array in configuration order.
///
/// Stops at the first array that fails; arrays after it are not requested.
pub async fn fetch_all<S>(
    source: &S,
    location: &LocationConfig,
    arrays: &[ArrayConfig],
) -> Result<Vec<ArrayForecast>, ForecastError>
where
    S: ForecastSource + ?Sized,
{
    let mut forecasts = Vec::with_capacity(arrays.len());

    for array in arrays {
        let request = EstimateRequest::new(location, array);
        debug!(array = %array.name, "fetching forecast");

        let response = source
            .estimate(&request)
            .await
            .map_err(|source| ForecastError::Fetch {
                array: array.name.clone(),
                source,
            })?;
        let forecast = into_forecast(&array.name, response)?;

        info!(
            array = %forecast.name,
            site = %forecast.site.place,
            points = forecast.point_count(),
            "forecast received"
        );
        forecasts.push(forecast);
    }

    Ok(forecasts)
}

/// Validates the response envelope and normalizes its series.
pub fn into_forecast(name: &str, response: EstimateResponse) -> Result<ArrayForecast, ForecastError> {
    let EstimateResponse { result, message } = response;

    if !message.is_success() {
        return Err(ForecastError::UnexpectedMessageType {
            array: name.to_string(),
            expected: SUCCESS_MESSAGE_TYPE,
            actual: message.kind,
            text: message.text,
        });
    }

    let normalized = normalize_result(&result.unwrap_or_default(), &message.info.timezone)
        .map_err(|source| ForecastError::Normalize {
            array: name.to_string(),
            source,
        })?;

    Ok(ArrayForecast {
        name: name.to_string(),
        site: message.info,
        rate_limit: message.ratelimit,
        watts: normalized.watts,
        watt_hours: normalized.watt_hours,
        watt_hours_day: normalized.watt_hours_day,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RateLimit, SiteInfo};
    use crate::forecast::client::MockForecastSource;
    use crate::forecast::estimate::{EstimateMessage, EstimateResult};
    use chrono::{DateTime, Utc};
    use reqwest::StatusCode;

    fn location() -> LocationConfig {
        LocationConfig { latitude: 40.0, longitude: -74.0 }
    }

    fn array(name: &str, azimuth: f64) -> ArrayConfig {
        ArrayConfig {
            name: name.to_string(),
            declination: 30.0,
            azimuth,
            power: 4.0,
        }
    }

    fn response(kind: &str, timezone: &str, watts: &[(&str, i64)]) -> EstimateResponse {
        EstimateResponse {
            result: Some(EstimateResult {
                watts: watts.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
                ..Default::default()
            }),
            message: EstimateMessage {
                code: 0,
                kind: kind.to_string(),
                text: String::new(),
                info: SiteInfo {
                    latitude: 40.0,
                    longitude: -74.0,
                    place: "Trenton, New Jersey".to_string(),
                    timezone: timezone.to_string(),
                },
                ratelimit: RateLimit { period: 3600, limit: 12, remaining: 11 },
            },
        }
    }

    fn ok_response() -> EstimateResponse {
        response("success", "America/New_York", &[("2024-01-01 12:00:00", 500)])
    }

    #[tokio::test]
    async fn test_single_array_end_to_end() {
        let mut source = MockForecastSource::new();
        source
            .expect_estimate()
            .times(1)
            .withf(|req| req.latitude == 40.0 && req.longitude == -74.0 && req.azimuth == -90.0)
            .returning(|_| Ok(ok_response()));

        let forecasts = fetch_all(&source, &location(), &[array("east", -90.0)])
            .await
            .unwrap();

        assert_eq!(forecasts.len(), 1);
        let east = &forecasts[0];
        assert_eq!(east.name, "east");
        assert_eq!(east.site.place, "Trenton, New Jersey");
        assert_eq!(east.rate_limit.remaining, 11);

        let instant = DateTime::parse_from_rfc3339("2024-01-01T12:00:00-05:00")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(east.watts.len(), 1);
        assert_eq!(east.watts.get(&instant), Some(500));
    }

    #[tokio::test]
    async fn test_results_follow_configuration_order() {
        let mut source = MockForecastSource::new();
        source
            .expect_estimate()
            .times(3)
            .returning(|_| Ok(ok_response()));

        let arrays = [array("east", -90.0), array("south", 0.0), array("west", 90.0)];
        let forecasts = fetch_all(&source, &location(), &arrays).await.unwrap();

        let names: Vec<&str> = forecasts.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["east", "south", "west"]);
    }

    #[tokio::test]
    async fn test_stops_at_first_failed_fetch() {
        let mut source = MockForecastSource::new();
        let mut calls = 0;
        source.expect_estimate().times(2).returning(move |_| {
            calls += 1;
            if calls == 2 {
                Err(FetchError::UnexpectedStatus {
                    expected: 200,
                    status: StatusCode::TOO_MANY_REQUESTS.as_u16(),
                    body: "{}".to_string(),
                })
            } else {
                Ok(ok_response())
            }
        });

        let arrays = [array("east", -90.0), array("south", 0.0), array("west", 90.0)];
        let err = fetch_all(&source, &location(), &arrays).await.unwrap_err();

        assert_eq!(err.array(), "south");
        assert_eq!(err.stage(), "fetch");
        assert!(err.to_string().contains("429"));
    }

    #[tokio::test]
    async fn test_error_message_type_aborts() {
        let mut source = MockForecastSource::new();
        source.expect_estimate().times(1).returning(|_| {
            let mut resp = response("error", "America/New_York", &[]);
            resp.message.text = "Rate limit for API calls reached.".to_string();
            Ok(resp)
        });

        let arrays = [array("east", -90.0), array("west", 90.0)];
        let err = fetch_all(&source, &location(), &arrays).await.unwrap_err();

        assert!(matches!(
            &err,
            ForecastError::UnexpectedMessageType { array, actual, .. }
                if array == "east" && actual == "error"
        ));
        assert_eq!(err.stage(), "validate");
    }

    #[tokio::test]
    async fn test_unknown_timezone_aborts() {
        let mut source = MockForecastSource::new();
        source
            .expect_estimate()
            .times(1)
            .returning(|_| Ok(response("success", "Nowhere/Special", &[("2024-01-01 12:00:00", 5)])));

        let arrays = [array("east", -90.0), array("west", 90.0)];
        let err = fetch_all(&source, &location(), &arrays).await.unwrap_err();

        assert!(matches!(
            &err,
            ForecastError::Normalize { source: NormalizeError::UnknownTimezone(zone), .. }
                if zone == "Nowhere/Special"
        ));
        assert_eq!(err.stage(), "normalize");
    }

    #[test]
    fn test_success_without_result_yields_empty_series() {
        let mut resp = ok_response();
        resp.result = None;

        let forecast = into_forecast("east", resp).unwrap();

        assert_eq!(forecast.point_count(), 0);
    }
}
