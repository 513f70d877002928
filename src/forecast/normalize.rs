//! Conversion of forecast.solar wall-clock series into instant-keyed series.
//!
//! Resolving the array's timezone is all-or-nothing: an unknown zone fails
//! the whole response. Individual entries that do not parse are dropped
//! without error.

use chrono::{DateTime, Duration, LocalResult, NaiveDateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use thiserror::Error;

use super::estimate::EstimateResult;
use crate::domain::{Granularity, NormalizedSeries, RawSeries};

/// Timestamp layout used by forecast.solar
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Daily totals are reported per date and anchored to the last second of it
const END_OF_DAY_SUFFIX: &str = " 23:59:59";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("unknown timezone '{0}'")]
    UnknownTimezone(String),
}

/// The three series of one response, normalized
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedResult {
    pub watts: NormalizedSeries,
    pub watt_hours: NormalizedSeries,
    pub watt_hours_day: NormalizedSeries,
}

pub fn resolve_timezone(name: &str) -> Result<Tz, NormalizeError> {
    name.parse::<Tz>()
        .map_err(|_| NormalizeError::UnknownTimezone(name.to_string()))
}

/// Normalizes a single raw series reported in `timezone`.
pub fn normalize(
    raw: &RawSeries,
    granularity: Granularity,
    timezone: &str,
) -> Result<NormalizedSeries, NormalizeError> {
    let tz = resolve_timezone(timezone)?;
    Ok(normalize_in(raw, granularity, tz))
}

/// Normalizes all three series of a response, failing them together when
/// `timezone` cannot be resolved.
pub fn normalize_result(
    result: &EstimateResult,
    timezone: &str,
) -> Result<NormalizedResult, NormalizeError> {
    let tz = resolve_timezone(timezone)?;
    Ok(NormalizedResult {
        watts: normalize_in(&result.watts, Granularity::Instantaneous, tz),
        watt_hours: normalize_in(&result.watt_hours, Granularity::Hourly, tz),
        watt_hours_day: normalize_in(&result.watt_hours_day, Granularity::Daily, tz),
    })
}

pub fn normalize_in(raw: &RawSeries, granularity: Granularity, tz: Tz) -> NormalizedSeries {
    raw.iter()
        .filter(|(key, _)| !key.is_empty())
        .filter_map(|(key, value)| parse_entry(key, granularity, tz).map(|t| (t, *value)))
        .collect()
}

fn parse_entry(key: &str, granularity: Granularity, tz: Tz) -> Option<DateTime<Utc>> {
    let parsed = match granularity {
        Granularity::Daily => {
            NaiveDateTime::parse_from_str(&format!("{key}{END_OF_DAY_SUFFIX}"), DATE_TIME_FORMAT)
        }
        Granularity::Instantaneous | Granularity::Hourly => {
            NaiveDateTime::parse_from_str(key, DATE_TIME_FORMAT)
        }
    };
    let naive = parsed.ok()?;
    match tz.from_local_datetime(&naive) {
        // DST fall-back: the earlier of the two instants
        LocalResult::Single(local) | LocalResult::Ambiguous(local, _) => {
            Some(local.with_timezone(&Utc))
        }
        LocalResult::None => resolve_in_gap(naive, tz),
    }
}

/// Wall-clock times skipped by a DST jump are read with the offset in effect
/// before the jump, which moves them forward by the gap length
/// (02:30 becomes 03:30 on a one-hour spring-forward).
fn resolve_in_gap(naive: NaiveDateTime, tz: Tz) -> Option<DateTime<Utc>> {
    let day_before = naive.checked_sub_signed(Duration::days(1))?;
    let offset = tz.from_local_datetime(&day_before).earliest()?.offset().fix();
    let utc = naive.checked_sub_signed(Duration::seconds(offset.local_minus_utc().into()))?;
    Some(Utc.from_utc_datetime(&utc))
}
