use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Reserved name of the logical array that sums all configured arrays.
pub const AGGREGATE_ARRAY_NAME: &str = "all";

/// Series as returned by forecast.solar: local wall-clock string -> value.
pub type RawSeries = BTreeMap<String, i64>;

/// Reporting cadence of a forecast series
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    /// Instantaneous production (W)
    Instantaneous,
    /// Cumulative production per hour (Wh)
    Hourly,
    /// Cumulative production per day (Wh), anchored at 23:59:59 local time
    Daily,
}

impl Granularity {
    pub const ALL: [Granularity; 3] = [Self::Instantaneous, Self::Hourly, Self::Daily];

    /// InfluxDB field name the series is written under
    pub fn field_name(&self) -> &'static str {
        match self {
            Self::Instantaneous => "instantaneous_production_watts",
            Self::Hourly => "cumulative_production_watt_hours_hourly",
            Self::Daily => "cumulative_production_watt_hours_daily",
        }
    }
}

/// Series keyed by absolute instant
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedSeries(BTreeMap<DateTime<Utc>, i64>);

impl NormalizedSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, instant: DateTime<Utc>, value: i64) -> Option<i64> {
        self.0.insert(instant, value)
    }

    pub fn get(&self, instant: &DateTime<Utc>) -> Option<i64> {
        self.0.get(instant).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries in ascending time order
    pub fn iter(&self) -> impl Iterator<Item = (DateTime<Utc>, i64)> + '_ {
        self.0.iter().map(|(instant, value)| (*instant, *value))
    }

    /// Adds `other` into `self` at instants `self` already holds.
    ///
    /// Instants only present in `other` are ignored, so the key set of the
    /// accumulator never grows. Sums saturate at the `i64` bounds.
    pub fn accumulate(&mut self, other: &NormalizedSeries) {
        for (instant, value) in self.0.iter_mut() {
            if let Some(extra) = other.0.get(instant) {
                *value = value.saturating_add(*extra);
            }
        }
    }
}

impl FromIterator<(DateTime<Utc>, i64)> for NormalizedSeries {
    fn from_iter<I: IntoIterator<Item = (DateTime<Utc>, i64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Site metadata reported by the API alongside a forecast
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SiteInfo {
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
    #[serde(default)]
    pub place: String,
    #[serde(default)]
    pub timezone: String,
}

/// API quota counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct RateLimit {
    /// Window length in seconds
    #[serde(default)]
    pub period: i64,
    #[serde(default)]
    pub limit: i64,
    #[serde(default)]
    pub remaining: i64,
}

/// Normalized forecast of one array (or of the aggregate)
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayForecast {
    pub name: String,
    pub site: SiteInfo,
    pub rate_limit: RateLimit,
    pub watts: NormalizedSeries,
    pub watt_hours: NormalizedSeries,
    pub watt_hours_day: NormalizedSeries,
}

impl ArrayForecast {
    pub fn series(&self, granularity: Granularity) -> &NormalizedSeries {
        match granularity {
            Granularity::Instantaneous => &self.watts,
            Granularity::Hourly => &self.watt_hours,
            Granularity::Daily => &self.watt_hours_day,
        }
    }

    pub fn series_mut(&mut self, granularity: Granularity) -> &mut NormalizedSeries {
        match granularity {
            Granularity::Instantaneous => &mut self.watts,
            Granularity::Hourly => &mut self.watt_hours,
            Granularity::Daily => &mut self.watt_hours_day,
        }
    }

    pub fn is_aggregate(&self) -> bool {
        self.name == AGGREGATE_ARRAY_NAME
    }

    /// Total number of points across all granularities
    pub fn point_count(&self) -> usize {
        Granularity::ALL
            .iter()
            .map(|g| self.series(*g).len())
            .sum()
    }
}
