use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::domain::{ArrayForecast, Granularity};

/// Measurement name, after the configured prefix
pub const MEASUREMENT: &str = "energy_forecast";

/// One InfluxDB point carrying a single integer field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Point {
    pub measurement: String,
    pub tags: BTreeMap<&'static str, String>,
    pub field: &'static str,
    pub value: i64,
    pub timestamp: DateTime<Utc>,
}

impl Point {
    /// Line protocol with second precision. Tags with empty values are
    /// left out since InfluxDB cannot store them.
    pub fn to_line(&self) -> String {
        let mut line = escape(&self.measurement, &[',', ' ']);
        for (key, value) in &self.tags {
            if value.is_empty() {
                continue;
            }
            line.push(',');
            line.push_str(&escape(key, &[',', '=', ' ']));
            line.push('=');
            line.push_str(&escape(value, &[',', '=', ' ']));
        }
        line.push(' ');
        line.push_str(&escape(self.field, &[',', '=', ' ']));
        line.push('=');
        line.push_str(&format!("{}i {}", self.value, self.timestamp.timestamp()));
        line
    }
}

/// Backslash-escapes `special`. Line breaks would end the point, so they
/// become escaped spaces.
fn escape(raw: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\r' | '\n' => out.push_str("\\ "),
            c if special.contains(&c) => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out
}

pub fn forecast_tags(forecast: &ArrayForecast) -> BTreeMap<&'static str, String> {
    BTreeMap::from([
        ("array_name", forecast.name.clone()),
        ("site", forecast.site.place.clone()),
        ("site_latitude", format!("{:.6}", forecast.site.latitude)),
        ("site_longitude", format!("{:.6}", forecast.site.longitude)),
    ])
}

/// All points of a forecast: instantaneous, hourly, then daily, each in
/// time order.
pub fn forecast_points<'a>(
    forecast: &'a ArrayForecast,
    measurement: &'a str,
) -> impl Iterator<Item = Point> + 'a {
    let tags = forecast_tags(forecast);
    Granularity::ALL.into_iter().flat_map(move |granularity| {
        let tags = tags.clone();
        forecast
            .series(granularity)
            .iter()
            .map(move |(timestamp, value)| Point {
                measurement: measurement.to_string(),
                tags: tags.clone(),
                field: granularity.field_name(),
                value,
                timestamp,
            })
    })
}
