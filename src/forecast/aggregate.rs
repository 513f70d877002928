use crate::domain::{ArrayForecast, Granularity, AGGREGATE_ARRAY_NAME};

/// Sums per-array forecasts into the logical "all" array.
///
/// Returns `None` when aggregation is disabled or there is nothing to sum.
/// The result starts as a copy of the first forecast (metadata included)
/// and every later forecast is added in only at instants the first one
/// already has: an instant reported solely by a later array never shows up
/// in the aggregate.
pub fn aggregate(forecasts: &[ArrayForecast], enabled: bool) -> Option<ArrayForecast> {
    if !enabled {
        return None;
    }
    let (first, rest) = forecasts.split_first()?;

    let mut total = first.clone();
    total.name = AGGREGATE_ARRAY_NAME.to_string();
    for forecast in rest {
        for granularity in Granularity::ALL {
            total
                .series_mut(granularity)
                .accumulate(forecast.series(granularity));
        }
    }
    Some(total)
}
