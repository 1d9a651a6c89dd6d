//! Macro time-series overlay (rates, indices) from the observations API.

use serde::Deserialize;
use serde_json::Value;

use crate::data::http::{FetchClient, FetchError};
use crate::domain::point::ProjectionPoint;
use crate::domain::timeframe::TimeWindow;
use crate::utils::time_utils::{date_string_to_epoch_ms, epoch_ms_to_date_string};

#[derive(Deserialize)]
struct ObservationsRaw {
    observations: Vec<ObservationRaw>,
}

#[derive(Deserialize)]
struct ObservationRaw {
    date: String,
    value: String,
}

/// Map raw observations into points, discarding any with an unparseable
/// date or a non-numeric value (the provider writes "." for missing days).
pub fn parse_observations(value: &Value) -> Result<Vec<ProjectionPoint>, String> {
    let raw: ObservationsRaw = serde_json::from_value(value.clone())
        .map_err(|e| format!("body is not an observations response ({})", e))?;

    Ok(raw
        .observations
        .into_iter()
        .filter_map(|obs| {
            let timestamp_ms = date_string_to_epoch_ms(&obs.date)?;
            let parsed = obs.value.trim().parse::<f64>().ok()?;
            parsed.is_finite().then_some(ProjectionPoint {
                timestamp_ms,
                value: parsed,
            })
        })
        .collect())
}

/// Fetch one macro series over a window. The provider takes calendar-date
/// bounds, so the window converts to `YYYY-MM-DD` strings on the way out.
pub async fn fetch_macro_series(
    client: &FetchClient,
    base_url: &str,
    series_id: &str,
    window: TimeWindow,
) -> Result<Vec<ProjectionPoint>, FetchError> {
    let series_id = series_id.trim();
    if series_id.is_empty() {
        return Err(FetchError::Config(
            "macro overlay needs a series id".to_string(),
        ));
    }

    let query = [
        ("series_id", series_id.to_string()),
        ("observation_start", epoch_ms_to_date_string(window.start_ms)),
        ("observation_end", epoch_ms_to_date_string(window.end_ms)),
        ("file_type", "json".to_string()),
    ];
    let raw = client.get_raw(base_url, &query).await?;
    let value = raw.json()?;
    parse_observations(&value).map_err(|detail| raw.invalid_body(detail))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn observations_map_to_points() {
        let value = json!({
            "observations": [
                {"date": "2024-06-01", "value": "5.25"},
                {"date": "2024-06-02", "value": "5.30"}
            ]
        });
        let points = parse_observations(&value).unwrap();
        assert_eq!(points.len(), 2);
        assert!((points[0].value - 5.25).abs() < 1e-9);
        assert_eq!(
            points[0].timestamp_ms,
            date_string_to_epoch_ms("2024-06-01").unwrap()
        );
    }

    #[test]
    fn missing_value_markers_and_bad_dates_are_dropped() {
        let value = json!({
            "observations": [
                {"date": "2024-06-01", "value": "."},
                {"date": "June 2nd", "value": "5.0"},
                {"date": "2024-06-03", "value": "5.1"}
            ]
        });
        let points = parse_observations(&value).unwrap();
        assert_eq!(points.len(), 1);
        assert!((points[0].value - 5.1).abs() < 1e-9);
    }

    #[test]
    fn wrong_shape_is_an_error() {
        assert!(parse_observations(&json!({"candles": []})).is_err());
    }
}
