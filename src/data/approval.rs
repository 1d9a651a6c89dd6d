//! Approval-poll overlay: windowing, daily bucketing, smoothing.
//!
//! Poll records arrive as day-dated entries with a list of named choice
//! percentages. We only chart the "approve" number; multiple polls landing
//! on the same UTC day average into one point, and once there is enough of
//! a series to smooth, an EMA takes the jitter out of house effects.

use serde_json::Value;

use crate::config::TIMEFRAMES;
use crate::data::http::{FetchClient, FetchError};
use crate::domain::point::ProjectionPoint;
use crate::domain::timeframe::TimeWindow;
use crate::utils::smoothing::{bucket_by_utc_day, ema_smooth};
use crate::utils::time_utils::{date_string_to_epoch_ms, epoch_ms_to_date_string};

/// A percentage value that may arrive as a number or a numeric string.
fn pct_value(raw: &Value) -> Option<f64> {
    let pct = match raw {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    pct.is_finite().then_some(pct)
}

/// The "approve" percentage of one poll record, matched case-insensitively
/// among the record's named choices.
fn approve_pct(record: &Value) -> Option<f64> {
    let answers = record.get("answers").and_then(Value::as_array)?;
    let approve = answers.iter().find(|a| {
        a.get("choice")
            .and_then(Value::as_str)
            .is_some_and(|c| c.eq_ignore_ascii_case("approve"))
    })?;
    pct_value(approve.get("pct")?)
}

/// Reduce raw poll records to the chartable daily approval series.
///
/// Records outside the window, without a parseable date, or without a valid
/// approve percentage are discarded. With more than
/// `approval_smoothing_min_points` daily points the series is EMA-smoothed
/// (seeded by the first daily value) and clamped to [0, 100]; a stub series
/// passes through raw.
pub fn aggregate_approval(records: &[Value], window: &TimeWindow) -> Vec<ProjectionPoint> {
    let mut raw_points = Vec::new();
    for record in records {
        let Some(date) = record.get("date").and_then(Value::as_str) else {
            continue;
        };
        let Some(timestamp_ms) = date_string_to_epoch_ms(date) else {
            continue;
        };
        if timestamp_ms < window.start_ms || timestamp_ms > window.end_ms {
            continue;
        }
        let Some(pct) = approve_pct(record) else {
            continue;
        };
        raw_points.push(ProjectionPoint {
            timestamp_ms,
            value: pct,
        });
    }

    let daily = bucket_by_utc_day(&raw_points);
    if daily.len() > TIMEFRAMES.approval_smoothing_min_points {
        ema_smooth(&daily, TIMEFRAMES.approval_ema_alpha, 0.0, 100.0)
    } else {
        daily
    }
}

/// Fetch and aggregate the approval overlay for a window.
pub async fn fetch_approval_series(
    client: &FetchClient,
    base_url: &str,
    window: TimeWindow,
) -> Result<Vec<ProjectionPoint>, FetchError> {
    let query = [
        ("start_date", epoch_ms_to_date_string(window.start_ms)),
        ("end_date", epoch_ms_to_date_string(window.end_ms)),
    ];
    let raw = client.get_raw(base_url, &query).await?;
    let value = raw.json()?;

    // The aggregator serves either a bare array or a {polls: [...]} wrapper
    let records = match value.get("polls").and_then(Value::as_array) {
        Some(array) => array.clone(),
        None => match value.as_array() {
            Some(array) => array.clone(),
            None => return Err(raw.invalid_body("poll response has no records array")),
        },
    };

    Ok(aggregate_approval(&records, &window))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::time_utils::TimeUtils;
    use serde_json::json;

    fn wide_window() -> TimeWindow {
        TimeWindow {
            start_ms: 0,
            end_ms: i64::MAX,
        }
    }

    fn record(date: &str, choice: &str, pct: f64) -> Value {
        json!({"date": date, "answers": [{"choice": choice, "pct": pct}]})
    }

    #[test]
    fn same_day_records_collapse_to_their_average() {
        let records = vec![
            record("2024-06-01", "Approve", 40.0),
            record("2024-06-01", "approve", 42.0),
            record("2024-06-01", "APPROVE", 44.0),
        ];
        let points = aggregate_approval(&records, &wide_window());
        assert_eq!(points.len(), 1);
        assert!((points[0].value - 42.0).abs() < 1e-9);
    }

    #[test]
    fn records_outside_window_are_dropped() {
        let window = TimeWindow {
            start_ms: date_string_to_epoch_ms("2024-06-01").unwrap(),
            end_ms: date_string_to_epoch_ms("2024-06-02").unwrap() + TimeUtils::MS_IN_D - 1,
        };
        let records = vec![
            record("2024-05-31", "Approve", 40.0),
            record("2024-06-01", "Approve", 41.0),
            record("2024-06-10", "Approve", 60.0),
        ];
        let points = aggregate_approval(&records, &window);
        assert_eq!(points.len(), 1);
        assert!((points[0].value - 41.0).abs() < 1e-9);
    }

    #[test]
    fn records_without_approve_or_pct_are_dropped() {
        let records = vec![
            json!({"date": "2024-06-01", "answers": [{"choice": "Disapprove", "pct": 55.0}]}),
            json!({"date": "2024-06-02", "answers": [{"choice": "Approve"}]}),
            json!({"date": "2024-06-03", "answers": [{"choice": "Approve", "pct": "n/a"}]}),
            json!({"answers": [{"choice": "Approve", "pct": 44.0}]}),
        ];
        assert!(aggregate_approval(&records, &wide_window()).is_empty());
    }

    #[test]
    fn two_or_fewer_daily_points_pass_through_raw() {
        let records = vec![
            record("2024-06-01", "Approve", 50.0),
            record("2024-06-02", "Approve", 60.0),
        ];
        let points = aggregate_approval(&records, &wide_window());
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].value, 50.0);
        assert_eq!(points[1].value, 60.0);
    }

    #[test]
    fn longer_series_is_ema_smoothed() {
        let records = vec![
            record("2024-06-01", "Approve", 50.0),
            record("2024-06-02", "Approve", 60.0),
            record("2024-06-03", "Approve", 60.0),
        ];
        let points = aggregate_approval(&records, &wide_window());
        assert_eq!(points.len(), 3);
        // Seeded with the first value, then alpha=0.35 steps
        assert_eq!(points[0].value, 50.0);
        assert!((points[1].value - 53.5).abs() < 1e-9);
        assert!((points[2].value - (0.35 * 60.0 + 0.65 * 53.5)).abs() < 1e-9);
    }

    #[test]
    fn string_percentages_parse() {
        let records = vec![json!({
            "date": "2024-06-01",
            "answers": [{"choice": "Approve", "pct": "47.5"}]
        })];
        let points = aggregate_approval(&records, &wide_window());
        assert!((points[0].value - 47.5).abs() < 1e-9);
    }
}
