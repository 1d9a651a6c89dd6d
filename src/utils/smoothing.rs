//! Day-bucket aggregation and exponential smoothing for overlay series.

use std::collections::BTreeMap;

use crate::domain::point::ProjectionPoint;
use crate::utils::time_utils::floor_to_utc_day;

/// Collapse points onto UTC calendar days, averaging same-day duplicates.
/// Output is sorted by day (BTreeMap keeps the order for us).
pub fn bucket_by_utc_day(points: &[ProjectionPoint]) -> Vec<ProjectionPoint> {
    let mut buckets: BTreeMap<i64, (f64, usize)> = BTreeMap::new();
    for p in points {
        let day = floor_to_utc_day(p.timestamp_ms);
        let entry = buckets.entry(day).or_insert((0.0, 0));
        entry.0 += p.value;
        entry.1 += 1;
    }
    buckets
        .into_iter()
        .map(|(day, (sum, n))| ProjectionPoint {
            timestamp_ms: day,
            value: sum / n as f64,
        })
        .collect()
}

/// Exponential moving average seeded with the first value.
///
/// Each output is clamped to `[clamp_min, clamp_max]` so a wild outlier in
/// upstream poll data cannot drag the smoothed line off the chart.
pub fn ema_smooth(
    points: &[ProjectionPoint],
    alpha: f64,
    clamp_min: f64,
    clamp_max: f64,
) -> Vec<ProjectionPoint> {
    let mut out = Vec::with_capacity(points.len());
    let mut prev: Option<f64> = None;
    for p in points {
        let smoothed = match prev {
            None => p.value,
            Some(last) => alpha * p.value + (1.0 - alpha) * last,
        };
        let clamped = smoothed.clamp(clamp_min, clamp_max);
        prev = Some(clamped);
        out.push(ProjectionPoint {
            timestamp_ms: p.timestamp_ms,
            value: clamped,
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::time_utils::TimeUtils;

    fn point(ts: i64, value: f64) -> ProjectionPoint {
        ProjectionPoint {
            timestamp_ms: ts,
            value,
        }
    }

    #[test]
    fn same_day_points_average_to_one_bucket() {
        let day = 19_000 * TimeUtils::MS_IN_D;
        let pts = vec![
            point(day + TimeUtils::MS_IN_H, 40.0),
            point(day + TimeUtils::MS_IN_H * 5, 42.0),
            point(day + TimeUtils::MS_IN_H * 9, 44.0),
        ];
        let daily = bucket_by_utc_day(&pts);
        assert_eq!(daily.len(), 1);
        assert_eq!(daily[0].timestamp_ms, day);
        assert!((daily[0].value - 42.0).abs() < 1e-9);
    }

    #[test]
    fn buckets_stay_sorted_across_days() {
        let day = 19_000 * TimeUtils::MS_IN_D;
        let pts = vec![
            point(day + TimeUtils::MS_IN_D, 50.0),
            point(day, 40.0),
            point(day + TimeUtils::MS_IN_D * 2, 60.0),
        ];
        let daily = bucket_by_utc_day(&pts);
        let days: Vec<i64> = daily.iter().map(|p| p.timestamp_ms).collect();
        assert_eq!(
            days,
            vec![day, day + TimeUtils::MS_IN_D, day + TimeUtils::MS_IN_D * 2]
        );
    }

    #[test]
    fn ema_seeds_with_first_value() {
        let pts = vec![point(0, 50.0), point(1, 60.0)];
        let smoothed = ema_smooth(&pts, 0.35, 0.0, 100.0);
        assert_eq!(smoothed[0].value, 50.0);
        // 0.35 * 60 + 0.65 * 50 = 53.5
        assert!((smoothed[1].value - 53.5).abs() < 1e-9);
    }

    #[test]
    fn ema_clamps_to_bounds() {
        let pts = vec![point(0, 150.0), point(1, -20.0)];
        let smoothed = ema_smooth(&pts, 0.35, 0.0, 100.0);
        assert_eq!(smoothed[0].value, 100.0);
        assert!(smoothed[1].value >= 0.0 && smoothed[1].value <= 100.0);
    }
}
