use serde::{Deserialize, Serialize};

use crate::domain::candle::MarketHistory;

/// Canonical form for any derived or overlay series (seat projection,
/// approval %, macro index). Every fetcher converges on this shape.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProjectionPoint {
    pub timestamp_ms: i64,
    pub value: f64,
}

/// The primary series' observed time extent. Overlays are clipped to this so
/// every series shares the same horizontal range on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesBounds {
    pub start_ms: i64,
    pub end_ms: i64,
}

impl SeriesBounds {
    /// Bounds of a candle history, `None` when it is empty.
    pub fn of_history(history: &MarketHistory) -> Option<Self> {
        match (history.first_timestamp_ms(), history.last_timestamp_ms()) {
            (Some(start_ms), Some(end_ms)) => Some(Self { start_ms, end_ms }),
            _ => None,
        }
    }

    pub fn contains(&self, timestamp_ms: i64) -> bool {
        self.start_ms <= timestamp_ms && timestamp_ms <= self.end_ms
    }
}

/// Restrict a point sequence to `bounds`, inclusive on both ends.
///
/// `None` bounds (primary series empty) is the identity: with nothing to
/// align to, an overlay keeps its native range.
pub fn clip_points(points: Vec<ProjectionPoint>, bounds: Option<&SeriesBounds>) -> Vec<ProjectionPoint> {
    match bounds {
        None => points,
        Some(b) => points
            .into_iter()
            .filter(|p| b.contains(p.timestamp_ms))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::candle::Candle;

    fn point(ts: i64) -> ProjectionPoint {
        ProjectionPoint {
            timestamp_ms: ts,
            value: ts as f64,
        }
    }

    #[test]
    fn clip_with_no_bounds_is_identity() {
        let pts = vec![point(1), point(5), point(9)];
        assert_eq!(clip_points(pts.clone(), None), pts);
    }

    #[test]
    fn clip_keeps_inclusive_subsequence_in_order() {
        let pts = vec![point(1), point(3), point(5), point(7), point(9)];
        let bounds = SeriesBounds {
            start_ms: 3,
            end_ms: 7,
        };
        let clipped = clip_points(pts, Some(&bounds));
        let ts: Vec<i64> = clipped.iter().map(|p| p.timestamp_ms).collect();
        assert_eq!(ts, vec![3, 5, 7]);
    }

    #[test]
    fn bounds_of_empty_history_is_none() {
        assert!(SeriesBounds::of_history(&MarketHistory::default()).is_none());
    }

    #[test]
    fn bounds_span_first_to_last_candle() {
        let history = MarketHistory {
            market_id: "m".into(),
            candles: vec![
                Candle {
                    timestamp_ms: 10,
                    open: 0.1,
                    high: 0.1,
                    low: 0.1,
                    close: 0.1,
                    updates: 0,
                },
                Candle {
                    timestamp_ms: 30,
                    open: 0.2,
                    high: 0.2,
                    low: 0.2,
                    close: 0.2,
                    updates: 0,
                },
            ],
        };
        let bounds = SeriesBounds::of_history(&history).unwrap();
        assert_eq!(bounds.start_ms, 10);
        assert_eq!(bounds.end_ms, 30);
    }
}
