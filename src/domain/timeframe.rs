use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

use crate::config::TIMEFRAMES;
use crate::utils::TimeUtils;

/// Absolute `[start, end]` window in epoch milliseconds.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeWindow {
    pub start_ms: i64,
    pub end_ms: i64,
}

impl TimeWindow {
    pub fn span_ms(&self) -> i64 {
        self.end_ms - self.start_ms
    }
}

/// Sampling period requested from an upstream provider.
#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum Granularity {
    Minute,
    Hour,
    Day,
}

impl Granularity {
    /// The `period_interval` query parameter the candlestick provider takes.
    pub fn period_minutes(&self) -> i64 {
        match self {
            Granularity::Minute => 1,
            Granularity::Hour => 60,
            Granularity::Day => 1440,
        }
    }

    /// Shorthand label (e.g. `1m`, `1h`) for logs and display.
    pub fn label(&self) -> &'static str {
        match self {
            Granularity::Minute => "1m",
            Granularity::Hour => "1h",
            Granularity::Day => "1d",
        }
    }
}

/// The fixed timeframe choices offered by the chart.
#[derive(
    Serialize,
    Deserialize,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Display,
    EnumIter,
    EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum Timeframe {
    #[strum(serialize = "1d")]
    D1,
    #[default]
    #[strum(serialize = "7d")]
    D7,
    #[strum(serialize = "30d")]
    D30,
    #[strum(serialize = "all")]
    All,
    #[strum(serialize = "custom")]
    Custom,
}

impl Timeframe {
    /// Upper bound on points we ask a provider for under this timeframe.
    pub fn point_budget(&self) -> usize {
        TIMEFRAMES.config_for(*self).point_budget
    }

    /// Fixed sampling granularity, or the span-inferred one for `Custom`.
    pub fn granularity(&self, window: &TimeWindow) -> Granularity {
        match self {
            Timeframe::Custom => infer_granularity(window.start_ms, window.end_ms),
            _ => TIMEFRAMES.config_for(*self).granularity,
        }
    }
}

/// Compute the absolute window for a timeframe.
///
/// `Custom` uses the caller-provided range verbatim; with no range supplied
/// it degrades to `All` (the UI disables Custom until both bounds are set,
/// but the engine should not panic if it races that). `All` starts at the
/// epoch so the provider returns everything it has.
pub fn resolve_window(
    timeframe: Timeframe,
    custom: Option<TimeWindow>,
    now_ms: i64,
) -> TimeWindow {
    match (timeframe, custom) {
        (Timeframe::Custom, Some(range)) => range,
        (Timeframe::All, _) | (Timeframe::Custom, None) => TimeWindow {
            start_ms: 0,
            end_ms: now_ms,
        },
        (tf, _) => {
            let lookback = TIMEFRAMES
                .config_for(tf)
                .lookback_ms
                .unwrap_or(now_ms);
            TimeWindow {
                start_ms: now_ms - lookback,
                end_ms: now_ms,
            }
        }
    }
}

/// Pick a sampling granularity for an arbitrary custom span.
///
/// Thresholds balance upstream point-count limits against visual
/// resolution: a day-and-a-half of minutes (~2160 points) is the most a
/// provider will serve in one request, and three weeks of hours (~504) still
/// draws smoothly.
pub fn infer_granularity(start_ms: i64, end_ms: i64) -> Granularity {
    let span_ms = end_ms - start_ms;
    if span_ms <= 36 * TimeUtils::MS_IN_H {
        Granularity::Minute
    } else if span_ms <= 21 * TimeUtils::MS_IN_D {
        Granularity::Hour
    } else {
        Granularity::Day
    }
}
