//! Timeframe configuration

use crate::domain::timeframe::{Granularity, Timeframe};
use crate::utils::TimeUtils;

/// One named timeframe's fetch parameters.
pub struct TimeframeConfig {
    /// Cap on points requested from a provider for this timeframe
    pub point_budget: usize,
    /// Lookback from "now"; `None` means unbounded (All/Custom)
    pub lookback_ms: Option<i64>,
    /// Fixed sampling granularity; Custom infers its own from the span
    pub granularity: Granularity,
}

/// The Master Timeframe Configuration
pub struct TimeframesConfig {
    pub d1: TimeframeConfig,
    pub d7: TimeframeConfig,
    pub d30: TimeframeConfig,
    pub all: TimeframeConfig,
    pub custom: TimeframeConfig,

    /// Smoothing factor for the approval overlay's EMA
    pub approval_ema_alpha: f64,
    /// Daily points needed before smoothing kicks in
    pub approval_smoothing_min_points: usize,
}

impl TimeframesConfig {
    pub fn config_for(&self, timeframe: Timeframe) -> &TimeframeConfig {
        match timeframe {
            Timeframe::D1 => &self.d1,
            Timeframe::D7 => &self.d7,
            Timeframe::D30 => &self.d30,
            Timeframe::All => &self.all,
            Timeframe::Custom => &self.custom,
        }
    }
}

pub const TIMEFRAMES: TimeframesConfig = TimeframesConfig {
    d1: TimeframeConfig {
        point_budget: 1440,
        lookback_ms: Some(TimeUtils::MS_IN_D),
        granularity: Granularity::Minute,
    },
    d7: TimeframeConfig {
        point_budget: 336,
        lookback_ms: Some(7 * TimeUtils::MS_IN_D),
        granularity: Granularity::Hour,
    },
    d30: TimeframeConfig {
        point_budget: 720,
        lookback_ms: Some(30 * TimeUtils::MS_IN_D),
        granularity: Granularity::Hour,
    },
    all: TimeframeConfig {
        point_budget: 1000,
        lookback_ms: None,
        granularity: Granularity::Day,
    },
    custom: TimeframeConfig {
        point_budget: 1000,
        lookback_ms: None,
        // Placeholder only; Custom always goes through infer_granularity
        granularity: Granularity::Hour,
    },

    approval_ema_alpha: 0.35,
    approval_smoothing_min_points: 2,
};
