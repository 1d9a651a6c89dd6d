use crate::config::PROVIDERS;
use crate::data::SeriesData;
use crate::domain::timeframe::{Granularity, TimeWindow, Timeframe};

/// Identifies one chartable series in the view.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SeriesId {
    /// The primary market price series everything else aligns to
    Price,
    SeatProjection,
    Approval,
    Macro,
    Headlines,
    /// A user-added comparison market, keyed by its overlay id
    Custom(u32),
}

impl std::fmt::Display for SeriesId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            SeriesId::Price => write!(f, "price"),
            SeriesId::SeatProjection => write!(f, "seat-projection"),
            SeriesId::Approval => write!(f, "approval"),
            SeriesId::Macro => write!(f, "macro"),
            SeriesId::Headlines => write!(f, "headlines"),
            SeriesId::Custom(id) => write!(f, "custom-{}", id),
        }
    }
}

/// What a worker is asked to pull for a series.
#[derive(Debug, Clone)]
pub enum FetchSpec {
    /// Price history of a single market (primary or custom overlay)
    MarketHistory {
        ticker: String,
        series_key: Option<String>,
    },
    SeatProjection {
        event_ticker: String,
        /// Reference timeline from the primary series, when it has one
        primary_timestamps: Option<Vec<i64>>,
    },
    Approval,
    Macro {
        series_id: String,
    },
    Headlines,
}

/// A request to fetch one series
#[derive(Debug, Clone)]
pub struct FetchJob {
    pub series: SeriesId,
    /// Generation the dispatch was made under; outcomes from an older
    /// generation are dropped so a slow stale response can never overwrite
    /// a newer fetch
    pub generation: u64,
    pub spec: FetchSpec,
    pub window: TimeWindow,
    pub granularity: Granularity,
    pub point_budget: usize,
    pub timeframe: Timeframe,
    pub custom_range: Option<TimeWindow>,
}

impl FetchJob {
    /// The window part of the cache key is the REACTIVE key (timeframe or
    /// explicit custom bounds), not the resolved absolute window. A
    /// resolved window moves with the clock every dispatch and would never
    /// hit.
    fn window_tag(&self) -> String {
        match (self.timeframe, self.custom_range) {
            (Timeframe::Custom, Some(range)) => {
                format!("custom:{}-{}", range.start_ms, range.end_ms)
            }
            (tf, _) => tf.to_string(),
        }
    }

    /// Composite cache key for this request.
    pub fn cache_key(&self) -> String {
        match &self.spec {
            FetchSpec::MarketHistory { ticker, series_key } => format!(
                "history:{}:{}:{}",
                ticker,
                series_key.as_deref().unwrap_or("-"),
                self.window_tag()
            ),
            FetchSpec::SeatProjection { event_ticker, .. } => {
                format!("seats:{}:{}", event_ticker, self.window_tag())
            }
            FetchSpec::Approval => format!("approval:{}", self.window_tag()),
            FetchSpec::Macro { series_id } => {
                format!("macro:{}:{}", series_id, self.window_tag())
            }
            FetchSpec::Headlines => "headlines".to_string(),
        }
    }

    /// How long a successful result for this request stays fresh.
    pub fn cache_ttl_ms(&self) -> i64 {
        match &self.spec {
            FetchSpec::MarketHistory { .. } => PROVIDERS.market.cache_ttl_ms,
            FetchSpec::SeatProjection { .. } => PROVIDERS.events.cache_ttl_ms,
            FetchSpec::Approval => PROVIDERS.polls.cache_ttl_ms,
            FetchSpec::Macro { .. } => PROVIDERS.macro_series.cache_ttl_ms,
            FetchSpec::Headlines => PROVIDERS.news.cache_ttl_ms,
        }
    }
}

/// The result returned by a fetch worker
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub series: SeriesId,
    pub generation: u64,
    pub duration_ms: u128,

    // Success: the new front buffer for this series
    // Failure: the error string shown inline for it
    pub result: Result<SeriesData, String>,

    /// Where to file a success in the query cache
    pub cache_key: String,
    pub cache_ttl_ms: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(spec: FetchSpec, timeframe: Timeframe, custom: Option<TimeWindow>) -> FetchJob {
        FetchJob {
            series: SeriesId::Price,
            generation: 1,
            spec,
            window: TimeWindow {
                start_ms: 123,
                end_ms: 456,
            },
            granularity: Granularity::Hour,
            point_budget: 100,
            timeframe,
            custom_range: custom,
        }
    }

    #[test]
    fn cache_key_ignores_the_resolved_window_for_named_timeframes() {
        let spec = FetchSpec::MarketHistory {
            ticker: "KXSENATE-26-R".into(),
            series_key: None,
        };
        let mut a = job(spec.clone(), Timeframe::D7, None);
        let mut b = job(spec, Timeframe::D7, None);
        // Same reactive key, different resolved windows (clock moved)
        a.window = TimeWindow {
            start_ms: 0,
            end_ms: 1,
        };
        b.window = TimeWindow {
            start_ms: 5,
            end_ms: 9,
        };
        assert_eq!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn custom_ranges_key_on_their_exact_bounds() {
        let spec = FetchSpec::Approval;
        let a = job(
            spec.clone(),
            Timeframe::Custom,
            Some(TimeWindow {
                start_ms: 1,
                end_ms: 2,
            }),
        );
        let b = job(
            spec,
            Timeframe::Custom,
            Some(TimeWindow {
                start_ms: 1,
                end_ms: 3,
            }),
        );
        assert_ne!(a.cache_key(), b.cache_key());
    }
}
