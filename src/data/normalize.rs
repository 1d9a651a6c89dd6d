//! Normalizes heterogeneous upstream history shapes into `MarketHistory`.
//!
//! Two shapes exist in the wild: the canonical one our own relay produces,
//! and the provider candlestick list. Detection is decode-and-fallback: try
//! canonical first, then candlesticks, and only if neither matches is the
//! body invalid.

use serde::Deserialize;
use serde_json::Value;

use crate::config::PRINT_NORMALIZE_STATS;
use crate::domain::candle::{Candle, MarketHistory};

// --- Shape (a): canonical --------------------------------------------------

#[derive(Deserialize)]
struct CanonicalHistoryRaw {
    #[serde(rename = "marketId")]
    market_id: String,
    candles: Vec<CanonicalCandleRaw>,
}

#[derive(Deserialize)]
struct CanonicalCandleRaw {
    timestamp: i64,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    updates: u64,
}

// --- Shape (b): provider candlestick list ----------------------------------

#[derive(Deserialize)]
struct CandlestickListRaw {
    ticker: String,
    candlesticks: Vec<CandlestickRaw>,
}

#[derive(Deserialize, Default)]
struct CandlestickRaw {
    /// Period end in SECONDS since epoch (provider convention)
    end_period_ts: Option<i64>,
    price: Option<RawOhlc>,
    yes_bid: Option<RawOhlc>,
    volume: Option<u64>,
    volume_fp: Option<String>,
}

/// Provider OHLC object. Integer fields are cents; `_dollars` fields are
/// decimal strings. Sparse markets omit any subset of these.
#[derive(Deserialize, Default)]
struct RawOhlc {
    open: Option<i64>,
    high: Option<i64>,
    low: Option<i64>,
    close: Option<i64>,
    open_dollars: Option<String>,
    high_dollars: Option<String>,
    low_dollars: Option<String>,
    close_dollars: Option<String>,
}

/// Resolve one OHLC component. Decimal-string dollars take precedence over
/// integer cents when both are present. Anything unusable comes back NaN,
/// which fails the completeness check downstream and drops the candle.
/// That is data-quality filtering, not an error path.
fn resolve_price(cents: Option<i64>, dollars: Option<&String>) -> f64 {
    if let Some(d) = dollars {
        d.trim().parse::<f64>().unwrap_or(f64::NAN)
    } else if let Some(c) = cents {
        c as f64 / 100.0
    } else {
        f64::NAN
    }
}

fn candle_from_candlestick(raw: &CandlestickRaw) -> Option<Candle> {
    let timestamp_ms = raw.end_period_ts? * 1000;
    let ohlc = raw.price.as_ref().or(raw.yes_bid.as_ref())?;

    let open = resolve_price(ohlc.open, ohlc.open_dollars.as_ref());
    let high = resolve_price(ohlc.high, ohlc.high_dollars.as_ref());
    let low = resolve_price(ohlc.low, ohlc.low_dollars.as_ref());
    let close = resolve_price(ohlc.close, ohlc.close_dollars.as_ref());
    // All four must be present and numeric or the candlestick is dropped
    if !(open.is_finite() && high.is_finite() && low.is_finite() && close.is_finite()) {
        return None;
    }

    let updates = match (raw.volume, raw.volume_fp.as_ref()) {
        (Some(v), _) => v,
        (None, Some(fp)) => fp.trim().parse::<f64>().map(|v| v.round() as u64).unwrap_or(0),
        (None, None) => 0,
    };

    Some(Candle {
        timestamp_ms,
        open,
        high,
        low,
        close,
        updates,
    })
}

/// Decode an upstream history body of either shape.
///
/// Returns a detail string on failure; the caller owns the response context
/// and wraps it into the InvalidBody error.
pub fn normalize_history(value: &Value) -> Result<MarketHistory, String> {
    if let Ok(canonical) = serde_json::from_value::<CanonicalHistoryRaw>(value.clone()) {
        let candles = canonical
            .candles
            .into_iter()
            .map(|c| Candle {
                timestamp_ms: c.timestamp,
                open: c.open,
                high: c.high,
                low: c.low,
                close: c.close,
                updates: c.updates,
            })
            .collect();
        return Ok(MarketHistory {
            market_id: canonical.market_id,
            candles,
        });
    }

    match serde_json::from_value::<CandlestickListRaw>(value.clone()) {
        Ok(list) => {
            let total = list.candlesticks.len();
            let candles: Vec<Candle> = list
                .candlesticks
                .iter()
                .filter_map(candle_from_candlestick)
                .collect();
            if PRINT_NORMALIZE_STATS {
                log::info!(
                    "{}: kept {} of {} candlesticks",
                    list.ticker,
                    candles.len(),
                    total
                );
            }
            Ok(MarketHistory {
                market_id: list.ticker,
                candles,
            })
        }
        Err(e) => Err(format!(
            "body matches neither the canonical history shape nor the candlestick shape ({})",
            e
        )),
    }
}
