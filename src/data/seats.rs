//! Weighted seat-count projection over a basket of strike markets.
//!
//! An event groups markets like "party wins ≥ N seats" for a ladder of N.
//! Each market's price is the market-implied probability of clearing its
//! threshold, so a price-weighted average of the thresholds reads as the
//! market's expected seat count. The basket is fetched concurrently and the
//! average is evaluated on a shared reference timeline.

use futures::future::join_all;
use itertools::Itertools;
use serde_json::Value;

use crate::data::http::{FetchClient, FetchError};
use crate::data::market::fetch_history_windowed;
use crate::domain::candle::MarketHistory;
use crate::domain::point::ProjectionPoint;
use crate::domain::timeframe::{Granularity, TimeWindow};
use crate::utils::search::last_close_at_or_before;

/// One constituent of the basket: a market plus its numeric threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct SeatMarket {
    pub ticker: String,
    pub seat_count: f64,
}

/// Read the seat threshold out of a market object's metadata.
///
/// Upstream emits the key in two spellings depending on which ingestion
/// path created the market, and the value may be a number or a numeric
/// string. Anything else means the market carries no usable threshold.
fn seat_count_of(market: &Value) -> Option<f64> {
    let metadata = market.get("metadata")?;
    let raw = metadata
        .get("seat_count")
        .or_else(|| metadata.get("SEAT_COUNT"))?;
    match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Extract the qualifying strike markets from an event response.
///
/// Markets without a parseable threshold are discarded, not errors; an
/// event whose markets ALL lack one yields an empty vec and the caller
/// refuses to project from nothing.
pub fn resolve_strike_markets(event: &Value) -> Result<Vec<SeatMarket>, String> {
    let markets = event
        .get("markets")
        .and_then(Value::as_array)
        .ok_or_else(|| "event response has no markets array".to_string())?;

    Ok(markets
        .iter()
        .filter_map(|m| {
            let ticker = m.get("ticker").and_then(Value::as_str)?;
            let seat_count = seat_count_of(m)?;
            Some(SeatMarket {
                ticker: ticker.to_string(),
                seat_count,
            })
        })
        .collect())
}

/// The shared timeline the projection is evaluated on: the primary series'
/// own timestamps when it has any, else the sorted union of the basket's.
pub fn reference_timestamps(
    primary: Option<&[i64]>,
    histories: &[MarketHistory],
) -> Vec<i64> {
    match primary {
        Some(ts) => ts.to_vec(),
        None => histories
            .iter()
            .flat_map(|h| h.candles.iter().map(|c| c.timestamp_ms))
            .sorted()
            .dedup()
            .collect(),
    }
}

/// Evaluate the weighted seat estimate at each reference timestamp.
///
/// At T, each market's weight is its last price at-or-before T. A market
/// with no quote yet contributes nothing, and so does one priced exactly
/// 0.0: zero weight is zero evidence, even from a real near-certain-no
/// market. A point is emitted only when some weight exists at all.
pub fn compute_weighted_projection(
    basket: &[(SeatMarket, MarketHistory)],
    reference_ts: &[i64],
) -> Vec<ProjectionPoint> {
    let mut points = Vec::with_capacity(reference_ts.len());
    for &t in reference_ts {
        let mut numerator = 0.0;
        let mut denominator = 0.0;
        for (market, history) in basket {
            if let Some(weight) = last_close_at_or_before(&history.candles, t) {
                numerator += market.seat_count * weight;
                denominator += weight;
            }
        }
        if denominator > 0.0 {
            points.push(ProjectionPoint {
                timestamp_ms: t,
                value: numerator / denominator,
            });
        }
    }
    points
}

/// Fetch the full projection for an event.
///
/// The per-market history fetches fan out concurrently and are joined
/// before the weighted series is computed; a single failing sub-fetch
/// fails the whole projection, there is no partial-basket degradation.
#[allow(clippy::too_many_arguments)]
pub async fn fetch_seat_projection(
    client: &FetchClient,
    events_base_url: &str,
    market_base_url: &str,
    event_ticker: &str,
    window: TimeWindow,
    granularity: Granularity,
    point_budget: usize,
    primary_timestamps: Option<Vec<i64>>,
) -> Result<Vec<ProjectionPoint>, FetchError> {
    let event_ticker = event_ticker.trim();
    if event_ticker.is_empty() {
        return Err(FetchError::Config(
            "seat projection needs an event ticker".to_string(),
        ));
    }

    let url = format!("{}/{}", events_base_url.trim_end_matches('/'), event_ticker);
    let raw = client.get_raw(&url, &[]).await?;
    let event = raw.json()?;
    let basket = resolve_strike_markets(&event).map_err(|detail| raw.invalid_body(detail))?;
    if basket.is_empty() {
        return Err(FetchError::Config(format!(
            "event {} has no strike markets with a parseable seat count",
            event_ticker
        )));
    }

    let fetches = basket.iter().map(|market| {
        fetch_history_windowed(
            client,
            market_base_url,
            &market.ticker,
            None,
            window,
            granularity,
            point_budget,
        )
    });
    let results: Vec<Result<MarketHistory, FetchError>> = join_all(fetches).await;

    let mut histories = Vec::with_capacity(results.len());
    for result in results {
        histories.push(result?);
    }

    let reference = reference_timestamps(primary_timestamps.as_deref(), &histories);
    let paired: Vec<(SeatMarket, MarketHistory)> =
        basket.into_iter().zip(histories).collect();
    Ok(compute_weighted_projection(&paired, &reference))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::candle::Candle;
    use serde_json::json;

    fn history(ticker: &str, closes: &[(i64, f64)]) -> MarketHistory {
        MarketHistory {
            market_id: ticker.to_string(),
            candles: closes
                .iter()
                .map(|&(ts, close)| Candle {
                    timestamp_ms: ts,
                    open: close,
                    high: close,
                    low: close,
                    close,
                    updates: 0,
                })
                .collect(),
        }
    }

    #[test]
    fn seat_count_reads_both_key_spellings_and_value_types() {
        let lower = json!({"metadata": {"seat_count": 218}});
        let upper = json!({"metadata": {"SEAT_COUNT": "51"}});
        let missing = json!({"metadata": {}});
        let junk = json!({"metadata": {"seat_count": "many"}});
        assert_eq!(seat_count_of(&lower), Some(218.0));
        assert_eq!(seat_count_of(&upper), Some(51.0));
        assert_eq!(seat_count_of(&missing), None);
        assert_eq!(seat_count_of(&junk), None);
    }

    #[test]
    fn resolve_discards_markets_without_thresholds() {
        let event = json!({
            "markets": [
                {"ticker": "A-1", "metadata": {"seat_count": 10}},
                {"ticker": "B-1", "metadata": {"note": "no threshold"}},
                {"ticker": "C-1", "metadata": {"SEAT_COUNT": "20"}}
            ]
        });
        let basket = resolve_strike_markets(&event).unwrap();
        assert_eq!(basket.len(), 2);
        assert_eq!(basket[0].ticker, "A-1");
        assert_eq!(basket[1].seat_count, 20.0);
    }

    #[test]
    fn resolve_rejects_shapes_without_markets() {
        assert!(resolve_strike_markets(&json!({"event": "X"})).is_err());
    }

    #[test]
    fn weighted_average_matches_hand_computation() {
        // Two markets priced 0.3 and 0.7 with thresholds 10 and 20:
        // (10*0.3 + 20*0.7) / (0.3 + 0.7) = 17
        let basket = vec![
            (
                SeatMarket {
                    ticker: "A".into(),
                    seat_count: 10.0,
                },
                history("A", &[(100, 0.3)]),
            ),
            (
                SeatMarket {
                    ticker: "B".into(),
                    seat_count: 20.0,
                },
                history("B", &[(100, 0.7)]),
            ),
        ];
        let points = compute_weighted_projection(&basket, &[100]);
        assert_eq!(points.len(), 1);
        assert!((points[0].value - 17.0).abs() < 1e-9);
    }

    #[test]
    fn zero_priced_market_contributes_no_weight() {
        let basket = vec![
            (
                SeatMarket {
                    ticker: "A".into(),
                    seat_count: 10.0,
                },
                history("A", &[(100, 0.0)]),
            ),
            (
                SeatMarket {
                    ticker: "B".into(),
                    seat_count: 20.0,
                },
                history("B", &[(100, 0.5)]),
            ),
        ];
        let points = compute_weighted_projection(&basket, &[100]);
        // Only B carries weight, so the estimate sits at B's threshold
        assert!((points[0].value - 20.0).abs() < 1e-9);
    }

    #[test]
    fn no_weight_anywhere_emits_no_point() {
        let basket = vec![(
            SeatMarket {
                ticker: "A".into(),
                seat_count: 10.0,
            },
            history("A", &[(100, 0.0)]),
        )];
        assert!(compute_weighted_projection(&basket, &[100]).is_empty());
        // Before any market has quoted at all: also no point
        assert!(compute_weighted_projection(&basket, &[50]).is_empty());
    }

    #[test]
    fn reference_union_is_sorted_and_deduped() {
        let histories = vec![
            history("A", &[(300, 0.1), (100, 0.2)]),
            history("B", &[(200, 0.3), (300, 0.4)]),
        ];
        assert_eq!(
            reference_timestamps(None, &histories),
            vec![100, 200, 300]
        );
        // Primary timestamps win when present
        assert_eq!(
            reference_timestamps(Some(&[7, 8]), &histories),
            vec![7, 8]
        );
    }
}
