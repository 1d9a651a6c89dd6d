//! Binary search over sorted timestamp sequences.
//!
//! All functions here assume their input is sorted ascending by timestamp.
//! That precondition is NOT validated; feeding unsorted data is a caller bug
//! and the results are unspecified.

use crate::domain::candle::Candle;
use crate::domain::point::ProjectionPoint;

/// Index of the timestamp closest to `target`.
///
/// Tie-break: the distance comparison is a strict `<`, so when two
/// neighbours are exactly equidistant the LATER index wins. Downstream
/// hover/snap behavior was tuned against that, so keep it.
///
/// Empty input returns `0` by convention; callers that can see empty
/// sequences must guard for that themselves before indexing.
pub fn nearest_index(sorted_ts: &[i64], target: i64) -> usize {
    if sorted_ts.is_empty() {
        return 0;
    }
    match sorted_ts.binary_search(&target) {
        Ok(idx) => idx,
        Err(insert_at) => {
            if insert_at == 0 {
                0
            } else if insert_at == sorted_ts.len() {
                sorted_ts.len() - 1
            } else {
                let before = insert_at - 1;
                // Strict `<`: equal distances fall through to the later index
                if (target - sorted_ts[before]) < (sorted_ts[insert_at] - target) {
                    before
                } else {
                    insert_at
                }
            }
        }
    }
}

/// Point whose timestamp is closest to `target_ms`, or `None` when empty.
pub fn nearest_point(sorted: &[ProjectionPoint], target_ms: i64) -> Option<&ProjectionPoint> {
    if sorted.is_empty() {
        return None;
    }
    // One allocation per lookup would hurt in the hover path, so search on a
    // key-extracted slice via partition_point instead of collecting timestamps.
    let insert_at = sorted.partition_point(|p| p.timestamp_ms < target_ms);
    let candidate = if insert_at == 0 {
        0
    } else if insert_at == sorted.len() {
        sorted.len() - 1
    } else {
        let before = insert_at - 1;
        if (target_ms - sorted[before].timestamp_ms) < (sorted[insert_at].timestamp_ms - target_ms)
        {
            before
        } else {
            insert_at
        }
    };
    Some(&sorted[candidate])
}

/// Close price of the rightmost candle with `timestamp_ms <= target_ms`.
///
/// Returns `None` when the target precedes the first candle (i.e. the market
/// had no quote yet at that time).
pub fn last_close_at_or_before(candles: &[Candle], target_ms: i64) -> Option<f64> {
    let upto = candles.partition_point(|c| c.timestamp_ms <= target_ms);
    if upto == 0 {
        None
    } else {
        Some(candles[upto - 1].close)
    }
}
