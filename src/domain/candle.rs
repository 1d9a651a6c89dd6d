use serde::{Deserialize, Serialize};

/// One sampled period of a single market's price.
///
/// Prices are market-native units; for prediction contracts that is the
/// implied probability in `[0, 1]`. `updates` counts trades/quotes inside
/// the period (the provider's volume figure).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Candle {
    pub timestamp_ms: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub updates: u64,
}

impl Candle {
    pub fn is_up(&self) -> bool {
        self.close >= self.open
    }
}

/// A market's normalized candle history.
///
/// Candle timestamps are assumed strictly increasing (source ordering from
/// the provider); we do not re-sort or actively enforce it.
#[derive(Serialize, Deserialize, Debug, Default, Clone)]
pub struct MarketHistory {
    pub market_id: String,
    pub candles: Vec<Candle>,
}

impl MarketHistory {
    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn first_timestamp_ms(&self) -> Option<i64> {
        self.candles.first().map(|c| c.timestamp_ms)
    }

    pub fn last_timestamp_ms(&self) -> Option<i64> {
        self.candles.last().map(|c| c.timestamp_ms)
    }

    pub fn last_close(&self) -> Option<f64> {
        self.candles.last().map(|c| c.close)
    }

    pub fn timestamps(&self) -> Vec<i64> {
        self.candles.iter().map(|c| c.timestamp_ms).collect()
    }
}
