// Fetching, normalization, and caching of upstream series
pub mod approval;
pub mod cache;
pub mod http;
pub mod macroeco;
pub mod market;
pub mod news;
pub mod normalize;
pub mod seats;

use serde::Serialize;

use crate::domain::candle::MarketHistory;
use crate::domain::point::ProjectionPoint;
use news::Headline;

// Re-export commonly used types
pub use cache::QueryCache;
pub use http::{FetchClient, FetchError};

/// The payload any series fetch resolves to.
#[derive(Serialize, Debug, Clone)]
pub enum SeriesData {
    Candles(MarketHistory),
    Points(Vec<ProjectionPoint>),
    Headlines(Vec<Headline>),
}

impl SeriesData {
    /// A fetch can succeed and still carry nothing to draw; the engine
    /// renders that as an explicit empty state, distinct from an error.
    pub fn is_empty(&self) -> bool {
        match self {
            SeriesData::Candles(history) => history.candles.is_empty(),
            SeriesData::Points(points) => points.is_empty(),
            SeriesData::Headlines(headlines) => headlines.is_empty(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            SeriesData::Candles(history) => history.candles.len(),
            SeriesData::Points(points) => points.len(),
            SeriesData::Headlines(headlines) => headlines.len(),
        }
    }
}
