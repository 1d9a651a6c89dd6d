//! Market price history fetcher.
//!
//! Two upstream protocols exist for the same data. The legacy host serves
//! pre-canonicalized history; the provider host serves raw candlesticks and
//! needs a series key in the path. Which one a base URL speaks is decided by
//! a substring heuristic plus series-key availability, and each protocol is
//! its own impl so the decision happens once per request.

use async_trait::async_trait;

use crate::config::{PRINT_FETCH_TIMINGS, PROVIDERS};
use crate::data::http::{FetchClient, FetchError};
use crate::data::normalize::normalize_history;
use crate::domain::candle::MarketHistory;
use crate::domain::overlay::derive_series_key;
use crate::domain::timeframe::{Granularity, TimeWindow};

/// Everything a protocol needs to pull one market's history.
#[derive(Debug, Clone)]
pub struct HistoryRequest {
    pub ticker: String,
    pub series_key: Option<String>,
    pub window: TimeWindow,
    pub granularity: Granularity,
    pub point_budget: usize,
}

#[async_trait]
pub trait HistoryProtocol: Send + Sync {
    /// A unique identifier for this protocol (so that afterwards we know
    /// which one we used).
    fn signature(&self) -> &'static str;

    async fn fetch(
        &self,
        client: &FetchClient,
        base_url: &str,
        request: &HistoryRequest,
    ) -> Result<MarketHistory, FetchError>;
}

/// Legacy canonical-history endpoint: `{base}/{ticker}/history`.
pub struct CanonicalProtocol;

#[async_trait]
impl HistoryProtocol for CanonicalProtocol {
    fn signature(&self) -> &'static str {
        "canonical history"
    }

    async fn fetch(
        &self,
        client: &FetchClient,
        base_url: &str,
        request: &HistoryRequest,
    ) -> Result<MarketHistory, FetchError> {
        let url = format!("{}/{}/history", base_url.trim_end_matches('/'), request.ticker);
        let query = [
            ("start_ts", request.window.start_ms.to_string()),
            ("end_ts", request.window.end_ms.to_string()),
        ];
        let raw = client.get_raw(&url, &query).await?;
        let value = raw.json()?;
        normalize_history(&value).map_err(|detail| raw.invalid_body(detail))
    }
}

/// Provider candlestick endpoint:
/// `{base}/series/{series_key}/markets/{ticker}/candlesticks`.
/// Timestamps on the wire are seconds; the sampling period is minutes.
pub struct CandlestickProtocol;

#[async_trait]
impl HistoryProtocol for CandlestickProtocol {
    fn signature(&self) -> &'static str {
        "provider candlesticks"
    }

    async fn fetch(
        &self,
        client: &FetchClient,
        base_url: &str,
        request: &HistoryRequest,
    ) -> Result<MarketHistory, FetchError> {
        let series_key = request.series_key.as_deref().ok_or_else(|| {
            FetchError::Config(format!(
                "no series key available for candlestick fetch of {}",
                request.ticker
            ))
        })?;
        let url = format!(
            "{}/series/{}/markets/{}/candlesticks",
            base_url.trim_end_matches('/'),
            series_key,
            request.ticker
        );

        let period_minutes = request.granularity.period_minutes();
        // The provider caps response size, so honor the point budget by
        // pulling the start forward when the window asks for more periods
        // than we would ever draw.
        let budget_span_ms = period_minutes * 60 * 1000 * request.point_budget as i64;
        let start_ms = request
            .window
            .start_ms
            .max(request.window.end_ms - budget_span_ms);

        let query = [
            ("start_ts", (start_ms / 1000).to_string()),
            ("end_ts", (request.window.end_ms / 1000).to_string()),
            ("period_interval", period_minutes.to_string()),
        ];
        let raw = client.get_raw(&url, &query).await?;
        let value = raw.json()?;
        normalize_history(&value).map_err(|detail| raw.invalid_body(detail))
    }
}

/// Pick the protocol a base URL speaks.
///
/// The legacy host is recognized by a URL fragment; everything else is the
/// candlestick provider, which requires a series key (explicit or derived
/// from the ticker).
pub fn select_protocol(base_url: &str, series_key: Option<&str>) -> Box<dyn HistoryProtocol> {
    if base_url.contains(PROVIDERS.legacy_history_fragment) && series_key.is_none() {
        Box::new(CanonicalProtocol)
    } else {
        Box::new(CandlestickProtocol)
    }
}

/// Fetch one market's history over an already-resolved window.
pub async fn fetch_history_windowed(
    client: &FetchClient,
    base_url: &str,
    ticker: &str,
    explicit_series_key: Option<&str>,
    window: TimeWindow,
    granularity: Granularity,
    point_budget: usize,
) -> Result<MarketHistory, FetchError> {
    let ticker = ticker.trim();
    if ticker.is_empty() {
        return Err(FetchError::Config(
            "market ticker must not be empty".to_string(),
        ));
    }

    let protocol = select_protocol(base_url, explicit_series_key);
    let series_key = match explicit_series_key {
        Some(key) => Some(key.to_string()),
        // Only the candlestick protocol needs one; derivation failure
        // surfaces inside its fetch as a Config error
        None => derive_series_key(ticker),
    };

    let request = HistoryRequest {
        ticker: ticker.to_string(),
        series_key,
        window,
        granularity,
        point_budget,
    };

    if PRINT_FETCH_TIMINGS {
        log::info!(
            "fetching {} via {} ({} .. {}, {})",
            request.ticker,
            protocol.signature(),
            request.window.start_ms,
            request.window.end_ms,
            request.granularity.label()
        );
    }
    protocol.fetch(client, base_url, &request).await
}
