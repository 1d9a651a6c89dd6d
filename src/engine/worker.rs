use std::sync::mpsc::Sender;
use std::time::Instant;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::config::PROVIDERS;
use crate::data::http::{FetchClient, FetchError};
use crate::data::{SeriesData, approval, macroeco, market, news, seats};
use crate::engine::messages::{FetchJob, FetchOutcome, FetchSpec};

/// Run one fetch attempt for a job.
async fn execute(client: &FetchClient, job: &FetchJob) -> Result<SeriesData, FetchError> {
    match &job.spec {
        FetchSpec::MarketHistory { ticker, series_key } => {
            let history = market::fetch_history_windowed(
                client,
                PROVIDERS.market.base_url,
                ticker,
                series_key.as_deref(),
                job.window,
                job.granularity,
                job.point_budget,
            )
            .await?;
            Ok(SeriesData::Candles(history))
        }
        FetchSpec::SeatProjection {
            event_ticker,
            primary_timestamps,
        } => {
            let points = seats::fetch_seat_projection(
                client,
                PROVIDERS.events.base_url,
                PROVIDERS.market.base_url,
                event_ticker,
                job.window,
                job.granularity,
                job.point_budget,
                primary_timestamps.clone(),
            )
            .await?;
            Ok(SeriesData::Points(points))
        }
        FetchSpec::Approval => {
            let points =
                approval::fetch_approval_series(client, PROVIDERS.polls.base_url, job.window)
                    .await?;
            Ok(SeriesData::Points(points))
        }
        FetchSpec::Macro { series_id } => {
            let points = macroeco::fetch_macro_series(
                client,
                PROVIDERS.macro_series.base_url,
                series_id,
                job.window,
            )
            .await?;
            Ok(SeriesData::Points(points))
        }
        FetchSpec::Headlines => {
            let headlines = news::fetch_headlines(client, PROVIDERS.news.base_url).await?;
            Ok(SeriesData::Headlines(headlines))
        }
    }
}

/// Spawn the fetch task for a job and report its outcome on `tx`.
///
/// The view allows each series exactly one automatic retry, with no backoff
/// beyond it. Config errors are deterministic (they fail before any network
/// call), so retrying those would just repeat the same answer.
pub fn spawn_fetch(
    runtime: &Handle,
    client: FetchClient,
    job: FetchJob,
    tx: Sender<FetchOutcome>,
) -> JoinHandle<()> {
    runtime.spawn(async move {
        let start = Instant::now();

        let mut result = execute(&client, &job).await;
        if let Err(first) = &result {
            let retryable = !matches!(first, FetchError::Config(_));
            if retryable && PROVIDERS.client.retries > 0 {
                log::warn!("{} fetch failed, retrying once: {}", job.series, first);
                result = execute(&client, &job).await;
            }
        }

        let outcome = FetchOutcome {
            series: job.series.clone(),
            generation: job.generation,
            duration_ms: start.elapsed().as_millis(),
            cache_key: job.cache_key(),
            cache_ttl_ms: job.cache_ttl_ms(),
            result: result.map_err(|e| e.to_string()),
        };
        // If the receiver is gone the engine is shutting down; nothing to do
        let _ = tx.send(outcome);
    })
}
