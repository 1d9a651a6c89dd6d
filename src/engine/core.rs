use std::collections::HashMap;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender, channel};

use tokio::runtime::Handle;

use crate::config::PRINT_ENGINE_EVENTS;
use crate::data::{FetchClient, QueryCache, SeriesData};
use crate::domain::overlay::OverlaySet;
use crate::domain::point::{ProjectionPoint, SeriesBounds, clip_points};
use crate::domain::timeframe::{TimeWindow, Timeframe, resolve_window};
use crate::utils::time_utils::now_ms;

use super::messages::{FetchJob, FetchOutcome, FetchSpec, SeriesId};
use super::state::SeriesState;
use super::worker;

/// Everything the view is currently pointed at. These are the reactive
/// keys: changing any of them restarts only the fetches that depend on it.
#[derive(Debug, Clone)]
pub struct ViewRequest {
    pub market_ticker: String,
    pub series_key: Option<String>,
    pub event_ticker: Option<String>,
    pub macro_series_id: String,
    pub timeframe: Timeframe,
    pub custom_range: Option<TimeWindow>,
    pub seat_projection_enabled: bool,
    pub approval_enabled: bool,
    pub macro_enabled: bool,
    pub headlines_enabled: bool,
}

pub struct ChartEngine {
    /// Registry of all series in the view
    pub series: HashMap<SeriesId, SeriesState>,

    /// Shared query cache, keyed by composite request parameters
    cache: QueryCache<SeriesData>,

    /// Reactive keys (see ViewRequest)
    view: ViewRequest,

    /// User-added comparison overlays
    pub overlays: OverlaySet,

    /// Worker communication
    runtime: Handle,
    client: FetchClient,
    result_tx: Sender<FetchOutcome>,
    result_rx: Receiver<FetchOutcome>,
}

impl ChartEngine {
    pub fn new(runtime: Handle, view: ViewRequest) -> Self {
        let (result_tx, result_rx) = channel::<FetchOutcome>();
        Self {
            series: HashMap::new(),
            cache: QueryCache::new(),
            view,
            overlays: OverlaySet::default(),
            runtime,
            client: FetchClient::new(),
            result_tx,
            result_rx,
        }
    }

    /// Kick off every enabled series. The seat projection is NOT dispatched
    /// here: it waits for the primary series so it can reuse its timeline
    /// (and is skipped entirely when the primary comes back empty).
    pub fn refresh_all(&mut self) {
        self.cache.purge_stale(now_ms());
        self.dispatch_price();
        if self.view.approval_enabled {
            self.dispatch(SeriesId::Approval, FetchSpec::Approval);
        }
        if self.view.macro_enabled {
            self.dispatch_macro();
        }
        if self.view.headlines_enabled {
            self.dispatch(SeriesId::Headlines, FetchSpec::Headlines);
        }
        let overlay_dispatches: Vec<(SeriesId, FetchSpec)> = self
            .overlays
            .iter()
            .filter(|o| o.enabled)
            .map(|overlay| {
                // Restart custom overlays too; their windows changed with us
                let spec = FetchSpec::MarketHistory {
                    ticker: overlay.ticker.clone(),
                    series_key: Some(overlay.series_key.clone()),
                };
                (SeriesId::Custom(overlay.id), spec)
            })
            .collect();
        for (id, spec) in overlay_dispatches {
            self.dispatch(id, spec);
        }
    }

    /// THE GAME LOOP.
    /// Drains finished fetches into the registry and reports whether the
    /// engine is still busy, which tells the caller to keep waking up.
    pub fn update(&mut self) -> bool {
        while let Ok(outcome) = self.result_rx.try_recv() {
            self.handle_outcome(outcome);
        }
        self.has_active_fetches()
    }

    // --- REACTIVE KEY CHANGES ---

    pub fn set_timeframe(&mut self, timeframe: Timeframe) {
        if self.view.timeframe == timeframe {
            return;
        }
        self.view.timeframe = timeframe;
        self.refresh_all();
    }

    pub fn set_custom_range(&mut self, range: TimeWindow) {
        if self.view.custom_range == Some(range) && self.view.timeframe == Timeframe::Custom {
            return;
        }
        self.view.custom_range = Some(range);
        self.view.timeframe = Timeframe::Custom;
        self.refresh_all();
    }

    pub fn set_market(&mut self, ticker: String, series_key: Option<String>) {
        if self.view.market_ticker == ticker && self.view.series_key == series_key {
            return;
        }
        self.view.market_ticker = ticker;
        self.view.series_key = series_key;
        // Only the price chain restarts; overlays with their own sources
        // are unaffected by a market switch
        self.dispatch_price();
    }

    pub fn set_event(&mut self, event_ticker: Option<String>) {
        if self.view.event_ticker == event_ticker {
            return;
        }
        self.view.event_ticker = event_ticker;
        self.maybe_dispatch_seat_projection();
    }

    pub fn set_seat_projection_enabled(&mut self, enabled: bool) {
        self.view.seat_projection_enabled = enabled;
        if enabled {
            self.maybe_dispatch_seat_projection();
        } else {
            self.cancel_series(&SeriesId::SeatProjection);
        }
    }

    pub fn set_approval_enabled(&mut self, enabled: bool) {
        self.view.approval_enabled = enabled;
        if enabled {
            self.dispatch(SeriesId::Approval, FetchSpec::Approval);
        } else {
            self.cancel_series(&SeriesId::Approval);
        }
    }

    pub fn set_macro_enabled(&mut self, enabled: bool) {
        self.view.macro_enabled = enabled;
        if enabled {
            self.dispatch_macro();
        } else {
            self.cancel_series(&SeriesId::Macro);
        }
    }

    pub fn set_headlines_enabled(&mut self, enabled: bool) {
        self.view.headlines_enabled = enabled;
        if enabled {
            self.dispatch(SeriesId::Headlines, FetchSpec::Headlines);
        } else {
            self.cancel_series(&SeriesId::Headlines);
        }
    }

    // --- CUSTOM OVERLAYS ---

    /// Validate, register, and start fetching a user-added comparison
    /// market. Validation failures come back as the message to show the
    /// user; nothing is scheduled for a rejected overlay.
    pub fn add_overlay(
        &mut self,
        ticker: &str,
        label: &str,
        color_top: &str,
        color_bottom: &str,
    ) -> Result<u32, String> {
        let id = self.overlays.add(ticker, label, color_top, color_bottom)?;
        let overlay = self.overlays.get(id).expect("overlay was just added");
        let spec = FetchSpec::MarketHistory {
            ticker: overlay.ticker.clone(),
            series_key: Some(overlay.series_key.clone()),
        };
        self.dispatch(SeriesId::Custom(id), spec);
        Ok(id)
    }

    pub fn remove_overlay(&mut self, id: u32) -> bool {
        self.cancel_series(&SeriesId::Custom(id));
        self.series.remove(&SeriesId::Custom(id));
        self.overlays.remove(id)
    }

    pub fn set_overlay_enabled(&mut self, id: u32, enabled: bool) {
        self.overlays.set_enabled(id, enabled);
        if enabled {
            if let Some(overlay) = self.overlays.get(id) {
                let spec = FetchSpec::MarketHistory {
                    ticker: overlay.ticker.clone(),
                    series_key: Some(overlay.series_key.clone()),
                };
                self.dispatch(SeriesId::Custom(id), spec);
            }
        } else {
            self.cancel_series(&SeriesId::Custom(id));
        }
    }

    // --- ACCESSORS FOR THE PRESENTATION LAYER ---

    pub fn get_series(&self, id: &SeriesId) -> Option<Arc<SeriesData>> {
        self.series.get(id).and_then(|state| state.data.clone())
    }

    /// (is_fetching, last_error) for a series, the pair the presentation
    /// layer needs to choose between spinner, inline error, and data.
    pub fn get_series_status(&self, id: &SeriesId) -> (bool, Option<String>) {
        match self.series.get(id) {
            Some(state) => (state.is_fetching, state.last_error.clone()),
            None => (false, None),
        }
    }

    /// Did the primary series succeed with at least one candle?
    pub fn has_data(&self) -> bool {
        self.get_series(&SeriesId::Price)
            .map(|data| !data.is_empty())
            .unwrap_or(false)
    }

    /// Time extent of the primary series, the horizontal range every
    /// overlay is clipped to.
    pub fn primary_bounds(&self) -> Option<SeriesBounds> {
        match self.get_series(&SeriesId::Price).as_deref() {
            Some(SeriesData::Candles(history)) => SeriesBounds::of_history(history),
            _ => None,
        }
    }

    /// An overlay's points clipped to the primary series' extent.
    pub fn clipped_points(&self, id: &SeriesId) -> Option<Vec<ProjectionPoint>> {
        let data = self.get_series(id)?;
        let points = match data.as_ref() {
            SeriesData::Points(points) => points.clone(),
            SeriesData::Candles(history) => history
                .candles
                .iter()
                .map(|c| ProjectionPoint {
                    timestamp_ms: c.timestamp_ms,
                    value: c.close,
                })
                .collect(),
            SeriesData::Headlines(_) => return None,
        };
        let bounds = self.primary_bounds();
        Some(clip_points(points, bounds.as_ref()))
    }

    pub fn view(&self) -> &ViewRequest {
        &self.view
    }

    // --- TELEMETRY ---

    pub fn active_fetch_count(&self) -> usize {
        self.series.values().filter(|s| s.is_fetching).count()
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    // --- INTERNAL LOGIC ---

    fn has_active_fetches(&self) -> bool {
        self.series.values().any(|s| s.is_fetching)
    }

    fn dispatch_price(&mut self) {
        let spec = FetchSpec::MarketHistory {
            ticker: self.view.market_ticker.clone(),
            series_key: self.view.series_key.clone(),
        };
        self.dispatch(SeriesId::Price, spec);
    }

    fn dispatch_macro(&mut self) {
        let spec = FetchSpec::Macro {
            series_id: self.view.macro_series_id.clone(),
        };
        self.dispatch(SeriesId::Macro, spec);
    }

    /// Start the seat projection off the current primary series.
    ///
    /// Skipped when the primary has not arrived yet (the price outcome will
    /// trigger us again) and when it arrived empty: with no timeline to
    /// align to there is nothing worth projecting onto.
    fn maybe_dispatch_seat_projection(&mut self) {
        if !self.view.seat_projection_enabled {
            return;
        }
        let Some(event_ticker) = self.view.event_ticker.clone() else {
            return;
        };
        let primary = self.get_series(&SeriesId::Price);
        let primary_timestamps = match primary.as_deref() {
            Some(SeriesData::Candles(history)) => {
                if history.candles.is_empty() {
                    if PRINT_ENGINE_EVENTS {
                        log::info!("primary series empty; seat projection not attempted");
                    }
                    return;
                }
                Some(history.timestamps())
            }
            // Price still in flight; the outcome handler re-invokes us
            _ => return,
        };
        let spec = FetchSpec::SeatProjection {
            event_ticker,
            primary_timestamps,
        };
        self.dispatch(SeriesId::SeatProjection, spec);
    }

    /// Cancel, re-key, and start (or cache-fill) one series' fetch.
    fn dispatch(&mut self, id: SeriesId, spec: FetchSpec) {
        let window = resolve_window(self.view.timeframe, self.view.custom_range, now_ms());
        let granularity = self.view.timeframe.granularity(&window);
        let point_budget = self.view.timeframe.point_budget();

        let state = self.series.entry(id.clone()).or_default();
        // Any in-flight fetch for this series is now for a stale key
        state.cancel_in_flight();
        state.is_fetching = true;
        state.last_error = None;

        let job = FetchJob {
            series: id.clone(),
            generation: state.generation,
            spec,
            window,
            granularity,
            point_budget,
            timeframe: self.view.timeframe,
            custom_range: self.view.custom_range,
        };

        // Cache consult: a fresh hit is applied synchronously, no task
        if let Some(hit) = self.cache.fresh(&job.cache_key(), now_ms()) {
            if crate::config::PRINT_CACHE_EVENTS {
                log::info!("cache hit for {}", job.cache_key());
            }
            let data = Arc::new(hit.clone());
            let state = self.series.get_mut(&id).expect("state was just created");
            state.apply_data(data, 0);
            if id == SeriesId::Price {
                self.maybe_dispatch_seat_projection();
            }
            return;
        }

        if PRINT_ENGINE_EVENTS {
            log::info!(
                "dispatching {} (generation {})",
                job.series,
                job.generation
            );
        }
        let handle = worker::spawn_fetch(
            &self.runtime,
            self.client.clone(),
            job,
            self.result_tx.clone(),
        );
        let state = self.series.get_mut(&id).expect("state was just created");
        state.task = Some(handle);
    }

    fn cancel_series(&mut self, id: &SeriesId) {
        if let Some(state) = self.series.get_mut(id) {
            state.cancel_in_flight();
        }
    }

    fn handle_outcome(&mut self, outcome: FetchOutcome) {
        let Some(state) = self.series.get_mut(&outcome.series) else {
            // Series was removed while its fetch was in flight
            return;
        };
        if outcome.generation != state.generation {
            if PRINT_ENGINE_EVENTS {
                log::info!(
                    "dropping stale outcome for {} (generation {} < {})",
                    outcome.series,
                    outcome.generation,
                    state.generation
                );
            }
            return;
        }

        match outcome.result {
            Ok(data) => {
                self.cache.insert(
                    outcome.cache_key,
                    data.clone(),
                    now_ms(),
                    outcome.cache_ttl_ms,
                );
                let data = Arc::new(data);
                if PRINT_ENGINE_EVENTS {
                    log::info!(
                        "{} resolved with {} item(s) in {}ms",
                        outcome.series,
                        data.len(),
                        outcome.duration_ms
                    );
                }
                state.apply_data(data, outcome.duration_ms);
                if outcome.series == SeriesId::Price {
                    // A fresh primary timeline restarts the projection chain
                    self.maybe_dispatch_seat_projection();
                }
            }
            Err(message) => {
                log::error!("{} fetch failed: {}", outcome.series, message);
                state.apply_error(message, outcome.duration_ms);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::candle::{Candle, MarketHistory};

    fn view() -> ViewRequest {
        ViewRequest {
            market_ticker: "KXSENATE-26-R".to_string(),
            series_key: None,
            event_ticker: Some("KXSEATS-26".to_string()),
            macro_series_id: "DGS10".to_string(),
            timeframe: Timeframe::D7,
            custom_range: None,
            seat_projection_enabled: true,
            approval_enabled: false,
            macro_enabled: false,
            headlines_enabled: false,
        }
    }

    fn candles(ts: &[i64]) -> SeriesData {
        SeriesData::Candles(MarketHistory {
            market_id: "KXSENATE-26-R".to_string(),
            candles: ts
                .iter()
                .map(|&t| Candle {
                    timestamp_ms: t,
                    open: 0.5,
                    high: 0.5,
                    low: 0.5,
                    close: 0.5,
                    updates: 0,
                })
                .collect(),
        })
    }

    fn outcome(series: SeriesId, generation: u64, result: Result<SeriesData, String>) -> FetchOutcome {
        FetchOutcome {
            series,
            generation,
            duration_ms: 1,
            result,
            cache_key: "test".to_string(),
            cache_ttl_ms: 60_000,
        }
    }

    #[tokio::test]
    async fn stale_generation_outcomes_are_dropped() {
        let mut engine = ChartEngine::new(Handle::current(), view());
        let state = engine.series.entry(SeriesId::Price).or_default();
        state.generation = 5;
        state.is_fetching = true;

        engine.handle_outcome(outcome(SeriesId::Price, 4, Ok(candles(&[1, 2]))));
        let state = engine.series.get(&SeriesId::Price).unwrap();
        assert!(state.data.is_none(), "stale data must not land");
        assert!(state.is_fetching, "newer fetch is still in flight");
    }

    #[tokio::test]
    async fn matching_generation_applies_and_caches() {
        let mut engine = ChartEngine::new(Handle::current(), view());
        let state = engine.series.entry(SeriesId::Price).or_default();
        state.generation = 5;
        state.is_fetching = true;

        engine.handle_outcome(outcome(SeriesId::Price, 5, Ok(candles(&[1, 2]))));
        assert!(engine.has_data());
        assert_eq!(engine.cache_len(), 1);
        let (fetching, error) = engine.get_series_status(&SeriesId::Price);
        assert!(!fetching);
        assert!(error.is_none());
    }

    #[tokio::test]
    async fn empty_primary_blocks_the_seat_projection() {
        let mut engine = ChartEngine::new(Handle::current(), view());
        let state = engine.series.entry(SeriesId::Price).or_default();
        state.generation = 1;
        state.is_fetching = true;

        engine.handle_outcome(outcome(SeriesId::Price, 1, Ok(candles(&[]))));
        assert!(!engine.has_data());
        // No projection fetch was attempted on an empty primary
        let (fetching, _) = engine.get_series_status(&SeriesId::SeatProjection);
        assert!(!fetching);
        assert!(engine.get_series(&SeriesId::SeatProjection).is_none());
    }

    #[tokio::test]
    async fn non_empty_primary_triggers_the_seat_projection() {
        let mut engine = ChartEngine::new(Handle::current(), view());
        let state = engine.series.entry(SeriesId::Price).or_default();
        state.generation = 1;
        state.is_fetching = true;

        engine.handle_outcome(outcome(SeriesId::Price, 1, Ok(candles(&[10, 20]))));
        let (fetching, _) = engine.get_series_status(&SeriesId::SeatProjection);
        assert!(fetching, "projection fetch should be in flight");
    }

    #[tokio::test]
    async fn fetch_error_becomes_inline_series_state() {
        let mut engine = ChartEngine::new(Handle::current(), view());
        let state = engine.series.entry(SeriesId::Approval).or_default();
        state.generation = 1;
        state.is_fetching = true;

        engine.handle_outcome(outcome(
            SeriesId::Approval,
            1,
            Err("poll API answered 502".to_string()),
        ));
        let (fetching, error) = engine.get_series_status(&SeriesId::Approval);
        assert!(!fetching);
        assert_eq!(error.as_deref(), Some("poll API answered 502"));
        // The rest of the view is untouched by one series failing
        assert!(engine.get_series(&SeriesId::Price).is_none());
    }

    #[tokio::test]
    async fn overlay_points_are_clipped_to_primary_bounds() {
        let mut engine = ChartEngine::new(Handle::current(), view());
        let state = engine.series.entry(SeriesId::Price).or_default();
        state.generation = 1;
        engine.handle_outcome(outcome(SeriesId::Price, 1, Ok(candles(&[100, 200]))));

        let points = vec![
            ProjectionPoint {
                timestamp_ms: 50,
                value: 1.0,
            },
            ProjectionPoint {
                timestamp_ms: 150,
                value: 2.0,
            },
            ProjectionPoint {
                timestamp_ms: 250,
                value: 3.0,
            },
        ];
        let state = engine.series.entry(SeriesId::Approval).or_default();
        state.generation = 1;
        engine.handle_outcome(outcome(
            SeriesId::Approval,
            1,
            Ok(SeriesData::Points(points)),
        ));

        let clipped = engine.clipped_points(&SeriesId::Approval).unwrap();
        assert_eq!(clipped.len(), 1);
        assert_eq!(clipped[0].timestamp_ms, 150);
    }

    #[tokio::test]
    async fn removed_overlay_outcomes_are_ignored() {
        let mut engine = ChartEngine::new(Handle::current(), view());
        // Outcome for a series the engine no longer tracks: no panic
        engine.handle_outcome(outcome(SeriesId::Custom(9), 1, Ok(candles(&[1]))));
        assert!(engine.get_series(&SeriesId::Custom(9)).is_none());
    }

    #[tokio::test]
    async fn rejected_overlay_schedules_nothing() {
        let mut engine = ChartEngine::new(Handle::current(), view());
        assert!(engine.add_overlay("", "bad", "#fff", "#000").is_err());
        assert_eq!(engine.active_fetch_count(), 0);
    }
}
