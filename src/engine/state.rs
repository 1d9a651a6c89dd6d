use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::data::SeriesData;

/// Represents the state of a single series in the engine.
#[derive(Debug, Default)]
pub struct SeriesState {
    /// THE FRONT BUFFER.
    /// The presentation layer reads this between updates. When a new result
    /// is ready we simply replace the Arc pointer; the old snapshot stays
    /// valid for anyone still holding it.
    pub data: Option<Arc<SeriesData>>,

    /// Is a fetch currently in flight for this series?
    pub is_fetching: bool,

    /// Last error (if any) to show inline for this series
    pub last_error: Option<String>,

    /// Bumped on every dispatch; outcomes carrying an older generation are
    /// stale and get dropped
    pub generation: u64,

    /// Handle of the in-flight fetch task, kept so a key change can abort
    /// it instead of letting it race the replacement
    pub task: Option<JoinHandle<()>>,

    pub last_duration_ms: u128,
}

impl SeriesState {
    /// The "swap" operation: promote a finished fetch to the front buffer.
    pub fn apply_data(&mut self, data: Arc<SeriesData>, duration_ms: u128) {
        self.data = Some(data);
        self.is_fetching = false;
        self.last_error = None;
        self.last_duration_ms = duration_ms;
        self.task = None;
    }

    pub fn apply_error(&mut self, message: String, duration_ms: u128) {
        self.is_fetching = false;
        self.last_error = Some(message);
        self.last_duration_ms = duration_ms;
        self.task = None;
    }

    /// Abort any in-flight fetch and invalidate its outcome.
    pub fn cancel_in_flight(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.generation += 1;
        self.is_fetching = false;
    }
}
