//! Configuration module for the chart data engine.

pub mod providers;
pub mod timeframes;

mod debug; // Private; use the re-exports below so call sites say crate::config::PRINT_*
pub use debug::{
    PRINT_CACHE_EVENTS, PRINT_ENGINE_EVENTS, PRINT_FETCH_TIMINGS, PRINT_NORMALIZE_STATS,
};

// Re-export commonly used items
pub use providers::{PROVIDERS, ProviderConfig, ProviderEndpoint};
pub use timeframes::{TIMEFRAMES, TimeframeConfig, TimeframesConfig};
