//! Debugging feature flags.
//!
//! Toggle individual diagnostics here; keep them `false` by default so
//! normal runs stay quiet.

/// Emit per-request URL + timing logs for every upstream fetch.
pub const PRINT_FETCH_TIMINGS: bool = false;

/// Emit cache hit/miss diagnostics for the query cache.
pub const PRINT_CACHE_EVENTS: bool = false;

/// Emit normalization stats (candles kept vs dropped) per market response.
pub const PRINT_NORMALIZE_STATS: bool = false;

/// Emit engine dispatch/cancellation logs (generation bumps, stale drops).
pub const PRINT_ENGINE_EVENTS: bool = true;
