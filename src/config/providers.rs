//! Upstream provider configuration constants and types.

use crate::utils::TimeUtils;

/// Configuration for the HTTP fetch client
pub struct ClientDefaults {
    /// Automatic retries after a failed fetch. Exactly one, no backoff.
    pub retries: u32,
    /// How many bytes of an upstream body we quote in error messages
    pub body_snippet_limit: usize,
}

/// One upstream data family: where it lives and how stale a cached answer
/// may be before we refetch.
pub struct ProviderEndpoint {
    /// Base URL, normally one of our pass-through proxy routes
    pub base_url: &'static str,
    pub cache_ttl_ms: i64,
}

/// The Master Provider Configuration Struct
pub struct ProviderConfig {
    /// Market price history (canonical and candlestick protocols share it)
    pub market: ProviderEndpoint,
    /// Per-event strike market listing for the seat projection
    pub events: ProviderEndpoint,
    /// Approval poll aggregator
    pub polls: ProviderEndpoint,
    /// Macro time-series observations
    pub macro_series: ProviderEndpoint,
    /// RSS headline feed
    pub news: ProviderEndpoint,

    /// Substring that marks a base URL as the legacy canonical-history host.
    /// Anything else (with a series key in hand) speaks the candlestick
    /// protocol.
    pub legacy_history_fragment: &'static str,
    /// Query parameter the proxy injects a server-held credential into when
    /// the caller did not supply one. We never send it ourselves.
    pub credential_param: &'static str,

    pub client: ClientDefaults,
}

pub const PROVIDERS: ProviderConfig = ProviderConfig {
    market: ProviderEndpoint {
        base_url: "http://localhost:8787/api/markets",
        cache_ttl_ms: TimeUtils::MS_IN_MIN,
    },
    events: ProviderEndpoint {
        base_url: "http://localhost:8787/api/events",
        cache_ttl_ms: 5 * TimeUtils::MS_IN_MIN,
    },
    polls: ProviderEndpoint {
        base_url: "http://localhost:8787/api/polls",
        cache_ttl_ms: 30 * TimeUtils::MS_IN_MIN,
    },
    macro_series: ProviderEndpoint {
        base_url: "http://localhost:8787/api/fred",
        cache_ttl_ms: 60 * TimeUtils::MS_IN_MIN,
    },
    news: ProviderEndpoint {
        base_url: "http://localhost:8787/api/news",
        cache_ttl_ms: 5 * TimeUtils::MS_IN_MIN,
    },

    legacy_history_fragment: "/elections",
    credential_param: "api_key",

    client: ClientDefaults {
        retries: 1,
        body_snippet_limit: 300,
    },
};
