//! Shared HTTP fetch client and the error kinds every fetcher reports.

use serde_json::Value;
use thiserror::Error;

use crate::config::PROVIDERS;

/// A fetch failure, classified. The four kinds are separately testable and
/// the engine surfaces them per-series; none of them tears down the view.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport failure before any response was obtained.
    #[error("request to {url} failed before a response arrived: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The upstream answered, but not with a 2xx.
    #[error("{url} answered {status}: {snippet}")]
    UpstreamStatus {
        url: String,
        status: u16,
        snippet: String,
    },

    /// The body arrived but does not parse as the expected format.
    #[error("{url} answered {status} ({content_type}) with an unparseable body: {detail}; body starts: {snippet}")]
    InvalidBody {
        url: String,
        status: u16,
        content_type: String,
        detail: String,
        snippet: String,
    },

    /// Required identifiers missing or unresolvable; raised before any
    /// network call is made.
    #[error("{0}")]
    Config(String),
}

/// First `body_snippet_limit` characters of an upstream body, for error
/// messages. Upstreams sometimes answer with whole HTML error pages; we
/// only want enough to diagnose.
pub fn body_snippet(body: &str) -> String {
    body.chars()
        .take(PROVIDERS.client.body_snippet_limit)
        .collect()
}

/// A successful (2xx) upstream response, body still unparsed.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub url: String,
    pub status: u16,
    pub content_type: String,
    pub body: String,
}

impl RawResponse {
    /// Build the InvalidBody error for this response.
    pub fn invalid_body(&self, detail: impl Into<String>) -> FetchError {
        FetchError::InvalidBody {
            url: self.url.clone(),
            status: self.status,
            content_type: self.content_type.clone(),
            detail: detail.into(),
            snippet: body_snippet(&self.body),
        }
    }

    /// Parse the body as JSON, classifying failure as InvalidBody.
    pub fn json(&self) -> Result<Value, FetchError> {
        serde_json::from_str(&self.body).map_err(|e| self.invalid_body(e.to_string()))
    }
}

/// Thin wrapper around a shared `reqwest::Client`.
///
/// Holds no retry logic: the single automatic retry the view allows happens
/// at the series level in the engine worker, so a fan-out fetch is retried
/// as a whole rather than per sub-request.
#[derive(Debug, Clone, Default)]
pub struct FetchClient {
    http: reqwest::Client,
}

impl FetchClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    /// GET `base` with `query` appended; returns the raw 2xx response.
    pub async fn get_raw(
        &self,
        base: &str,
        query: &[(&str, String)],
    ) -> Result<RawResponse, FetchError> {
        let request = self
            .http
            .get(base)
            .query(query)
            .build()
            .map_err(|e| FetchError::Config(format!("cannot build request for {}: {}", base, e)))?;
        let url = request.url().to_string();

        let response = self
            .http
            .execute(request)
            .await
            .map_err(|source| FetchError::Network {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string();
        // Read the body either way; error diagnostics need the snippet
        let body = response.text().await.map_err(|source| FetchError::Network {
            url: url.clone(),
            source,
        })?;

        if !status.is_success() {
            return Err(FetchError::UpstreamStatus {
                url,
                status: status.as_u16(),
                snippet: body_snippet(&body),
            });
        }

        Ok(RawResponse {
            url,
            status: status.as_u16(),
            content_type,
            body,
        })
    }

    /// GET and parse JSON in one step.
    pub async fn get_json(
        &self,
        base: &str,
        query: &[(&str, String)],
    ) -> Result<Value, FetchError> {
        self.get_raw(base, query).await?.json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(body: &str) -> RawResponse {
        RawResponse {
            url: "http://localhost/x".to_string(),
            status: 200,
            content_type: "application/json".to_string(),
            body: body.to_string(),
        }
    }

    #[test]
    fn snippet_truncates_long_bodies() {
        let body = "x".repeat(1000);
        assert_eq!(body_snippet(&body).len(), 300);
        assert_eq!(body_snippet("short"), "short");
    }

    #[test]
    fn json_parse_failure_is_invalid_body() {
        let err = raw("<html>oops</html>").json().unwrap_err();
        match err {
            FetchError::InvalidBody { status, snippet, .. } => {
                assert_eq!(status, 200);
                assert!(snippet.contains("oops"));
            }
            other => panic!("expected InvalidBody, got {:?}", other),
        }
    }

    #[test]
    fn json_parse_success() {
        let value = raw("{\"a\": 1}").json().unwrap();
        assert_eq!(value["a"], 1);
    }
}
