// src/models/render.rs

//! Render request and result values.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::hash::stable_hash;

/// A request to materialize a page.
///
/// Immutable once built; the cache key is derived from the URL, the wait
/// condition and the injected script only, so two requests that differ just
/// in timeouts or TTL share one cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderRequest {
    pub url: String,
    pub wait_condition: Option<String>,
    pub wait_timeout_ms: u64,
    pub wait_for_idle: bool,
    pub cache_ttl_override: Option<Duration>,
    pub injected_script: Option<String>,
}

impl RenderRequest {
    /// Default selector wait used when none is given.
    pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 10_000;

    /// Create a request for a URL with no waits and no script.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            wait_condition: None,
            wait_timeout_ms: Self::DEFAULT_WAIT_TIMEOUT_MS,
            wait_for_idle: false,
            cache_ttl_override: None,
            injected_script: None,
        }
    }

    pub fn wait_for(mut self, selector: impl Into<String>) -> Self {
        self.wait_condition = Some(selector.into());
        self
    }

    pub fn wait_timeout_ms(mut self, ms: u64) -> Self {
        self.wait_timeout_ms = ms;
        self
    }

    pub fn wait_for_idle(mut self, enabled: bool) -> Self {
        self.wait_for_idle = enabled;
        self
    }

    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl_override = Some(ttl);
        self
    }

    pub fn inject(mut self, script: impl Into<String>) -> Self {
        self.injected_script = Some(script.into());
        self
    }

    /// Stable cache key over (url, wait condition, injected script).
    pub fn cache_key(&self) -> String {
        stable_hash(&[
            self.url.as_str(),
            self.wait_condition.as_deref().unwrap_or(""),
            self.injected_script.as_deref().unwrap_or(""),
        ])
    }
}

/// A materialized document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderResult {
    /// URL that was requested
    pub url: String,

    /// Full document text after waits and scripts
    pub html: String,

    /// Document size in bytes
    pub size: usize,

    /// When the document was fetched from the engine
    pub fetched_at: DateTime<Utc>,
}

impl RenderResult {
    pub fn new(url: impl Into<String>, html: String) -> Self {
        Self {
            url: url.into(),
            size: html.len(),
            html,
            fetched_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_ignores_timeouts_and_ttl() {
        let a = RenderRequest::new("https://x.test/a").wait_for("table");
        let b = a
            .clone()
            .wait_timeout_ms(1)
            .wait_for_idle(true)
            .cache_ttl(Duration::from_secs(5));
        assert_eq!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn test_cache_key_distinguishes_wait_and_script() {
        let base = RenderRequest::new("https://x.test/a");
        let waited = base.clone().wait_for("table");
        let scripted = base.clone().inject("window.scrollTo(0, 9999)");
        assert_ne!(base.cache_key(), waited.cache_key());
        assert_ne!(base.cache_key(), scripted.cache_key());
        assert_ne!(waited.cache_key(), scripted.cache_key());
    }

    #[test]
    fn test_result_size_matches_document() {
        let result = RenderResult::new("https://x.test", "<html></html>".to_string());
        assert_eq!(result.size, 13);
    }
}
