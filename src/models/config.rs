//! Application configuration structures.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::TableSourceConfig;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Rendering pool, cache and timeout settings
    #[serde(default)]
    pub render: RenderConfig,

    /// Fan-out limits and merge behavior
    #[serde(default)]
    pub aggregator: AggregatorConfig,

    /// Identity resolution thresholds and affiliation aliases
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Table-driven source definitions
    #[serde(default)]
    pub sources: Vec<TableSourceConfig>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.render.max_contexts == 0 {
            return Err(AppError::validation("render.max_contexts must be > 0"));
        }
        if self.render.pages_per_context == 0 {
            return Err(AppError::validation("render.pages_per_context must be > 0"));
        }
        if self.render.context_max_uses == 0 {
            return Err(AppError::validation("render.context_max_uses must be > 0"));
        }
        if self.render.navigation_timeout_ms == 0 {
            return Err(AppError::validation(
                "render.navigation_timeout_ms must be > 0",
            ));
        }
        if self.render.user_agent.trim().is_empty() {
            return Err(AppError::validation("render.user_agent is empty"));
        }
        if self.aggregator.total_limit == 0 {
            return Err(AppError::validation("aggregator.total_limit must be > 0"));
        }
        if self.aggregator.per_source_limit == 0 {
            return Err(AppError::validation(
                "aggregator.per_source_limit must be > 0",
            ));
        }
        if self.aggregator.adapter_timeout_secs == 0 {
            return Err(AppError::validation(
                "aggregator.adapter_timeout_secs must be > 0",
            ));
        }
        for (label, value) in [
            ("identity.name_threshold", self.identity.name_threshold),
            (
                "identity.affiliation_threshold",
                self.identity.affiliation_threshold,
            ),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(AppError::validation(format!(
                    "{label} must be in (0, 1], got {value}"
                )));
            }
        }

        let mut seen = HashSet::new();
        for source in &self.sources {
            if !seen.insert(source.source) {
                return Err(AppError::validation(format!(
                    "Source '{}' is defined more than once",
                    source.source
                )));
            }
            if source.search_url.trim().is_empty() {
                return Err(AppError::validation(format!(
                    "Source '{}' has an empty search_url",
                    source.source
                )));
            }
        }
        Ok(())
    }
}

/// Rendering service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Upper bound on live rendering contexts
    #[serde(default = "defaults::max_contexts")]
    pub max_contexts: usize,

    /// Concurrent page sessions a context may host before a new one is preferred
    #[serde(default = "defaults::pages_per_context")]
    pub pages_per_context: usize,

    /// Pages a context serves before it is recycled
    #[serde(default = "defaults::context_max_uses")]
    pub context_max_uses: u64,

    /// Default time-to-live for cached documents
    #[serde(default = "defaults::cache_ttl")]
    pub cache_ttl_secs: u64,

    /// Fatal deadline for navigation
    #[serde(default = "defaults::navigation_timeout")]
    pub navigation_timeout_ms: u64,

    /// Default selector wait
    #[serde(default = "defaults::wait_timeout")]
    pub wait_timeout_ms: u64,

    /// Best-effort network idle wait
    #[serde(default = "defaults::network_idle_timeout")]
    pub network_idle_timeout_ms: u64,

    /// Pause after an injected script runs
    #[serde(default = "defaults::script_settle")]
    pub script_settle_ms: u64,

    /// User-Agent header for engine requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,
}

impl RenderConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn network_idle_timeout(&self) -> Duration {
        Duration::from_millis(self.network_idle_timeout_ms)
    }

    pub fn script_settle(&self) -> Duration {
        Duration::from_millis(self.script_settle_ms)
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            max_contexts: defaults::max_contexts(),
            pages_per_context: defaults::pages_per_context(),
            context_max_uses: defaults::context_max_uses(),
            cache_ttl_secs: defaults::cache_ttl(),
            navigation_timeout_ms: defaults::navigation_timeout(),
            wait_timeout_ms: defaults::wait_timeout(),
            network_idle_timeout_ms: defaults::network_idle_timeout(),
            script_settle_ms: defaults::script_settle(),
            user_agent: defaults::user_agent(),
        }
    }
}

/// Aggregator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// Maximum rows taken from each source
    #[serde(default = "defaults::per_source_limit")]
    pub per_source_limit: usize,

    /// Maximum rows returned after merging
    #[serde(default = "defaults::total_limit")]
    pub total_limit: usize,

    /// Deadline for a single adapter call
    #[serde(default = "defaults::adapter_timeout")]
    pub adapter_timeout_secs: u64,

    /// Use fuzzy matching when deduplicating search results
    #[serde(default)]
    pub fuzzy_dedup: bool,

    /// Keep only the best row per identity on leaderboards
    #[serde(default)]
    pub dedupe_leaderboard: bool,
}

impl AggregatorConfig {
    pub fn adapter_timeout(&self) -> Duration {
        Duration::from_secs(self.adapter_timeout_secs)
    }
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            per_source_limit: defaults::per_source_limit(),
            total_limit: defaults::total_limit(),
            adapter_timeout_secs: defaults::adapter_timeout(),
            fuzzy_dedup: false,
            dedupe_leaderboard: false,
        }
    }
}

/// Identity resolution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Minimum name similarity for a fuzzy match
    #[serde(default = "defaults::name_threshold")]
    pub name_threshold: f64,

    /// Minimum affiliation similarity for a fuzzy match
    #[serde(default = "defaults::affiliation_threshold")]
    pub affiliation_threshold: f64,

    /// Trailing affiliation word -> canonical spelling
    #[serde(default = "defaults::affiliation_aliases")]
    pub affiliation_aliases: BTreeMap<String, String>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            name_threshold: defaults::name_threshold(),
            affiliation_threshold: defaults::affiliation_threshold(),
            affiliation_aliases: defaults::affiliation_aliases(),
        }
    }
}

mod defaults {
    use std::collections::BTreeMap;

    // Render defaults
    pub fn max_contexts() -> usize {
        4
    }
    pub fn pages_per_context() -> usize {
        4
    }
    pub fn context_max_uses() -> u64 {
        200
    }
    pub fn cache_ttl() -> u64 {
        3600
    }
    pub fn navigation_timeout() -> u64 {
        30_000
    }
    pub fn wait_timeout() -> u64 {
        10_000
    }
    pub fn network_idle_timeout() -> u64 {
        5_000
    }
    pub fn script_settle() -> u64 {
        500
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; hoops-aggregator/0.1)".into()
    }

    // Aggregator defaults
    pub fn per_source_limit() -> usize {
        50
    }
    pub fn total_limit() -> usize {
        200
    }
    pub fn adapter_timeout() -> u64 {
        60
    }

    // Identity defaults
    pub fn name_threshold() -> f64 {
        0.85
    }
    pub fn affiliation_threshold() -> f64 {
        0.80
    }
    pub fn affiliation_aliases() -> BTreeMap<String, String> {
        [
            ("hs", "high school"),
            ("h.s.", "high school"),
            ("h.s", "high school"),
            ("high", "high school"),
            ("acad", "academy"),
            ("acad.", "academy"),
            ("prep", "preparatory"),
            ("univ", "university"),
            ("univ.", "university"),
            ("u.", "university"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_pool() {
        let mut config = Config::default();
        config.render.max_contexts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_out_of_range_threshold() {
        let mut config = Config::default();
        config.identity.name_threshold = 1.5;
        assert!(config.validate().is_err());

        config.identity.name_threshold = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_duplicate_sources() {
        let toml_str = r#"
            [[sources]]
            source = "eybl"
            search_url = "https://a.test/players"

            [[sources]]
            source = "eybl"
            search_url = "https://b.test/players"
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[render]\nmax_contexts = 2\n\n[aggregator]\ntotal_limit = 10").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.render.max_contexts, 2);
        assert_eq!(config.render.cache_ttl_secs, 3600);
        assert_eq!(config.aggregator.total_limit, 10);
        assert_eq!(config.aggregator.per_source_limit, 50);
        assert_eq!(
            config.identity.affiliation_aliases.get("hs").map(String::as_str),
            Some("high school")
        );
    }

    #[test]
    fn load_or_default_falls_back_on_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(dir.path().join("missing.toml"));
        assert_eq!(config.render.max_contexts, 4);
        assert!(config.sources.is_empty());
    }
}
