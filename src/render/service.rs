// src/render/service.rs

//! Pooled, cached rendering fetch service.
//!
//! `fetch` flows through cache lookup, lazy engine launch, context
//! acquisition, navigate/wait/extract, then cache store. The page session is
//! closed on every exit path. Waits for network idle, selectors and injected
//! scripts degrade to warnings; only navigation failures and engine-level
//! failures fail the fetch.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future;
use tokio::sync::OnceCell;
use tokio::time::timeout;

use crate::error::{AppError, Result};
use crate::models::{RenderConfig, RenderRequest, RenderResult};
use crate::render::cache::{CacheStats, TtlCache};
use crate::render::engine::{EngineLauncher, PageSession, RenderEngine};
use crate::render::http::HttpLauncher;
use crate::render::pool::{ContextLease, ContextPool, PoolLimits};

/// Service that turns render requests into materialized documents.
pub struct RenderService {
    config: RenderConfig,
    launcher: Arc<dyn EngineLauncher>,
    engine: OnceCell<Arc<dyn RenderEngine>>,
    pool: ContextPool,
    cache: TtlCache<String, RenderResult>,
}

impl RenderService {
    /// Create a service that launches its engine through `launcher` on first use.
    pub fn new(config: RenderConfig, launcher: Arc<dyn EngineLauncher>) -> Self {
        let pool = ContextPool::new(PoolLimits {
            max_contexts: config.max_contexts,
            pages_per_context: config.pages_per_context,
            max_uses: config.context_max_uses,
        });
        let cache = TtlCache::new(config.cache_ttl());
        Self {
            config,
            launcher,
            engine: OnceCell::new(),
            pool,
            cache,
        }
    }

    /// Create a service backed by the static HTTP engine.
    pub fn http(config: RenderConfig) -> Self {
        let launcher = Arc::new(HttpLauncher::new(config.clone()));
        Self::new(config, launcher)
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn pool_size(&self) -> usize {
        self.pool.len()
    }

    pub fn is_engine_started(&self) -> bool {
        self.engine.initialized()
    }

    /// Launch the engine exactly once; failures propagate and are retried next call.
    async fn engine(&self) -> Result<&Arc<dyn RenderEngine>> {
        self.engine
            .get_or_try_init(|| async {
                log::info!("Launching rendering engine");
                self.launcher.launch().await
            })
            .await
    }

    /// Materialize one document.
    pub async fn fetch(&self, request: &RenderRequest) -> Result<RenderResult> {
        let key = request.cache_key();
        if let Some(hit) = self.cache.get(&key) {
            log::debug!("Render cache hit: {}", request.url);
            return Ok(hit);
        }
        log::debug!("Render cache miss: {}", request.url);

        let engine = self.engine().await?;
        let lease = self.pool.acquire(engine.as_ref()).await?;

        match self.render_in(&lease, request).await {
            Ok(html) => {
                drop(lease);
                let result = RenderResult::new(&request.url, html);
                match request.cache_ttl_override {
                    Some(ttl) => self.cache.insert_with_ttl(key, result.clone(), ttl),
                    None => self.cache.insert(key, result.clone()),
                }
                log::debug!("Rendered {} ({} bytes)", result.url, result.size);
                Ok(result)
            }
            Err(e) => {
                if e.is_automation() {
                    self.pool.discard(lease).await;
                }
                Err(e)
            }
        }
    }

    /// Fetch many documents concurrently, keyed by URL.
    ///
    /// A failed fetch maps to `None` and never affects its siblings.
    pub async fn fetch_many(
        &self,
        requests: &[RenderRequest],
    ) -> HashMap<String, Option<RenderResult>> {
        let fetches = requests.iter().map(|request| async move {
            let outcome = self.fetch(request).await;
            (request.url.clone(), outcome)
        });

        future::join_all(fetches)
            .await
            .into_iter()
            .map(|(url, outcome)| match outcome {
                Ok(result) => (url, Some(result)),
                Err(e) => {
                    log::warn!("Failed to render {}: {}", url, e);
                    (url, None)
                }
            })
            .collect()
    }

    /// Close pooled contexts, the engine, and the cache. For process shutdown only.
    pub async fn shutdown(&self) -> Result<()> {
        self.pool.shutdown().await;
        let closed = match self.engine.get() {
            Some(engine) => engine.close().await,
            None => Ok(()),
        };
        self.cache.clear();
        log::info!("Rendering service shut down");
        closed
    }

    async fn render_in(&self, lease: &ContextLease, request: &RenderRequest) -> Result<String> {
        let mut page = PageGuard::new(lease.context().new_page().await?, &request.url);
        let outcome = match page.session() {
            Some(session) => self.drive(session, request).await,
            None => Err(AppError::automation("page session already released")),
        };
        page.close().await;
        outcome
    }

    async fn drive(&self, page: &mut dyn PageSession, request: &RenderRequest) -> Result<String> {
        let url = request.url.as_str();

        let nav_budget = self.config.navigation_timeout();
        match timeout(nav_budget, page.navigate(url)).await {
            Ok(navigated) => navigated?,
            Err(_) => {
                return Err(AppError::timeout(
                    format!("navigation to {url}"),
                    millis(nav_budget),
                ));
            }
        }

        if request.wait_for_idle {
            let budget = self.config.network_idle_timeout();
            let waited = timeout(budget, page.wait_for_network_idle()).await;
            soften(waited, budget, || format!("network idle on {url}"))?;
        }

        if let Some(selector) = &request.wait_condition {
            let budget = Duration::from_millis(request.wait_timeout_ms);
            let waited = timeout(budget, page.wait_for_selector(selector)).await;
            soften(waited, budget, || format!("selector '{selector}' on {url}"))?;
        }

        if let Some(script) = &request.injected_script {
            let budget = Duration::from_millis(request.wait_timeout_ms);
            let evaluated = timeout(budget, page.evaluate(script)).await;
            if soften(evaluated, budget, || format!("injected script on {url}"))? {
                tokio::time::sleep(self.config.script_settle()).await;
            }
        }

        page.content().await
    }
}

/// Owns an open page session and closes it even when the fetch is cancelled.
struct PageGuard {
    session: Option<Box<dyn PageSession>>,
    url: String,
}

impl PageGuard {
    fn new(session: Box<dyn PageSession>, url: &str) -> Self {
        Self {
            session: Some(session),
            url: url.to_string(),
        }
    }

    fn session(&mut self) -> Option<&mut (dyn PageSession + 'static)> {
        self.session.as_deref_mut()
    }

    async fn close(&mut self) {
        if let Some(mut session) = self.session.take() {
            if let Err(e) = session.close().await {
                log::warn!("Failed to close page for {}: {}", self.url, e);
            }
        }
    }
}

impl Drop for PageGuard {
    fn drop(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        // Dropped mid-render: finish the close on the runtime.
        let url = std::mem::take(&mut self.url);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = session.close().await {
                        log::warn!("Failed to close abandoned page for {}: {}", url, e);
                    }
                });
            }
            Err(_) => log::warn!("Abandoned page for {} left open: no runtime", url),
        }
    }
}

/// Turn a best-effort step's outcome into a warning unless the engine itself failed.
///
/// Returns whether the step succeeded.
fn soften(
    outcome: std::result::Result<Result<()>, tokio::time::error::Elapsed>,
    budget: Duration,
    what: impl FnOnce() -> String,
) -> Result<bool> {
    match outcome {
        Ok(Ok(())) => Ok(true),
        Ok(Err(e)) if e.is_automation() => Err(e),
        Ok(Err(e)) => {
            log::warn!("Continuing without {}: {}", what(), e);
            Ok(false)
        }
        Err(_) => {
            log::warn!(
                "Timed out after {}ms waiting for {}; extracting anyway",
                millis(budget),
                what()
            );
            Ok(false)
        }
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
