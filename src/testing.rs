// src/testing.rs

//! In-memory engine and adapter doubles shared by unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::{Entity, LeaderboardRow, SearchFilters, SourceId, Stats};
use crate::render::{EngineLauncher, PageSession, RenderContext, RenderEngine};
use crate::sources::SourceAdapter;

/// Canned page served by [`MockEngine`].
#[derive(Debug, Clone, Default)]
pub struct MockPage {
    html: String,
    hang_navigation: bool,
    hang_idle: bool,
    hang_selectors: bool,
    crash_on_content: bool,
}

impl MockPage {
    pub fn html(html: &str) -> Self {
        Self {
            html: html.to_string(),
            ..Self::default()
        }
    }

    pub fn hang_navigation(mut self) -> Self {
        self.hang_navigation = true;
        self
    }

    pub fn hang_idle(mut self) -> Self {
        self.hang_idle = true;
        self
    }

    pub fn hang_selectors(mut self) -> Self {
        self.hang_selectors = true;
        self
    }

    pub fn crash_on_content(mut self) -> Self {
        self.crash_on_content = true;
        self
    }
}

#[derive(Default)]
struct MockState {
    pages: Mutex<HashMap<String, MockPage>>,
    scripts: Mutex<Vec<String>>,
    close_counts: Mutex<HashMap<u64, usize>>,
    next_context: AtomicU64,
    navigations: AtomicUsize,
    pages_opened: AtomicUsize,
    pages_closed: AtomicUsize,
    contexts_created: AtomicUsize,
    contexts_closed: AtomicUsize,
    closed: AtomicBool,
}

/// Engine that serves registered pages from memory and counts everything.
pub struct MockEngine {
    state: Arc<MockState>,
}

impl MockEngine {
    pub fn new() -> Self {
        let state = MockState {
            next_context: AtomicU64::new(1),
            ..MockState::default()
        };
        Self {
            state: Arc::new(state),
        }
    }

    pub fn serve(&self, url: &str, page: MockPage) {
        self.state
            .pages
            .lock()
            .unwrap()
            .insert(url.to_string(), page);
    }

    pub fn navigations(&self) -> usize {
        self.state.navigations.load(Ordering::SeqCst)
    }

    pub fn pages_opened(&self) -> usize {
        self.state.pages_opened.load(Ordering::SeqCst)
    }

    pub fn pages_closed(&self) -> usize {
        self.state.pages_closed.load(Ordering::SeqCst)
    }

    pub fn contexts_created(&self) -> usize {
        self.state.contexts_created.load(Ordering::SeqCst)
    }

    pub fn contexts_closed(&self) -> usize {
        self.state.contexts_closed.load(Ordering::SeqCst)
    }

    /// How many times the context with this id was closed.
    pub fn close_count(&self, id: u64) -> usize {
        self.state
            .close_counts
            .lock()
            .unwrap()
            .get(&id)
            .copied()
            .unwrap_or(0)
    }

    pub fn scripts(&self) -> Vec<String> {
        self.state.scripts.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RenderEngine for MockEngine {
    async fn new_context(&self) -> Result<Arc<dyn RenderContext>> {
        let id = self.state.next_context.fetch_add(1, Ordering::SeqCst);
        self.state.contexts_created.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MockContext {
            id,
            state: Arc::clone(&self.state),
            alive: AtomicBool::new(true),
        }))
    }

    async fn close(&self) -> Result<()> {
        self.state.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

struct MockContext {
    id: u64,
    state: Arc<MockState>,
    alive: AtomicBool,
}

#[async_trait]
impl RenderContext for MockContext {
    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    async fn new_page(&self) -> Result<Box<dyn PageSession>> {
        self.state.pages_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockSession {
            state: Arc::clone(&self.state),
            page: None,
        }))
    }

    async fn close(&self) -> Result<()> {
        self.alive.store(false, Ordering::SeqCst);
        self.state.contexts_closed.fetch_add(1, Ordering::SeqCst);
        *self
            .state
            .close_counts
            .lock()
            .unwrap()
            .entry(self.id)
            .or_insert(0) += 1;
        Ok(())
    }
}

struct MockSession {
    state: Arc<MockState>,
    page: Option<MockPage>,
}

#[async_trait]
impl PageSession for MockSession {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        self.state.navigations.fetch_add(1, Ordering::SeqCst);
        let page = self.state.pages.lock().unwrap().get(url).cloned();
        let Some(page) = page else {
            return Err(AppError::navigation(url, "no page registered"));
        };
        if page.hang_navigation {
            std::future::pending::<()>().await;
        }
        self.page = Some(page);
        Ok(())
    }

    async fn wait_for_network_idle(&mut self) -> Result<()> {
        if self.page.as_ref().is_some_and(|p| p.hang_idle) {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn wait_for_selector(&mut self, _selector: &str) -> Result<()> {
        if self.page.as_ref().is_some_and(|p| p.hang_selectors) {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn evaluate(&mut self, script: &str) -> Result<()> {
        self.state.scripts.lock().unwrap().push(script.to_string());
        Ok(())
    }

    async fn content(&mut self) -> Result<String> {
        match &self.page {
            Some(page) if page.crash_on_content => Err(AppError::automation("page crashed")),
            Some(page) => Ok(page.html.clone()),
            None => Err(AppError::automation("content requested before navigation")),
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.state.pages_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Launcher handing out a shared [`MockEngine`], optionally failing first.
pub struct MockLauncher {
    engine: Arc<MockEngine>,
    failures_left: AtomicUsize,
    launches: AtomicUsize,
}

impl MockLauncher {
    pub fn new(engine: Arc<MockEngine>) -> Self {
        Self::failing_first(engine, 0)
    }

    pub fn failing_first(engine: Arc<MockEngine>, failures: usize) -> Self {
        Self {
            engine,
            failures_left: AtomicUsize::new(failures),
            launches: AtomicUsize::new(0),
        }
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EngineLauncher for MockLauncher {
    async fn launch(&self) -> Result<Arc<dyn RenderEngine>> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        let failed = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(AppError::EngineInit("mock launch failure".into()));
        }
        let engine: Arc<dyn RenderEngine> = self.engine.clone();
        Ok(engine)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Behavior {
    Ok,
    Fail,
    Hang,
}

/// Source adapter backed by fixed data.
pub struct MockAdapter {
    source: SourceId,
    behavior: Behavior,
    entities: Vec<Entity>,
    leaders: Vec<LeaderboardRow>,
    stats: HashMap<String, Stats>,
    calls: AtomicUsize,
    last_limit: Mutex<Option<usize>>,
}

impl MockAdapter {
    pub fn new(source: SourceId) -> Self {
        Self {
            source,
            behavior: Behavior::Ok,
            entities: Vec::new(),
            leaders: Vec::new(),
            stats: HashMap::new(),
            calls: AtomicUsize::new(0),
            last_limit: Mutex::new(None),
        }
    }

    pub fn with_entities(mut self, entities: Vec<Entity>) -> Self {
        self.entities = entities;
        self
    }

    /// Leaderboard rows built from `(name, affiliation, value)` triples.
    pub fn with_leaders(mut self, stat: &str, rows: &[(&str, &str, f64)]) -> Self {
        let source = self.source;
        self.leaders = rows
            .iter()
            .enumerate()
            .map(|(i, (name, affiliation, value))| LeaderboardRow {
                entity: Entity::player(format!("{source}-{i}"), *name, *affiliation, None),
                stat: stat.to_string(),
                value: *value,
            })
            .collect();
        self
    }

    pub fn with_stats(mut self, entity_id: &str, stats: Stats) -> Self {
        self.stats.insert(entity_id.to_string(), stats);
        self
    }

    pub fn failing(mut self) -> Self {
        self.behavior = Behavior::Fail;
        self
    }

    pub fn hanging(mut self) -> Self {
        self.behavior = Behavior::Hang;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_limit(&self) -> Option<usize> {
        *self.last_limit.lock().unwrap()
    }

    async fn enter(&self, limit: Option<usize>) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if limit.is_some() {
            *self.last_limit.lock().unwrap() = limit;
        }
        match self.behavior {
            Behavior::Ok => Ok(()),
            Behavior::Fail => Err(AppError::navigation(
                format!("https://{}.test/", self.source),
                "connection refused",
            )),
            Behavior::Hang => {
                std::future::pending::<()>().await;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl SourceAdapter for MockAdapter {
    fn source(&self) -> SourceId {
        self.source
    }

    async fn search_entities(&self, filters: &SearchFilters, limit: usize) -> Result<Vec<Entity>> {
        self.enter(Some(limit)).await?;
        Ok(self
            .entities
            .iter()
            .filter(|e| filters.matches(e))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn get_entity_stats(&self, entity_id: &str, _period: &str) -> Result<Option<Stats>> {
        self.enter(None).await?;
        Ok(self.stats.get(entity_id).cloned())
    }

    async fn get_leaderboard(&self, _stat: &str, limit: usize) -> Result<Vec<LeaderboardRow>> {
        self.enter(Some(limit)).await?;
        Ok(self.leaders.iter().take(limit).cloned().collect())
    }
}
