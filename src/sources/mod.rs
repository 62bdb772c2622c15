//! Source adapters and the registry the aggregator fans out over.
//!
//! Adapters report "no data" as `Ok(empty)` / `Ok(None)` and reserve `Err`
//! for transport or automation failures. Registration order doubles as
//! source priority for leaderboard tie-breaks.

mod table;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::{Entity, LeaderboardRow, SearchFilters, SourceId, Stats};

pub use table::TableAdapter;

/// Capability set every statistics source provides.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn source(&self) -> SourceId;

    /// Up to `limit` entities matching `filters`.
    async fn search_entities(&self, filters: &SearchFilters, limit: usize) -> Result<Vec<Entity>>;

    /// Stats for a source-local entity id, or `None` when the source has none.
    async fn get_entity_stats(&self, entity_id: &str, period: &str) -> Result<Option<Stats>>;

    /// Up to `limit` leaderboard rows for `stat`, best first.
    async fn get_leaderboard(&self, stat: &str, limit: usize) -> Result<Vec<LeaderboardRow>>;
}

/// Result of looking a source up in the registry.
pub enum Registration {
    Registered(Arc<dyn SourceAdapter>),
    Unregistered,
}

/// Ordered set of adapters, at most one per source.
#[derive(Default)]
pub struct SourceRegistry {
    adapters: Vec<Arc<dyn SourceAdapter>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter. Re-registering a source replaces the adapter in place.
    pub fn register(&mut self, adapter: Arc<dyn SourceAdapter>) {
        let source = adapter.source();
        match self.adapters.iter_mut().find(|a| a.source() == source) {
            Some(slot) => {
                log::warn!("Adapter for {source} re-registered; replacing");
                *slot = adapter;
            }
            None => self.adapters.push(adapter),
        }
    }

    pub fn lookup(&self, source: SourceId) -> Registration {
        match self.adapters.iter().find(|a| a.source() == source) {
            Some(adapter) => Registration::Registered(Arc::clone(adapter)),
            None => Registration::Unregistered,
        }
    }

    /// Position in registration order; lower is higher priority.
    pub fn priority(&self, source: SourceId) -> Option<usize> {
        self.adapters.iter().position(|a| a.source() == source)
    }

    /// Registered sources in priority order.
    pub fn sources(&self) -> Vec<SourceId> {
        self.adapters.iter().map(|a| a.source()).collect()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Adapters to query, in registration order.
    ///
    /// `None` selects every registered adapter. Unknown or unregistered names
    /// in a subset are skipped; an empty selection is an error.
    pub fn resolve(&self, subset: Option<&[String]>) -> Result<Vec<Arc<dyn SourceAdapter>>> {
        let selected: Vec<Arc<dyn SourceAdapter>> = match subset {
            None => self.adapters.clone(),
            Some(names) => {
                let mut wanted = Vec::new();
                for name in names {
                    match name.parse::<SourceId>() {
                        Ok(id) => match self.lookup(id) {
                            Registration::Registered(_) => wanted.push(id),
                            Registration::Unregistered => {
                                log::debug!("Source {id} requested but not registered");
                            }
                        },
                        Err(_) => log::debug!("Ignoring unknown source name '{name}'"),
                    }
                }
                self.adapters
                    .iter()
                    .filter(|a| wanted.contains(&a.source()))
                    .cloned()
                    .collect()
            }
        };

        if selected.is_empty() {
            return Err(AppError::InvalidSourceSubset(
                subset.map(<[String]>::to_vec).unwrap_or_default(),
            ));
        }
        Ok(selected)
    }
}
