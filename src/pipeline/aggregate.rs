// src/pipeline/aggregate.rs

//! Cross-source fan-out, merge and ranking.
//!
//! Every adapter call runs concurrently under its own deadline. A failing or
//! slow adapter contributes nothing and is reported in `failures`; only an
//! empty adapter selection fails the whole call.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future;
use tokio::time::timeout;

use crate::error::{AppError, Result};
use crate::identity::IdentityResolver;
use crate::models::{
    Aggregated, AggregatedEntity, AggregatorConfig, Config, RankedEntry, SearchFilters,
    SourceFailure, SourceId, SourcedStats, Uid,
};
use crate::render::RenderService;
use crate::sources::{Registration, SourceRegistry, TableAdapter};

/// Fans queries out over registered sources and merges the answers.
pub struct Aggregator {
    registry: SourceRegistry,
    resolver: IdentityResolver,
    config: AggregatorConfig,
}

/// A leaderboard row before ranks are assigned.
struct Candidate {
    priority: usize,
    uid: Uid,
    value: f64,
    source: SourceId,
    name: String,
    affiliation: String,
}

impl Aggregator {
    pub fn new(registry: SourceRegistry, resolver: IdentityResolver, config: AggregatorConfig) -> Self {
        Self {
            registry,
            resolver,
            config,
        }
    }

    /// Register a table adapter for every `[[sources]]` entry, in file order.
    pub fn from_config(config: &Config, render: &Arc<RenderService>) -> Self {
        let mut registry = SourceRegistry::new();
        for adapter in TableAdapter::from_config(&config.sources, render) {
            registry.register(Arc::new(adapter));
        }
        log::info!("Registered {} sources: {:?}", registry.len(), registry.sources());
        Self::new(
            registry,
            IdentityResolver::new(&config.identity),
            config.aggregator.clone(),
        )
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub fn resolver(&self) -> &IdentityResolver {
        &self.resolver
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Search every selected source and merge into unique entities.
    ///
    /// Each source contributes at most `per_source_limit` rows; the merged,
    /// deduplicated list is cut to `total_limit`. First-seen order (source
    /// priority, then within-source order) decides which duplicate survives.
    pub async fn search_across_sources(
        &self,
        filters: &SearchFilters,
        subset: Option<&[String]>,
        per_source_limit: usize,
        total_limit: usize,
    ) -> Result<Aggregated<AggregatedEntity>> {
        let adapters = self.registry.resolve(subset)?;
        let calls = adapters
            .iter()
            .map(|adapter| {
                (
                    adapter.source(),
                    adapter.search_entities(filters, per_source_limit),
                )
            })
            .collect();
        let (answers, failures) = self.gather(calls).await;

        let mut items = Vec::new();
        for (source, mut entities) in answers {
            entities.truncate(per_source_limit);
            items.extend(entities.into_iter().map(|entity| AggregatedEntity {
                uid: self.resolver.uid_for(&entity),
                source,
                entity,
            }));
        }

        let raw = items.len();
        let mut items = self.resolver.deduplicate(items, self.config.fuzzy_dedup);
        log::debug!("Search merged {} rows into {} entities", raw, items.len());
        items.truncate(total_limit);

        Ok(Aggregated { items, failures })
    }

    /// Merge per-source leaderboards into one ranking.
    ///
    /// Ordered by value descending, then source priority, then UID, so equal
    /// inputs always rank identically regardless of completion order.
    pub async fn leaderboard_across_sources(
        &self,
        stat: &str,
        subset: Option<&[String]>,
        per_source_limit: usize,
        total_limit: usize,
    ) -> Result<Aggregated<RankedEntry>> {
        let adapters = self.registry.resolve(subset)?;
        let calls = adapters
            .iter()
            .map(|adapter| (adapter.source(), adapter.get_leaderboard(stat, per_source_limit)))
            .collect();
        let (answers, failures) = self.gather(calls).await;

        let mut candidates = Vec::new();
        for (source, mut rows) in answers {
            rows.truncate(per_source_limit);
            let priority = self.registry.priority(source).unwrap_or(usize::MAX);
            for row in rows {
                if !row.value.is_finite() {
                    log::debug!("{source}: dropping non-finite {stat} for {}", row.entity.name);
                    continue;
                }
                candidates.push(Candidate {
                    priority,
                    uid: self.resolver.uid_for(&row.entity),
                    value: row.value,
                    source,
                    name: row.entity.name,
                    affiliation: row.entity.affiliation,
                });
            }
        }

        candidates.sort_by(rank_order);
        if self.config.dedupe_leaderboard {
            let mut seen = HashSet::new();
            candidates.retain(|c| seen.insert(c.uid.clone()));
        }
        candidates.truncate(total_limit);

        let items = candidates
            .into_iter()
            .enumerate()
            .map(|(i, c)| RankedEntry {
                rank: i + 1,
                uid: c.uid,
                stat_value: c.value,
                source: c.source,
                name: c.name,
                affiliation: c.affiliation,
            })
            .collect();

        Ok(Aggregated { items, failures })
    }

    /// Fetch stats for `(source, entity_id)` references from their owning sources.
    ///
    /// References to unregistered sources are skipped; sources with no stats
    /// for the period contribute nothing.
    pub async fn stats_across_sources(
        &self,
        refs: &[(SourceId, String)],
        period: &str,
    ) -> Result<Aggregated<SourcedStats>> {
        if refs.is_empty() {
            return Ok(Aggregated::default());
        }

        let mut calls = Vec::new();
        for (source, entity_id) in refs {
            match self.registry.lookup(*source) {
                Registration::Registered(adapter) => {
                    let entity_id = entity_id.clone();
                    let period = period.to_string();
                    calls.push((*source, async move {
                        adapter.get_entity_stats(&entity_id, &period).await
                    }));
                }
                Registration::Unregistered => {
                    log::debug!("Skipping stats for unregistered source {source}");
                }
            }
        }
        if calls.is_empty() {
            let names = refs.iter().map(|(source, _)| source.to_string()).collect();
            return Err(AppError::InvalidSourceSubset(names));
        }

        let (answers, failures) = self.gather(calls).await;
        let items = answers
            .into_iter()
            .filter_map(|(source, stats)| stats.map(|stats| SourcedStats { source, stats }))
            .collect();

        Ok(Aggregated { items, failures })
    }

    /// Run every call concurrently under the adapter deadline.
    ///
    /// Successes come back in call order; failures are logged and recorded.
    async fn gather<T, F>(&self, calls: Vec<(SourceId, F)>) -> (Vec<(SourceId, T)>, Vec<SourceFailure>)
    where
        F: Future<Output = Result<T>>,
    {
        let budget = self.config.adapter_timeout();
        let outcomes = future::join_all(
            calls
                .into_iter()
                .map(|(source, call)| async move { (source, timeout(budget, call).await) }),
        )
        .await;

        let mut answers = Vec::new();
        let mut failures = Vec::new();
        for (source, outcome) in outcomes {
            let error = match outcome {
                Ok(Ok(answer)) => {
                    answers.push((source, answer));
                    continue;
                }
                Ok(Err(e)) => e,
                Err(_) => AppError::timeout(format!("{source} adapter call"), millis(budget)),
            };
            log::warn!("Source {} failed: {}", source, error);
            failures.push(SourceFailure {
                source,
                kind: error.kind(),
                message: error.to_string(),
            });
        }
        (answers, failures)
    }
}

fn rank_order(a: &Candidate, b: &Candidate) -> Ordering {
    b.value
        .total_cmp(&a.value)
        .then(a.priority.cmp(&b.priority))
        .then_with(|| a.uid.cmp(&b.uid))
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
