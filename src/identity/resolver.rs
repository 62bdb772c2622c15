// src/identity/resolver.rs

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use crate::identity::normalize::{normalize_text, AffiliationNormalizer};
use crate::identity::similarity::similarity;
use crate::models::{Entity, EntityKind, IdentityConfig, Uid};
use crate::render::CacheStats;
use crate::utils::hash::short_hash;

const UNKNOWN_CLASS: &str = "unknown";
const UID_BYTES: usize = 16;

type RawKey = (String, String, Option<u16>);

/// Maps raw (name, affiliation, class year) triples to canonical UIDs.
///
/// Resolutions are memoized on the raw input for the life of the resolver.
/// Fuzzy comparisons are pairwise only: A~B and B~C says nothing about A~C.
#[derive(Debug)]
pub struct IdentityResolver {
    name_threshold: f64,
    affiliation_threshold: f64,
    affiliations: AffiliationNormalizer,
    cache: DashMap<RawKey, Uid>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl IdentityResolver {
    pub fn new(config: &IdentityConfig) -> Self {
        Self {
            name_threshold: config.name_threshold,
            affiliation_threshold: config.affiliation_threshold,
            affiliations: AffiliationNormalizer::new(&config.affiliation_aliases),
            cache: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn resolve_uid(&self, name: &str, affiliation: &str, class_year: Option<u16>) -> Uid {
        let key = (name.to_string(), affiliation.to_string(), class_year);
        if let Some(uid) = self.cache.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return uid.clone();
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let name = normalize_text(name);
        let affiliation = self.affiliations.normalize(affiliation);
        let class = class_year.map_or_else(|| UNKNOWN_CLASS.to_string(), |y| y.to_string());
        let uid = Uid(short_hash(&[&name, &affiliation, &class], UID_BYTES));

        self.cache.entry(key).or_insert(uid).clone()
    }

    pub fn uid_for(&self, entity: &Entity) -> Uid {
        self.resolve_uid(&entity.name, &entity.affiliation, entity.class_year)
    }

    /// Whether two entities refer to the same real-world player or team.
    ///
    /// Players never match teams. Otherwise equal UIDs always match. With `fuzzy`, names and affiliations must both
    /// clear their similarity thresholds, and two known class years must agree.
    pub fn is_same_entity(&self, a: &Entity, b: &Entity, fuzzy: bool) -> bool {
        if a.kind != b.kind {
            return false;
        }
        if self.uid_for(a) == self.uid_for(b) {
            return true;
        }
        if !fuzzy {
            return false;
        }
        if let (Some(ya), Some(yb)) = (a.class_year, b.class_year) {
            if ya != yb {
                return false;
            }
        }

        let name_score = similarity(&normalize_text(&a.name), &normalize_text(&b.name));
        if name_score < self.name_threshold {
            return false;
        }
        let affiliation_score = similarity(
            &self.affiliations.normalize(&a.affiliation),
            &self.affiliations.normalize(&b.affiliation),
        );
        affiliation_score >= self.affiliation_threshold
    }

    /// Drop later duplicates, keeping the first occurrence of each identity.
    pub fn deduplicate<T: AsRef<Entity>>(&self, items: Vec<T>, fuzzy: bool) -> Vec<T> {
        let mut seen: HashSet<(EntityKind, Uid)> = HashSet::new();
        let mut kept: Vec<T> = Vec::with_capacity(items.len());

        for item in items {
            let entity = item.as_ref();
            let key = (entity.kind, self.uid_for(entity));
            if seen.contains(&key) {
                continue;
            }
            if fuzzy
                && kept
                    .iter()
                    .any(|k| self.is_same_entity(k.as_ref(), entity, true))
            {
                log::debug!("Fuzzy duplicate dropped: {} ({})", entity.name, entity.affiliation);
                continue;
            }
            seen.insert(key);
            kept.push(item);
        }
        kept
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            entries: self.cache.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl Default for IdentityResolver {
    fn default() -> Self {
        Self::new(&IdentityConfig::default())
    }
}
