// src/models/aggregate.rs

//! Aggregation outputs: resolved entities, ranked rows and failure reports.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;
use crate::models::{Entity, SourceId, Stats};

/// Canonical identity derived from a normalized (name, affiliation, class) triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uid(pub String);

impl Uid {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An entity tagged with its source and resolved identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedEntity {
    pub uid: Uid,
    pub source: SourceId,
    pub entity: Entity,
}

impl AsRef<Entity> for AggregatedEntity {
    fn as_ref(&self) -> &Entity {
        &self.entity
    }
}

/// A leaderboard position after cross-source ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntry {
    /// 1-based position
    pub rank: usize,
    pub uid: Uid,
    pub stat_value: f64,
    pub source: SourceId,
    pub name: String,
    pub affiliation: String,
}

/// Stats tagged with the source that produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcedStats {
    pub source: SourceId,
    pub stats: Stats,
}

/// A source that failed during a fan-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFailure {
    pub source: SourceId,
    pub kind: ErrorKind,
    pub message: String,
}

/// Items from a fan-out plus the failures that were absorbed along the way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregated<T> {
    pub items: Vec<T>,
    pub failures: Vec<SourceFailure>,
}

impl<T> Aggregated<T> {
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn failed_sources(&self) -> Vec<SourceId> {
        self.failures.iter().map(|f| f.source).collect()
    }
}

impl<T> Default for Aggregated<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            failures: Vec::new(),
        }
    }
}
