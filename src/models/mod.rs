// src/models/mod.rs

//! Domain models for the aggregation engine.
//!
//! This module contains all data structures used throughout the crate,
//! organized by their primary purpose.

mod aggregate;
mod config;
mod entity;
mod render;
mod source;

// Re-export all public types
pub use aggregate::{Aggregated, AggregatedEntity, RankedEntry, SourceFailure, SourcedStats, Uid};
pub use config::{AggregatorConfig, Config, IdentityConfig, RenderConfig};
pub use entity::{Entity, EntityKind, LeaderboardRow, SearchFilters, Stats};
pub use render::{RenderRequest, RenderResult};
pub use source::{SourceId, TableSelectors, TableSourceConfig};
