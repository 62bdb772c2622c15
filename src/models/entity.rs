// src/models/entity.rs

//! Entity records produced by source adapters.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// What kind of record an entity is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    #[default]
    Player,
    Team,
}

/// A player or team as reported by one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub kind: EntityKind,

    /// Source-local identifier (profile slug, row id, ...)
    pub source_ref: String,

    /// Display name
    pub name: String,

    /// School, club or program the entity belongs to
    pub affiliation: String,

    /// Graduating class, when the source reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_year: Option<u16>,

    /// Profile link, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,

    /// Extra source-specific fields (position, height, ...)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl Entity {
    /// Create a player entity.
    pub fn player(
        source_ref: impl Into<String>,
        name: impl Into<String>,
        affiliation: impl Into<String>,
        class_year: Option<u16>,
    ) -> Self {
        Self {
            kind: EntityKind::Player,
            source_ref: source_ref.into(),
            name: name.into(),
            affiliation: affiliation.into(),
            class_year,
            link: None,
            attributes: BTreeMap::new(),
        }
    }

    /// Create a team entity. Teams use their program as affiliation.
    pub fn team(source_ref: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            kind: EntityKind::Team,
            source_ref: source_ref.into(),
            affiliation: name.clone(),
            name,
            class_year: None,
            link: None,
            attributes: BTreeMap::new(),
        }
    }
}

impl AsRef<Entity> for Entity {
    fn as_ref(&self) -> &Entity {
        self
    }
}

/// Filters passed to `search_entities`. Empty fields are unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    #[serde(default)]
    pub kind: EntityKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affiliation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_year: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<String>,
}

impl SearchFilters {
    /// Whether an entity satisfies the name/affiliation/class filters.
    ///
    /// Name and affiliation use case-insensitive substring matching.
    pub fn matches(&self, entity: &Entity) -> bool {
        if entity.kind != self.kind {
            return false;
        }
        let contains = |hay: &str, needle: &Option<String>| match needle {
            Some(n) => hay.to_lowercase().contains(&n.trim().to_lowercase()),
            None => true,
        };
        if !contains(&entity.name, &self.name) || !contains(&entity.affiliation, &self.affiliation)
        {
            return false;
        }
        match self.class_year {
            Some(year) => entity.class_year == Some(year),
            None => true,
        }
    }
}

/// Stats for one entity over one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub source_ref: String,
    pub period: String,
    pub values: BTreeMap<String, f64>,
}

impl Stats {
    pub fn get(&self, stat: &str) -> Option<f64> {
        self.values.get(stat).copied()
    }
}

/// One row of a source's leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardRow {
    pub entity: Entity,
    pub stat: String,
    pub value: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filters_match_substrings_case_insensitively() {
        let e = Entity::player("p1", "John Smith", "Lincoln High", Some(2025));
        let filters = SearchFilters {
            name: Some("SMITH".into()),
            affiliation: Some("lincoln".into()),
            ..SearchFilters::default()
        };
        assert!(filters.matches(&e));
    }

    #[test]
    fn test_filters_respect_class_year_and_kind() {
        let e = Entity::player("p1", "John Smith", "Lincoln High", Some(2025));
        let filters = SearchFilters {
            class_year: Some(2026),
            ..SearchFilters::default()
        };
        assert!(!filters.matches(&e));

        let team_filters = SearchFilters {
            kind: EntityKind::Team,
            ..SearchFilters::default()
        };
        assert!(!team_filters.matches(&e));
    }

    #[test]
    fn test_team_uses_name_as_affiliation() {
        let t = Entity::team("t1", "Team Takeover");
        assert_eq!(t.affiliation, "Team Takeover");
        assert_eq!(t.kind, EntityKind::Team);
    }
}
