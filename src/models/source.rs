// src/models/source.rs

//! Source tags and table-adapter source definitions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Closed set of statistics sources the engine knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SourceId {
    /// Nike EYBL circuit
    Eybl,
    /// Under Armour Association
    Uaa,
    /// Adidas 3SSB circuit
    ThreeSsb,
    MaxPreps,
    FibaYouth,
    /// Overtime Elite / OSBA prep league
    Osba,
    Grassroots365,
    /// NYC Public Schools Athletic League
    Psal,
}

impl SourceId {
    /// Every known source, in declaration order.
    pub const ALL: [SourceId; 8] = [
        SourceId::Eybl,
        SourceId::Uaa,
        SourceId::ThreeSsb,
        SourceId::MaxPreps,
        SourceId::FibaYouth,
        SourceId::Osba,
        SourceId::Grassroots365,
        SourceId::Psal,
    ];

    /// Stable lowercase slug used in config files and failure reports.
    pub fn slug(&self) -> &'static str {
        match self {
            SourceId::Eybl => "eybl",
            SourceId::Uaa => "uaa",
            SourceId::ThreeSsb => "3ssb",
            SourceId::MaxPreps => "maxpreps",
            SourceId::FibaYouth => "fiba-youth",
            SourceId::Osba => "osba",
            SourceId::Grassroots365 => "grassroots365",
            SourceId::Psal => "psal",
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for SourceId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        let needle = s.trim().to_lowercase();
        SourceId::ALL
            .into_iter()
            .find(|id| id.slug() == needle)
            .ok_or_else(|| AppError::config(format!("Unknown source '{s}'")))
    }
}

impl TryFrom<String> for SourceId {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<SourceId> for String {
    fn from(id: SourceId) -> Self {
        id.slug().to_string()
    }
}

/// A table-driven source definition loaded from `[[sources]]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSourceConfig {
    /// Which source this definition backs
    pub source: SourceId,

    /// Player listing URL
    pub search_url: String,

    /// Leaderboard URL template; `{stat}` is replaced with the stat key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leaderboard_url: Option<String>,

    /// Player stats URL template; `{id}` and `{period}` are replaced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats_url: Option<String>,

    /// Selector the renderer waits for before extracting
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_for: Option<String>,

    /// Whether the page needs a network-idle wait (SPA pages)
    #[serde(default)]
    pub wait_for_idle: bool,

    /// Cell selectors
    #[serde(default)]
    pub selectors: TableSelectors,
}

/// CSS selectors for scraping a stats table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSelectors {
    /// Selector for each row in the table
    pub row_selector: String,

    /// Selector for the name cell within a row
    pub name_selector: String,

    /// Selector for the team/school cell within a row
    pub affiliation_selector: String,

    /// Selector for the class year cell within a row
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_year_selector: Option<String>,

    /// Selector for the stat value cell on leaderboard rows
    #[serde(default = "default_value_selector")]
    pub value_selector: String,

    /// Selector for the element carrying the profile link
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_selector: Option<String>,

    /// Selector for `label`/`value` pairs on a stats page
    #[serde(default = "default_stat_row_selector")]
    pub stat_row_selector: String,
}

fn default_value_selector() -> String {
    "td:last-child".to_string()
}

fn default_stat_row_selector() -> String {
    "table.stats tr".to_string()
}

impl Default for TableSelectors {
    fn default() -> Self {
        Self {
            row_selector: "table tbody tr".to_string(),
            name_selector: "td:nth-child(1)".to_string(),
            affiliation_selector: "td:nth-child(2)".to_string(),
            class_year_selector: None,
            value_selector: default_value_selector(),
            link_selector: Some("a".to_string()),
            stat_row_selector: default_stat_row_selector(),
        }
    }
}
