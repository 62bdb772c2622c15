// src/sources/table.rs

//! Table-driven source adapter.
//!
//! Fetches listing, leaderboard and stats pages through the shared
//! [`RenderService`] and extracts rows with the CSS selectors from a
//! `[[sources]]` entry. Rendering failures propagate; markup that does not
//! match the selectors yields empty results with a warning.

use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{
    Entity, EntityKind, LeaderboardRow, RenderRequest, SearchFilters, SourceId, Stats, TableSelectors,
    TableSourceConfig,
};
use crate::render::RenderService;
use crate::sources::SourceAdapter;
use crate::utils::hash::short_hash;
use crate::utils::{extract_profile_id, fill_template, resolve_url};

static CLASS_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b((?:19|20)\d{2})\b|'(\d{2})\b").unwrap());
static NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-?\d+(?:\.\d+)?").unwrap());

/// Adapter for sources that publish plain HTML tables.
pub struct TableAdapter {
    config: TableSourceConfig,
    render: Arc<RenderService>,
}

/// Selectors for one table, parsed once per page.
struct RowSelectors {
    row: Selector,
    name: Selector,
    affiliation: Selector,
    class_year: Option<Selector>,
    value: Selector,
    link: Option<Selector>,
}

impl RowSelectors {
    fn parse(selectors: &TableSelectors) -> Result<Self> {
        Ok(Self {
            row: parse_selector(&selectors.row_selector)?,
            name: parse_selector(&selectors.name_selector)?,
            affiliation: parse_selector(&selectors.affiliation_selector)?,
            class_year: selectors
                .class_year_selector
                .as_deref()
                .map(parse_selector)
                .transpose()?,
            value: parse_selector(&selectors.value_selector)?,
            link: selectors
                .link_selector
                .as_deref()
                .map(parse_selector)
                .transpose()?,
        })
    }
}

impl TableAdapter {
    pub fn new(config: TableSourceConfig, render: Arc<RenderService>) -> Self {
        Self { config, render }
    }

    /// Build one adapter per `[[sources]]` entry, in config order.
    pub fn from_config(sources: &[TableSourceConfig], render: &Arc<RenderService>) -> Vec<Self> {
        sources
            .iter()
            .map(|config| Self::new(config.clone(), Arc::clone(render)))
            .collect()
    }

    fn request(&self, url: String) -> RenderRequest {
        let mut request = RenderRequest::new(url)
            .wait_timeout_ms(self.render.config().wait_timeout_ms)
            .wait_for_idle(self.config.wait_for_idle);
        if let Some(selector) = &self.config.wait_for {
            request = request.wait_for(selector.as_str());
        }
        request
    }

    async fn fetch_html(&self, url: String) -> Result<(String, Url)> {
        let base = Url::parse(&url)?;
        let result = self.render.fetch(&self.request(url)).await?;
        Ok((result.html, base))
    }

    /// Parse entity rows from a listing or leaderboard page.
    ///
    /// Rows missing a name are skipped. The optional value is the parsed
    /// number in the value cell.
    fn parse_rows(
        &self,
        html: &str,
        base: &Url,
        kind: EntityKind,
    ) -> Result<Vec<(Entity, Option<f64>)>> {
        let selectors = RowSelectors::parse(&self.config.selectors)?;
        let document = Html::parse_document(html);
        Ok(document
            .select(&selectors.row)
            .filter_map(|row| self.parse_row(&row, &selectors, base, kind))
            .collect())
    }

    fn parse_row(
        &self,
        row: &ElementRef,
        selectors: &RowSelectors,
        base: &Url,
        kind: EntityKind,
    ) -> Option<(Entity, Option<f64>)> {
        let name_elem = row.select(&selectors.name).next()?;
        let name = clean_text(&name_elem.text().collect::<String>());
        if name.is_empty() {
            return None;
        }

        let affiliation = row
            .select(&selectors.affiliation)
            .next()
            .map(|el| clean_text(&el.text().collect::<String>()))
            .unwrap_or_default();
        let class_year = selectors
            .class_year
            .as_ref()
            .and_then(|sel| row.select(sel).next())
            .and_then(|el| parse_class_year(&el.text().collect::<String>()));
        let value = row
            .select(&selectors.value)
            .next()
            .and_then(|el| parse_number(&el.text().collect::<String>()));

        let link = selectors
            .link
            .as_ref()
            .and_then(|sel| row.select(sel).next())
            .or(Some(name_elem))
            .and_then(|el| el.value().attr("href"))
            .map(|href| resolve_url(base, href));
        let source_ref = link
            .as_deref()
            .and_then(extract_profile_id)
            .unwrap_or_else(|| short_hash(&[&name, &affiliation], 8));

        let mut entity = match kind {
            EntityKind::Player => Entity::player(source_ref, name, affiliation, class_year),
            EntityKind::Team => Entity::team(source_ref, name),
        };
        entity.link = link;
        Some((entity, value))
    }

    /// Parse `label | value` rows from a stats page.
    fn parse_stats(&self, html: &str) -> Result<BTreeMap<String, f64>> {
        let row_sel = parse_selector(&self.config.selectors.stat_row_selector)?;
        let cell_sel = parse_selector("th, td")?;
        let document = Html::parse_document(html);

        let mut values = BTreeMap::new();
        for row in document.select(&row_sel) {
            let mut cells = row.select(&cell_sel);
            let (Some(label), Some(value)) = (cells.next(), cells.next()) else {
                continue;
            };
            let label = clean_text(&label.text().collect::<String>()).to_lowercase();
            if let Some(number) = parse_number(&value.text().collect::<String>()) {
                if !label.is_empty() {
                    values.insert(label, number);
                }
            }
        }
        Ok(values)
    }

    fn degrade<T: Default>(&self, what: &str, outcome: Result<T>) -> T {
        outcome.unwrap_or_else(|e| {
            log::warn!("{}: could not parse {}: {}", self.config.source, what, e);
            T::default()
        })
    }
}

#[async_trait]
impl SourceAdapter for TableAdapter {
    fn source(&self) -> SourceId {
        self.config.source
    }

    async fn search_entities(&self, filters: &SearchFilters, limit: usize) -> Result<Vec<Entity>> {
        let class_year = filters.class_year.map(|y| y.to_string()).unwrap_or_default();
        let url = fill_template(
            &self.config.search_url,
            &[
                ("name", filters.name.as_deref().unwrap_or("")),
                ("affiliation", filters.affiliation.as_deref().unwrap_or("")),
                ("class_year", &class_year),
                ("season", filters.season.as_deref().unwrap_or("")),
            ],
        );
        let (html, base) = self.fetch_html(url).await?;
        let rows = self.degrade("listing", self.parse_rows(&html, &base, filters.kind));

        let entities: Vec<Entity> = rows
            .into_iter()
            .map(|(entity, _)| entity)
            .filter(|entity| filters.matches(entity))
            .take(limit)
            .collect();
        log::debug!("{}: {} entities", self.config.source, entities.len());
        Ok(entities)
    }

    async fn get_entity_stats(&self, entity_id: &str, period: &str) -> Result<Option<Stats>> {
        let Some(template) = &self.config.stats_url else {
            return Ok(None);
        };
        let url = fill_template(template, &[("id", entity_id), ("period", period)]);
        let (html, _) = self.fetch_html(url).await?;
        let values = self.degrade("stats page", self.parse_stats(&html));
        if values.is_empty() {
            return Ok(None);
        }
        Ok(Some(Stats {
            source_ref: entity_id.to_string(),
            period: period.to_string(),
            values,
        }))
    }

    async fn get_leaderboard(&self, stat: &str, limit: usize) -> Result<Vec<LeaderboardRow>> {
        let Some(template) = &self.config.leaderboard_url else {
            return Ok(Vec::new());
        };
        let url = fill_template(template, &[("stat", stat)]);
        let (html, base) = self.fetch_html(url).await?;
        let rows = self.degrade(
            "leaderboard",
            self.parse_rows(&html, &base, EntityKind::Player),
        );

        Ok(rows
            .into_iter()
            .filter_map(|(entity, value)| {
                value.map(|value| LeaderboardRow {
                    entity,
                    stat: stat.to_string(),
                    value,
                })
            })
            .take(limit)
            .collect())
    }
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

fn clean_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `2025`, `Class of 2025` and `'25` all map to 2025.
fn parse_class_year(raw: &str) -> Option<u16> {
    let caps = CLASS_YEAR.captures(raw)?;
    if let Some(full) = caps.get(1) {
        return full.as_str().parse().ok();
    }
    let short: u16 = caps.get(2)?.as_str().parse().ok()?;
    Some(2000 + short)
}

/// First number in a cell, ignoring thousands separators.
fn parse_number(raw: &str) -> Option<f64> {
    let cleaned = raw.replace(',', "");
    NUMBER.find(&cleaned)?.as_str().parse().ok()
}
