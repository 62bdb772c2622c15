// src/identity/normalize.rs

//! Name and affiliation normalization.

use std::collections::BTreeMap;

/// Lowercase, collapse runs of whitespace to one space, trim.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Normalizes affiliations, rewriting a trailing suffix only when an explicit alias exists.
///
/// `"Lincoln HS"` and `"Lincoln High School"` collapse together when `hs` is
/// mapped to `high school`; an unmapped suffix is left as-is.
#[derive(Debug, Clone, Default)]
pub struct AffiliationNormalizer {
    aliases: BTreeMap<String, String>,
}

impl AffiliationNormalizer {
    pub fn new(aliases: &BTreeMap<String, String>) -> Self {
        let aliases = aliases
            .iter()
            .map(|(variant, canonical)| (normalize_text(variant), normalize_text(canonical)))
            .filter(|(variant, canonical)| !variant.is_empty() && !canonical.is_empty())
            .collect();
        Self { aliases }
    }

    pub fn normalize(&self, affiliation: &str) -> String {
        let base = normalize_text(affiliation);
        // Single-word affiliations are names, not suffixes.
        let Some((head, suffix)) = base.rsplit_once(' ') else {
            return base;
        };
        match self.aliases.get(suffix) {
            Some(canonical) => format!("{head} {canonical}"),
            None => base,
        }
    }
}
