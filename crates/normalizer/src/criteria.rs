//! Criteria / policy canonicalization (§4.3.3).

use std::collections::HashMap;

use common::Criteria;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;
use tracing::warn;

/// Collapses a raw criteria token down to its lookup key: NFKC, lowercase,
/// whitespace, hyphens, and parentheses stripped entirely so that
/// "Controlled-access (Type I)" and "制限公開(TypeI)" both land on a key
/// untouched by how the portal happens to punctuate the phrase.
fn normalize_key(raw: &str) -> String {
    raw.nfkc()
        .collect::<String>()
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '-' | '(' | ')'))
        .collect()
}

/// Maps normalized ja/en criteria phrasings onto one of the three canonical
/// [`Criteria`] values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CriteriaTable {
    entries: HashMap<String, Criteria>,
}

impl CriteriaTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The phrasings the portal is known to use, normalized via
    /// [`normalize_key`] so the entries match regardless of source spacing.
    pub fn with_defaults() -> Self {
        let mut table = Self::new();
        let pairs: &[(&str, Criteria)] = &[
            ("controlledaccesstypei", Criteria::ControlledAccessTypeI),
            ("制限公開I", Criteria::ControlledAccessTypeI),
            ("制限公開(TypeI)", Criteria::ControlledAccessTypeI),
            ("タイプI制限公開", Criteria::ControlledAccessTypeI),
            ("controlledaccesstypeii", Criteria::ControlledAccessTypeII),
            ("制限公開II", Criteria::ControlledAccessTypeII),
            ("制限公開(TypeII)", Criteria::ControlledAccessTypeII),
            ("タイプII制限公開", Criteria::ControlledAccessTypeII),
            ("unrestrictedaccess", Criteria::UnrestrictedAccess),
            ("非制限公開", Criteria::UnrestrictedAccess),
            ("公開", Criteria::UnrestrictedAccess),
        ];
        for (phrase, criteria) in pairs {
            table.insert(phrase, criteria.clone());
        }
        table
    }

    pub fn insert(&mut self, raw_phrase: &str, criteria: Criteria) {
        self.entries.insert(normalize_key(raw_phrase), criteria);
    }

    pub fn lookup(&self, raw_phrase: &str) -> Option<Criteria> {
        self.entries.get(&normalize_key(raw_phrase)).cloned()
    }
}

/// Splits on comma or slash, normalizes each piece, and drops (with a
/// warning) anything not in the table.
pub fn normalize_criteria(raw: &str, table: &CriteriaTable) -> Vec<Criteria> {
    raw.split(|c| c == ',' || c == '/')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|piece| match table.lookup(piece) {
            Some(criteria) => Some(criteria),
            None => {
                warn!(value = piece, "unknown criteria value dropped");
                None
            }
        })
        .collect()
}
