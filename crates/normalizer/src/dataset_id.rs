//! Dataset ID reconciliation (§4.3.5) — the hardest normalizer stage. Every
//! ID string harvested from a dataset cell, publication, or controlled-
//! access-user row runs through this ordered pipeline: strip annotation
//! noise, split into tokens, substitute/convert/expand each token, and drop
//! anything left unrecognizable.
//!
//! Every step up to and including range enumeration is pure. Only step (f),
//! JGAS study expansion, calls out to the relation service; the service is
//! expected to be wrapped in a memoizing cache for the run (see
//! `relation::CachingRelationService`), so this module treats it as a plain
//! `&dyn RelationService`.

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use regex::Regex;
use relation::RelationService;
use tracing::warn;

use crate::error::NormalizeError;

/// Which kind of record an ID string was harvested from — the per-context
/// override map (step 3a) is keyed on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdScope {
    General,
    Publication,
    ControlledAccess,
}

const ANNOTATION_TOKENS_JA: &[&str] = &["データ追加", "データ削除", "に", "追加"];
const ANNOTATION_TOKENS_EN: &[&str] = &["data addition", "dataset addition", "data added", "data deleted"];

#[derive(Debug, Clone, Default)]
pub struct DatasetIdTables {
    special_case_strings: HashMap<String, String>,
    no_split_allowlist: HashSet<String>,
    context_overrides: HashMap<(IdScope, String), Vec<String>>,
    jgad_typo_to_jgas: HashMap<String, String>,
    research_scope_special_cases: HashMap<(String, String), Vec<String>>,
    jgax_legacy_to_jgas: HashMap<String, String>,
    invalid_jgas_deny_list: HashSet<String>,
    invalid_id_deny_list: HashSet<String>,
}

impl DatasetIdTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_special_case(&mut self, cleaned_form: impl Into<String>, replacement: impl Into<String>) {
        self.special_case_strings.insert(cleaned_form.into(), replacement.into());
    }

    pub fn insert_no_split(&mut self, cleaned_form: impl Into<String>) {
        self.no_split_allowlist.insert(cleaned_form.into());
    }

    pub fn insert_context_override(&mut self, scope: IdScope, token: impl Into<String>, replacement: Vec<String>) {
        self.context_overrides.insert((scope, token.into()), replacement);
    }

    pub fn insert_jgad_typo(&mut self, typo: impl Into<String>, corrected: impl Into<String>) {
        self.jgad_typo_to_jgas.insert(typo.into(), corrected.into());
    }

    pub fn insert_research_scope_case(
        &mut self,
        hum_id: impl Into<String>,
        token: impl Into<String>,
        replacement: Vec<String>,
    ) {
        self.research_scope_special_cases.insert((hum_id.into(), token.into()), replacement);
    }

    pub fn insert_legacy_jga(&mut self, legacy: impl Into<String>, jgas: impl Into<String>) {
        self.jgax_legacy_to_jgas.insert(legacy.into(), jgas.into());
    }

    pub fn deny_jgas(&mut self, jgas_id: impl Into<String>) {
        self.invalid_jgas_deny_list.insert(jgas_id.into());
    }

    pub fn deny_id(&mut self, id: impl Into<String>) {
        self.invalid_id_deny_list.insert(id.into());
    }
}

fn jgad_range() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^JGAD(\d+)-JGAD(\d+)$").unwrap())
}

fn jgas_shape() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^JGAS\d{6}$").unwrap())
}

/// Step 1: remove parentheses, annotation phrases, full-width/ASCII commas,
/// collapse whitespace, then apply the per-string special-case table.
fn strip_annotations(raw: &str, tables: &DatasetIdTables) -> String {
    let mut s = raw.replace(['(', ')'], "");

    for token in ANNOTATION_TOKENS_JA {
        s = s.replace(token, " ");
    }
    for token in ANNOTATION_TOKENS_EN {
        s = replace_case_insensitive(&s, token);
    }

    s = s.replace(['、', ','], " ");
    let cleaned: String = s.split_whitespace().collect::<Vec<_>>().join(" ");

    tables.special_case_strings.get(&cleaned).cloned().unwrap_or(cleaned)
}

fn replace_case_insensitive(haystack: &str, needle: &str) -> String {
    let lower_haystack = haystack.to_lowercase();
    let lower_needle = needle.to_lowercase();
    let mut result = String::with_capacity(haystack.len());
    let mut rest = haystack;
    let mut lower_rest = lower_haystack.as_str();
    while let Some(idx) = lower_rest.find(&lower_needle) {
        result.push_str(&rest[..idx]);
        result.push(' ');
        rest = &rest[idx + needle.len()..];
        lower_rest = &lower_rest[idx + lower_needle.len()..];
    }
    result.push_str(rest);
    result
}

/// Step 2: split on whitespace, unless the whole cleaned string is on the
/// no-split allow-list.
fn split_tokens(cleaned: &str, tables: &DatasetIdTables) -> Vec<String> {
    if tables.no_split_allowlist.contains(cleaned) {
        vec![cleaned.to_string()]
    } else {
        cleaned.split_whitespace().map(str::to_string).collect()
    }
}

/// Steps 3a-3d: context override, JGAD-typo table, research-scope special
/// cases, legacy JGA/JGAX conversion — each a single-token substitution
/// applied in order, first match wins per step.
fn apply_single_token_substitutions(
    token: &str,
    scope: IdScope,
    hum_id: &str,
    tables: &DatasetIdTables,
) -> Vec<String> {
    if let Some(replacement) = tables.context_overrides.get(&(scope, token.to_string())) {
        return replacement.clone();
    }
    if let Some(corrected) = tables.jgad_typo_to_jgas.get(token) {
        return vec![corrected.clone()];
    }
    if let Some(replacement) = tables
        .research_scope_special_cases
        .get(&(hum_id.to_string(), token.to_string()))
    {
        return replacement.clone();
    }
    if let Some(jgas) = tables.jgax_legacy_to_jgas.get(token) {
        return vec![jgas.clone()];
    }
    vec![token.to_string()]
}

/// Step 3e: `JGAD######-JGAD######` enumerates inclusive, preserving the
/// digit width of the lower bound.
fn expand_range(token: &str) -> Vec<String> {
    let Some(caps) = jgad_range().captures(token) else {
        return vec![token.to_string()];
    };
    let lower_str = &caps[1];
    let upper_str = &caps[2];
    let width = lower_str.len();
    let Ok(lower) = lower_str.parse::<u64>() else {
        return vec![token.to_string()];
    };
    let Ok(upper) = upper_str.parse::<u64>() else {
        return vec![token.to_string()];
    };
    if lower > upper {
        return vec![token.to_string()];
    }
    (lower..=upper).map(|n| format!("JGAD{n:0width$}")).collect()
}

/// Step 3f: expand a `JGAS######` token to its member JGAD IDs via the
/// relation service. Empty expansions and deny-listed JGAS IDs are dropped
/// with a warning (deny-listed ones silently, per spec).
async fn expand_jgas(
    token: &str,
    tables: &DatasetIdTables,
    relation_service: &dyn RelationService,
) -> Vec<String> {
    if !jgas_shape().is_match(token) {
        return vec![token.to_string()];
    }
    if tables.invalid_jgas_deny_list.contains(token) {
        return Vec::new();
    }

    match relation_service.get_datasets_from_study(token).await {
        Ok(datasets) if datasets.is_empty() => {
            warn!(jgas_id = token, "relation service returned no datasets for study");
            Vec::new()
        }
        Ok(datasets) => datasets,
        Err(err) => {
            warn!(jgas_id = token, error = %err, "relation service lookup failed, dropping token");
            Vec::new()
        }
    }
}

/// Runs the full §4.3.5 pipeline over one raw ID string, returning the
/// surviving clean IDs.
pub async fn normalize_dataset_ids(
    raw: &str,
    scope: IdScope,
    hum_id: &str,
    tables: &DatasetIdTables,
    relation_service: &dyn RelationService,
) -> Result<Vec<String>, NormalizeError> {
    let cleaned = strip_annotations(raw, tables);
    if cleaned.is_empty() {
        return Ok(Vec::new());
    }

    let mut out = Vec::new();
    for token in split_tokens(&cleaned, tables) {
        for substituted in apply_single_token_substitutions(&token, scope, hum_id, tables) {
            for ranged in expand_range(&substituted) {
                for expanded in expand_jgas(&ranged, tables, relation_service).await {
                    if !tables.invalid_id_deny_list.contains(&expanded) {
                        out.push(expanded);
                    }
                }
            }
        }
    }

    Ok(out)
}
