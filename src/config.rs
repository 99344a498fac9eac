//! Pipeline configuration support.
//!
//! This module loads a single YAML file of pipeline-wide settings (portal
//! URL, concurrency, directories) plus the five fixed-schema JSON config
//! files under `config_dir` that §6 calls out as read-only pipeline inputs:
//! `crawl-hotfix-mapping.json`, `dataset-id-mapping.json`,
//! `normalize-mapping.json`, `moldata-field-mapping.json`, and
//! `dataset-overrides.json`, plus the `facet-mappings/*.tsv` files and
//! `icd10-labels.json`.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! portal_base_url: "https://humandbs.dbcls.jp"
//! concurrency: 5
//! max_concurrency: 16
//! results_dir: "./results"
//! config_dir: "./config"
//! cache_dir: "./cache"
//! index_backend: in_memory
//! relation_service_url: "https://humandbs.dbcls.jp/relation-api"
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use common::PipelineError;
use facet::{FacetMappingTable, Icd10LabelTable, Icd10SplitTable, SplitEntry, FACET_FIELDS};
use fetcher::FetchConfig;
use indexwriter::BackendConfig;
use normalizer::{CriteriaTable, DatasetIdTables, IdScope, MolDataKeyTable, PublicationDenyLists};
use parser::{ControlledAccessRowEntry, ControlledAccessRowFixes};
use structurer::{InheritedMetadata, MetadataTable};

/// Errors that can occur while loading pipeline configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read { path: String, source: std::io::Error },

    #[error("failed to parse JSON config file {path}: {source}")]
    Json { path: String, source: serde_json::Error },

    #[error("failed to parse YAML pipeline settings: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("facet mapping file could not be read: {0}")]
    FacetMapping(String),
}

/// §7: configuration errors are always fatal, never a per-record count.
impl From<ConfigError> for PipelineError {
    fn from(err: ConfigError) -> Self {
        PipelineError::Config(err.to_string())
    }
}

fn read_to_string(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Read { path: path.display().to_string(), source })
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, ConfigError> {
    let raw = read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|source| ConfigError::Json { path: path.display().to_string(), source })
}

/// The YAML pipeline-wide settings file: directories, concurrency, and the
/// handful of environment-style knobs that aren't per-stage mapping tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PipelineSettings {
    pub portal_base_url: String,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    pub results_dir: PathBuf,
    pub config_dir: PathBuf,
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    #[serde(default)]
    pub index_backend: IndexBackendSetting,
    #[serde(default)]
    pub relation_service_url: Option<String>,
    #[serde(default)]
    pub admin_uid_file: Option<PathBuf>,
    #[serde(default)]
    pub env_overrides: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexBackendSetting {
    #[default]
    InMemory,
    Redb {
        path: PathBuf,
    },
}

impl IndexBackendSetting {
    pub fn into_backend_config(self) -> BackendConfig {
        match self {
            IndexBackendSetting::InMemory => BackendConfig::InMemory,
            IndexBackendSetting::Redb { path } => BackendConfig::redb(path.display().to_string()),
        }
    }
}

fn default_concurrency() -> usize {
    5
}
fn default_max_concurrency() -> usize {
    32
}
fn default_cache_dir() -> PathBuf {
    PathBuf::from("./cache")
}

impl PipelineSettings {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = read_to_string(path.as_ref())?;
        Ok(serde_yaml::from_str(&raw)?)
    }

    /// Effective worker-pool capacity (§5: "default 5, capped at a
    /// configured MAX").
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.max(1).min(self.max_concurrency.max(1))
    }
}

// --- crawl-hotfix-mapping.json -------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CrawlHotfixMappingWire {
    #[serde(default)]
    skip_list: Vec<String>,
    #[serde(default)]
    release_url_overrides: HashMap<String, String>,
    #[serde(default)]
    controlled_access_row_fixes: Vec<ControlledAccessRowEntry>,
    #[serde(default)]
    data_summary_pages: Vec<String>,
}

pub struct CrawlHotfixConfig {
    pub fetch_config: FetchConfig,
    pub row_fixes: ControlledAccessRowFixes,
    /// humIds whose detail page is a data-summary listing rather than a
    /// regular research page, consulted by the fetch stage before parsing.
    pub data_summary_pages: Vec<String>,
}

pub fn load_crawl_hotfix_mapping(path: &Path, portal_base_url: &str) -> Result<CrawlHotfixConfig, ConfigError> {
    let wire: CrawlHotfixMappingWire = read_json(path)?;

    let mut fetch_config = FetchConfig { portal_base_url: portal_base_url.to_string(), ..Default::default() };
    for hum_id in &wire.skip_list {
        if let Ok(id) = hum_id.parse() {
            fetch_config.skip_list.insert(id);
        }
    }
    fetch_config.release_url_overrides = wire.release_url_overrides;

    Ok(CrawlHotfixConfig {
        fetch_config,
        row_fixes: ControlledAccessRowFixes::from_entries(wire.controlled_access_row_fixes),
        data_summary_pages: wire.data_summary_pages,
    })
}

// --- dataset-id-mapping.json ----------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContextOverrideEntry {
    scope: String,
    token: String,
    replacement: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResearchScopeEntry {
    hum_id: String,
    token: String,
    replacement: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DatasetIdMappingWire {
    #[serde(default)]
    global_special_cases: HashMap<String, String>,
    #[serde(default)]
    no_split: Vec<String>,
    #[serde(default)]
    context_overrides: Vec<ContextOverrideEntry>,
    #[serde(default)]
    jgad_typos: HashMap<String, String>,
    #[serde(default)]
    research_scope_special_cases: Vec<ResearchScopeEntry>,
    #[serde(default)]
    legacy_jga: HashMap<String, String>,
    #[serde(default)]
    invalid_jgas: Vec<String>,
    #[serde(default)]
    invalid_ids: Vec<String>,
}

fn parse_scope(raw: &str) -> Option<IdScope> {
    match raw {
        "general" => Some(IdScope::General),
        "publication" => Some(IdScope::Publication),
        "controlledAccess" => Some(IdScope::ControlledAccess),
        _ => None,
    }
}

pub fn load_dataset_id_mapping(path: &Path) -> Result<DatasetIdTables, ConfigError> {
    let wire: DatasetIdMappingWire = read_json(path)?;
    let mut tables = DatasetIdTables::new();

    for (cleaned, replacement) in wire.global_special_cases {
        tables.insert_special_case(cleaned, replacement);
    }
    for cleaned in wire.no_split {
        tables.insert_no_split(cleaned);
    }
    for entry in wire.context_overrides {
        if let Some(scope) = parse_scope(&entry.scope) {
            tables.insert_context_override(scope, entry.token, entry.replacement);
        }
    }
    for (typo, corrected) in wire.jgad_typos {
        tables.insert_jgad_typo(typo, corrected);
    }
    for entry in wire.research_scope_special_cases {
        tables.insert_research_scope_case(entry.hum_id, entry.token, entry.replacement);
    }
    for (legacy, jgas) in wire.legacy_jga {
        tables.insert_legacy_jga(legacy, jgas);
    }
    for jgas_id in wire.invalid_jgas {
        tables.deny_jgas(jgas_id);
    }
    for id in wire.invalid_ids {
        tables.deny_id(id);
    }

    Ok(tables)
}

// --- normalize-mapping.json ------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NormalizeMappingWire {
    #[serde(default)]
    criteria: HashMap<String, String>,
    #[serde(default)]
    grant_deny_list: Vec<String>,
    #[serde(default)]
    doi_deny_list: Vec<String>,
    #[serde(default)]
    title_deny_list: Vec<String>,
    /// Raw policy token -> policy id. `Searchable.policies` has no stage of
    /// its own (facet's table-driven field mapping explicitly excludes
    /// structured fields), so this table is consulted directly by the root
    /// orchestrator after the facet stage runs.
    #[serde(default)]
    policy: HashMap<String, String>,
}

pub struct NormalizeMappingConfig {
    pub criteria: CriteriaTable,
    pub publication_deny_lists: PublicationDenyLists,
    pub policy_table: PolicyTable,
}

/// Raw policy token -> canonical `PolicyRef`.
#[derive(Debug, Clone, Default)]
pub struct PolicyTable {
    by_token: BTreeMap<String, String>,
}

impl PolicyTable {
    pub fn resolve(&self, raw_tokens: &[String]) -> Vec<common::PolicyRef> {
        raw_tokens
            .iter()
            .filter_map(|token| self.by_token.get(token.trim()))
            .map(|id| common::PolicyRef { id: id.clone() })
            .collect()
    }
}

fn criteria_from_str(value: &str) -> Option<common::Criteria> {
    match value {
        "Controlled-access (Type I)" => Some(common::Criteria::ControlledAccessTypeI),
        "Controlled-access (Type II)" => Some(common::Criteria::ControlledAccessTypeII),
        "Unrestricted-access" => Some(common::Criteria::UnrestrictedAccess),
        _ => None,
    }
}

pub fn load_normalize_mapping(path: &Path) -> Result<NormalizeMappingConfig, ConfigError> {
    let wire: NormalizeMappingWire = read_json(path)?;

    let mut criteria = CriteriaTable::with_defaults();
    for (phrase, canonical) in &wire.criteria {
        if let Some(value) = criteria_from_str(canonical) {
            criteria.insert(phrase, value);
        }
    }

    let mut publication_deny_lists = PublicationDenyLists::new();
    publication_deny_lists.grant_deny_list.extend(wire.grant_deny_list);
    publication_deny_lists.doi_deny_list.extend(wire.doi_deny_list);
    publication_deny_lists.title_deny_list.extend(wire.title_deny_list);

    let policy_table = PolicyTable { by_token: wire.policy.into_iter().collect() };

    Ok(NormalizeMappingConfig { criteria, publication_deny_lists, policy_table })
}

// --- moldata-field-mapping.json -------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MolDataFieldMappingWire {
    #[serde(default)]
    discard: Vec<String>,
    #[serde(default)]
    split: HashMap<String, Vec<String>>,
    #[serde(default)]
    canonical: HashMap<String, String>,
}

pub fn load_moldata_field_mapping(path: &Path) -> Result<MolDataKeyTable, ConfigError> {
    let wire: MolDataFieldMappingWire = read_json(path)?;
    let mut table = MolDataKeyTable::new();

    for raw_label in wire.discard {
        table.insert_discard(&raw_label);
    }
    for (raw_label, canonical_keys) in wire.split {
        table.insert_split(&raw_label, canonical_keys);
    }
    for (raw_label, canonical_key) in wire.canonical {
        table.insert_canonical(&raw_label, canonical_key);
    }

    Ok(table)
}

// --- dataset-overrides.json -------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DatasetOverrideEntry {
    dataset_id: String,
    #[serde(default)]
    is_override: bool,
    #[serde(default)]
    criteria: Vec<String>,
    #[serde(default)]
    release_date: Option<String>,
    #[serde(default)]
    type_of_data_ja: Option<String>,
    #[serde(default)]
    type_of_data_en: Option<String>,
}

pub fn load_dataset_overrides(path: &Path) -> Result<MetadataTable, ConfigError> {
    let entries: Vec<DatasetOverrideEntry> = read_json(path)?;
    let mut table = MetadataTable::new();

    for entry in entries {
        let metadata = InheritedMetadata {
            criteria: entry.criteria.iter().filter_map(|c| criteria_from_str(c)).collect(),
            release_date: entry.release_date,
            type_of_data: (entry.type_of_data_ja, entry.type_of_data_en),
        };
        if entry.is_override {
            table.set_override(entry.dataset_id, metadata);
        } else {
            table.declare(entry.dataset_id, metadata);
        }
    }

    Ok(table)
}

// --- facet-mappings/*.tsv and icd10-labels.json ----------------------------

pub fn load_facet_mapping_tables(dir: &Path) -> Result<BTreeMap<String, FacetMappingTable>, ConfigError> {
    let mut tables = BTreeMap::new();
    for &field in FACET_FIELDS {
        let path = dir.join(format!("{field}.tsv"));
        if !path.exists() {
            continue;
        }
        let raw = read_to_string(&path)?;
        let table = FacetMappingTable::from_reader(raw.as_bytes())
            .map_err(|e| ConfigError::FacetMapping(format!("{}: {e}", path.display())))?;
        tables.insert(field.to_string(), table);
    }
    Ok(tables)
}

pub fn load_icd10_labels(path: &Path) -> Result<Icd10LabelTable, ConfigError> {
    let raw = read_to_string(path)?;
    Icd10LabelTable::from_json(&raw).map_err(|source| ConfigError::Json { path: path.display().to_string(), source })
}

pub fn load_icd10_splits(path: &Path) -> Result<Icd10SplitTable, ConfigError> {
    if !path.exists() {
        return Ok(Icd10SplitTable::new());
    }
    let entries: Vec<SplitEntry> = read_json(path)?;
    Ok(Icd10SplitTable::from_entries(entries))
}

/// Everything loaded from the config directory, bundled for one pipeline run.
pub struct PipelineTables {
    pub fetch_config: FetchConfig,
    pub row_fixes: ControlledAccessRowFixes,
    pub data_summary_pages: Vec<String>,
    pub dataset_id: DatasetIdTables,
    pub criteria: CriteriaTable,
    pub publication_deny_lists: PublicationDenyLists,
    pub policy_table: PolicyTable,
    pub mol_data_keys: MolDataKeyTable,
    pub dataset_overrides: MetadataTable,
    pub facet_mappings: BTreeMap<String, FacetMappingTable>,
    pub icd10_labels: Icd10LabelTable,
    pub icd10_splits: Icd10SplitTable,
}

impl PipelineTables {
    pub fn load(settings: &PipelineSettings) -> Result<Self, ConfigError> {
        let dir = &settings.config_dir;
        let crawl_hotfix = load_crawl_hotfix_mapping(&dir.join("crawl-hotfix-mapping.json"), &settings.portal_base_url)?;
        let normalize_mapping = load_normalize_mapping(&dir.join("normalize-mapping.json"))?;

        Ok(Self {
            fetch_config: crawl_hotfix.fetch_config,
            row_fixes: crawl_hotfix.row_fixes,
            data_summary_pages: crawl_hotfix.data_summary_pages,
            dataset_id: load_dataset_id_mapping(&dir.join("dataset-id-mapping.json"))?,
            criteria: normalize_mapping.criteria,
            publication_deny_lists: normalize_mapping.publication_deny_lists,
            policy_table: normalize_mapping.policy_table,
            mol_data_keys: load_moldata_field_mapping(&dir.join("moldata-field-mapping.json"))?,
            dataset_overrides: load_dataset_overrides(&dir.join("dataset-overrides.json"))?,
            facet_mappings: load_facet_mapping_tables(&dir.join("facet-mappings"))?,
            icd10_labels: load_icd10_labels(&dir.join("icd10-labels.json"))?,
            icd10_splits: load_icd10_splits(&dir.join("icd10-splits.json"))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn pipeline_settings_apply_concurrency_cap() {
        let yaml = r#"
portal_base_url: "https://portal.example"
results_dir: "./results"
config_dir: "./config"
concurrency: 20
max_concurrency: 8
"#;
        let settings: PipelineSettings = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(settings.effective_concurrency(), 8);
    }

    #[test]
    fn loads_crawl_hotfix_mapping_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crawl-hotfix-mapping.json");
        let mut file = fs::File::create(&path).unwrap();
        write!(
            file,
            r#"{{"skipList": ["hum0099"], "releaseUrlOverrides": {{"hum0014-v3:ja": "/legacy/hum0014-v3.html"}}}}"#
        )
        .unwrap();

        let config = load_crawl_hotfix_mapping(&path, "https://portal.example").unwrap();
        assert!(config.fetch_config.is_skipped(&"hum0099".parse().unwrap()));
        assert_eq!(
            config.fetch_config.release_url_override("hum0014-v3", common::Lang::Ja),
            Some("/legacy/hum0014-v3.html")
        );
    }

    #[test]
    fn dataset_id_mapping_builds_a_usable_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dataset-id-mapping.json");
        fs::write(&path, r#"{"noSplit": ["JGAD000001 JGAD000002"], "invalidJgas": ["JGAS999999"]}"#).unwrap();

        // Behavioral assertions over the table's produced splits live in
        // `normalizer`; this just confirms the file round-trips without error.
        let _tables = load_dataset_id_mapping(&path).unwrap();
    }

    #[test]
    fn policy_table_resolves_known_tokens_only() {
        let mut by_token = BTreeMap::new();
        by_token.insert("restricted-research-use".to_string(), "POL-1".to_string());
        let table = PolicyTable { by_token };

        let resolved = table.resolve(&["restricted-research-use".to_string(), "unknown-token".to_string()]);
        assert_eq!(resolved, vec![common::PolicyRef { id: "POL-1".to_string() }]);
    }
}
