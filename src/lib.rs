//! Orchestration for the humportal ingestion pipeline.
//!
//! This crate wires the nine stage crates (`fetcher`, `parser`,
//! `normalizer`, `structurer`, `facet`, `indexwriter`, `search`, plus the
//! shared `common`/`relation` layers) into the batch pipeline described in
//! §4: Fetch -> Parse -> Normalize -> Structure -> Facet/ICD10-normalize ->
//! Index. Each stage is a `run_*_stage` function that fans out over
//! independent `(humVersionId, language)` work items through [`pool::WorkerPool`]
//! and folds per-item failures into a [`common::StageReport`] rather than
//! aborting the run (§7 "Propagation policy").

pub mod config;
pub mod pool;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use common::{HumId, Lang, PipelineError, StageReport};
use fetcher::{Fetcher, PageKind};
use indexwriter::{IndexWriter, DATASET_INDEX, RESEARCH_INDEX, RESEARCH_VERSION_INDEX};
use normalizer::{normalize_record, NormalizedRecord, NormalizerTables};
use parser::{ControlledAccessRowFixes, DetailParser};
use relation::{CachingRelationService, RelationService};
use structurer::{AssembledResearch, MetadataTable, VersionInput};
use tracing::{info, instrument, warn};

pub use config::{ConfigError, PipelineSettings, PipelineTables};
pub use pool::WorkerPool;

use serde::Deserialize;

/// One humId's set of known versions, the seed the full pipeline run fans
/// out from. Produced outside this crate (a portal crawl-discovery step is
/// out of scope here; see §C Non-goals "no real-time ingestion"); this
/// manifest is what a scheduled run is handed.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub hum_id: HumId,
    pub versions: Vec<u32>,
}

/// Expands a manifest into the `(humVersionId, language)` work items the
/// fetch/parse/normalize stages fan out over.
pub fn work_items_from_manifest(manifest: &[ManifestEntry]) -> Vec<WorkItem> {
    let mut items = Vec::new();
    for entry in manifest {
        for &version in &entry.versions {
            let hum_version_id = common::HumVersionId::new(entry.hum_id.clone(), version).to_string();
            for lang in [Lang::Ja, Lang::En] {
                items.push(WorkItem { hum_id: entry.hum_id.clone(), hum_version_id: hum_version_id.clone(), version, lang });
            }
        }
    }
    items
}

/// Outcome of one end-to-end run: a `StageReport` per stage, folded across
/// every humId in the manifest.
#[derive(Debug, Clone, Default)]
pub struct PipelineRunReport {
    pub fetch: StageReport,
    pub parse: StageReport,
    pub normalize: StageReport,
    pub facet: StageReport,
    pub index: StageReport,
}

/// Runs Fetch -> Parse -> Normalize -> Structure -> Facet/ICD10 -> Index
/// for every humId in `manifest`, in the teacher's batch style: one
/// bounded-concurrency fan-out per stage rather than one pipeline per item
/// (§5 "batch-parallel scheduling"). Structuring is inherently per-humId
/// (it needs every version's normalized records at once), so it — and the
/// facet/index passes that follow it — run per humId after the shared
/// fetch/parse/normalize fan-outs complete.
#[instrument(skip(pool, settings, tables, relation_service, writer, manifest))]
pub async fn run_full_pipeline<R: RelationService + Send + Sync + 'static>(
    pool: &WorkerPool,
    settings: &PipelineSettings,
    tables: &mut PipelineTables,
    relation_service: Arc<CachingRelationService<R>>,
    writer: &IndexWriter,
    manifest: &[ManifestEntry],
) -> Result<PipelineRunReport, PipelineError> {
    let results_dir = Arc::new(settings.results_dir.clone());
    let items = work_items_from_manifest(manifest);

    let fetcher = Arc::new(Fetcher::new(tables.fetch_config.clone(), settings.cache_dir.clone()));
    let (fetch_report, html_by_key) = run_fetch_stage(pool, fetcher, items.clone()).await;

    let parse_report = run_parse_stage(&results_dir, &tables.row_fixes, &items, &html_by_key);

    let normalizer_tables = Arc::new(NormalizerTables {
        portal_base_url: settings.portal_base_url.clone(),
        criteria: tables.criteria.clone(),
        dataset_id: tables.dataset_id.clone(),
        mol_data_keys: tables.mol_data_keys.clone(),
        publication_deny_lists: tables.publication_deny_lists.clone(),
    });
    let normalize_report =
        run_normalize_stage(pool, Arc::clone(&results_dir), normalizer_tables, Arc::clone(&relation_service), items).await;

    let mut facet_report = StageReport::new();
    let mut index_report = StageReport::new();

    for entry in manifest {
        let versions: Vec<(u32, String)> = entry
            .versions
            .iter()
            .map(|&v| (v, common::HumVersionId::new(entry.hum_id.clone(), v).to_string()))
            .collect();

        let mut assembled = match run_structure_stage(&results_dir, entry.hum_id.clone(), &tables.dataset_overrides, versions) {
            Ok(assembled) => assembled,
            Err(err) => {
                facet_report.record_failure(entry.hum_id.to_string(), err.to_string());
                continue;
            }
        };

        let item_facet_report = run_facet_stage(
            &mut tables.facet_mappings,
            &tables.icd10_labels,
            &tables.icd10_splits,
            &tables.policy_table,
            &mut assembled.datasets,
        );
        facet_report.merge(item_facet_report);

        for dataset in &assembled.datasets {
            write_json_atomically(&dataset_path(&results_dir, dataset.dataset_id.as_str(), &dataset.version), dataset)?;
        }

        index_report.merge(run_index_stage(writer, &assembled));
    }

    persist_dirty_facet_mappings(&settings.config_dir.join("facet-mappings"), &tables.facet_mappings);

    Ok(PipelineRunReport { fetch: fetch_report, parse: parse_report, normalize: normalize_report, facet: facet_report, index: index_report })
}

/// Writes back any facet-mapping table that picked up a new unmapped value
/// during this run, so `__PENDING__` rows are visible to a curator ahead of
/// the next run rather than silently rediscovered every time (§4.5).
fn persist_dirty_facet_mappings(dir: &Path, facet_mappings: &BTreeMap<String, facet::FacetMappingTable>) {
    for (field, table) in facet_mappings {
        if !table.dirty() {
            continue;
        }
        let path = dir.join(format!("{field}.tsv"));
        match table.save(&path) {
            Ok(()) => warn!(field, pending = table.unmapped().len(), "facet-mapping table updated with pending entries"),
            Err(err) => warn!(field, %err, "failed to persist facet-mapping table"),
        }
    }
}

/// One unit of fetch/parse/normalize work: a single language variant of a
/// single humVersionId's detail page (§5 "work items are independent per
/// (humVersionId, language)").
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub hum_id: HumId,
    pub hum_version_id: String,
    pub version: u32,
    pub lang: Lang,
}

impl WorkItem {
    pub fn key(&self) -> String {
        format!("{}-{}", self.hum_version_id, self.lang)
    }
}

/// Writes `bytes` to `path` via a sibling temp file plus rename, so a
/// cancelled or crashed run never leaves a half-written artifact behind
/// (§5 "stages write atomically via temp-file + rename").
fn write_atomically(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension(format!(
        "{}.tmp",
        path.extension().and_then(|e| e.to_str()).unwrap_or("json")
    ));
    std::fs::write(&tmp_path, bytes)?;
    std::fs::rename(&tmp_path, path)
}

fn write_json_atomically(path: &Path, value: &impl serde::Serialize) -> Result<(), PipelineError> {
    let bytes = serde_json::to_vec_pretty(value).map_err(|e| PipelineError::IndexIo(e.to_string()))?;
    write_atomically(path, &bytes).map_err(|e| PipelineError::IndexIo(e.to_string()))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, PipelineError> {
    let raw = std::fs::read_to_string(path).map_err(|e| PipelineError::IndexIo(format!("{}: {e}", path.display())))?;
    serde_json::from_str(&raw).map_err(|e| PipelineError::Parse(format!("{}: {e}", path.display())))
}

/// §6 filesystem layout: `detail-json/{humVersionId}-{lang}.json`.
pub fn raw_record_path(results_dir: &Path, hum_version_id: &str, lang: Lang) -> PathBuf {
    results_dir.join("detail-json").join(format!("{hum_version_id}-{lang}.json"))
}

/// §6: `normalized-json/{humVersionId}-{lang}.json`.
pub fn normalized_record_path(results_dir: &Path, hum_version_id: &str, lang: Lang) -> PathBuf {
    results_dir.join("normalized-json").join(format!("{hum_version_id}-{lang}.json"))
}

/// §6: `structured-json/research/{humId}.json`.
pub fn research_path(results_dir: &Path, hum_id: &HumId) -> PathBuf {
    results_dir.join("structured-json").join("research").join(format!("{hum_id}.json"))
}

/// §6: `structured-json/research-version/{humVersionId}.json`.
pub fn research_version_path(results_dir: &Path, hum_version_id: &str) -> PathBuf {
    results_dir.join("structured-json").join("research-version").join(format!("{hum_version_id}.json"))
}

/// §6: `structured-json/dataset/{datasetId}-{version}.json`.
pub fn dataset_path(results_dir: &Path, dataset_id: &str, version: &str) -> PathBuf {
    results_dir.join("structured-json").join("dataset").join(format!("{dataset_id}-{version}.json"))
}

/// **Fetch stage** (§4.1): downloads each work item's detail HTML, honoring
/// the skip list and release-URL overrides baked into `fetcher`, and caches
/// the raw markup on disk keyed by URL.
#[instrument(skip(pool, fetcher, items))]
pub async fn run_fetch_stage(pool: &WorkerPool, fetcher: Arc<Fetcher>, items: Vec<WorkItem>) -> (StageReport, BTreeMap<String, String>) {
    let results = pool
        .run(items, move |item| {
            let fetcher = Arc::clone(&fetcher);
            async move {
                let span = tracing::info_span!("fetch_work_item", hum_version_id = %item.hum_version_id, lang = %item.lang);
                let _enter = span.enter();
                let outcome = fetcher
                    .fetch(&item.hum_id, &item.hum_version_id, item.lang, PageKind::Detail, true)
                    .await;
                (item, outcome)
            }
        })
        .await;

    let mut report = StageReport::new();
    let mut html_by_key = BTreeMap::new();
    for (item, outcome) in results {
        match outcome {
            Ok(html) => {
                report.record_success();
                html_by_key.insert(item.key(), html);
            }
            Err(err) => {
                warn!(key = %item.key(), %err, "fetch failed");
                report.record_failure(item.key(), err.to_string());
            }
        }
    }
    (report, html_by_key)
}

/// **DetailParser stage** (§4.2): turns each fetched HTML page into a
/// `RawRecord`, written to `detail-json/`.
#[instrument(skip(row_fixes, items, html_by_key))]
pub fn run_parse_stage(
    results_dir: &Path,
    row_fixes: &ControlledAccessRowFixes,
    items: &[WorkItem],
    html_by_key: &BTreeMap<String, String>,
) -> StageReport {
    let parser = DetailParser::new(row_fixes);
    let mut report = StageReport::new();

    for item in items {
        let key = item.key();
        let Some(html) = html_by_key.get(&key) else {
            continue;
        };
        match parser.parse(&item.hum_id, &item.hum_version_id, html) {
            Ok(raw) => {
                let path = raw_record_path(results_dir, &item.hum_version_id, item.lang);
                match write_json_atomically(&path, &raw) {
                    Ok(()) => report.record_success(),
                    Err(err) => report.record_failure(key, err.to_string()),
                }
            }
            Err(err) => {
                warn!(%key, %err, "parse failed");
                report.record_failure(key, err.to_string());
            }
        }
    }
    report
}

/// **Normalizer stage** (§4.3): canonicalizes every field of a `RawRecord`,
/// consulting the cached, memoizing `relation::CachingRelationService` for
/// JGAS->JGAD expansion. Runs per `(humVersionId, language)`, async because
/// relation lookups may suspend.
#[instrument(skip(pool, tables, relation_service, items))]
pub async fn run_normalize_stage<R: RelationService + Send + Sync + 'static>(
    pool: &WorkerPool,
    results_dir: Arc<PathBuf>,
    tables: Arc<NormalizerTables>,
    relation_service: Arc<CachingRelationService<R>>,
    items: Vec<WorkItem>,
) -> StageReport {
    let results = pool
        .run(items, move |item| {
            let results_dir = Arc::clone(&results_dir);
            let tables = Arc::clone(&tables);
            let relation_service = Arc::clone(&relation_service);
            async move {
                let key = item.key();
                let raw_path = raw_record_path(&results_dir, &item.hum_version_id, item.lang);
                let raw = match read_json(&raw_path) {
                    Ok(raw) => raw,
                    Err(err) => return (key, Err(err)),
                };

                let outcome = normalize_record(&item.hum_id.to_string(), item.lang, &raw, &tables, relation_service.as_ref())
                    .await
                    .map_err(|e| PipelineError::Normalize(e.to_string()))
                    .and_then(|normalized: NormalizedRecord| {
                        let out_path = normalized_record_path(&results_dir, &item.hum_version_id, item.lang);
                        write_json_atomically(&out_path, &normalized)
                    });
                (key, outcome)
            }
        })
        .await;

    let mut report = StageReport::new();
    for (key, outcome) in results {
        match outcome {
            Ok(()) => report.record_success(),
            Err(err) => {
                warn!(%key, %err, "normalize failed");
                report.record_failure(key, err.to_string());
            }
        }
    }
    report
}

/// **Structurer stage** (§4.4): assembles one humId's ordered version
/// history of bilingual `NormalizedRecord`s into a `Research`, its
/// `ResearchVersion`s, and the `Dataset`s they reference. Processes
/// versions within one humId in ascending numeric order (§5); there is no
/// cross-humId ordering requirement, so this can be called once per humId
/// from inside a worker-pool fan-out at the call site.
#[instrument(skip(metadata, versions))]
pub fn run_structure_stage(
    results_dir: &Path,
    hum_id: HumId,
    metadata: &MetadataTable,
    mut versions: Vec<(u32, String)>,
) -> Result<AssembledResearch, PipelineError> {
    versions.sort_by_key(|(version, _)| *version);

    let mut inputs = Vec::with_capacity(versions.len());
    for (version, hum_version_id) in &versions {
        let ja: NormalizedRecord = read_json(&normalized_record_path(results_dir, hum_version_id, Lang::Ja))?;
        let en: NormalizedRecord = read_json(&normalized_record_path(results_dir, hum_version_id, Lang::En))?;
        inputs.push(VersionInput { version: *version, hum_version_id: hum_version_id.parse().map_err(|e| PipelineError::Parse(format!("{e:?}")))?, ja, en });
    }

    let assembled = structurer::assemble(hum_id.clone(), &inputs, metadata).map_err(|e| PipelineError::Parse(e.to_string()))?;

    write_json_atomically(&research_path(results_dir, &hum_id), &assembled.research)?;
    for version in &assembled.versions {
        write_json_atomically(&research_version_path(results_dir, &version.hum_version_id.to_string()), version)?;
    }
    for dataset in &assembled.datasets {
        write_json_atomically(&dataset_path(results_dir, dataset.dataset_id.as_str(), &dataset.version), dataset)?;
    }

    info!(hum_id = %hum_id, datasets = assembled.datasets.len(), "structured one research record");
    Ok(assembled)
}

/// **Facet/ICD10-Normalizer stage** (§4.5): runs both idempotent
/// post-processing passes over every structured `Dataset` and resolves
/// `Searchable.policies` from the root-owned policy table (no stage crate
/// has a dedicated normalizer for that field; see `config::PolicyTable`).
#[instrument(skip(tables, icd10_labels, icd10_splits, policy_table, datasets))]
pub fn run_facet_stage(
    facet_mappings: &mut BTreeMap<String, facet::FacetMappingTable>,
    icd10_labels: &facet::Icd10LabelTable,
    icd10_splits: &facet::Icd10SplitTable,
    policy_table: &config::PolicyTable,
    datasets: &mut [common::Dataset],
) -> StageReport {
    let mut report = StageReport::new();
    for dataset in datasets.iter_mut() {
        facet::normalize_facets(dataset, facet_mappings);
        facet::normalize_icd10(dataset, icd10_labels, icd10_splits);

        for experiment in &mut dataset.experiments {
            // `policies` carries raw tokens until this point; the table
            // resolves each to a canonical `PolicyRef` or drops it.
            let raw_tokens: Vec<String> = experiment.searchable.policies.iter().map(|p| p.id.clone()).collect();
            experiment.searchable.policies = policy_table.resolve(&raw_tokens);
        }

        let violations = facet::check_icd10(dataset, icd10_labels);
        if violations.is_empty() {
            report.record_success();
        } else {
            let message = violations.iter().map(|v| v.to_string()).collect::<Vec<_>>().join("; ");
            report.record_failure(dataset.dataset_id.to_string(), message);
        }
    }
    report
}

/// **IndexWriter stage** (§4.6): commits every `Research`/`ResearchVersion`/
/// `Dataset` produced by the structurer (after facet normalization) into
/// the document store, via `create` for a brand-new humId or `update`
/// after a fresh `get` for one that already exists.
#[instrument(skip(writer, assembled))]
pub fn run_index_stage(writer: &IndexWriter, assembled: &AssembledResearch) -> StageReport {
    let mut report = StageReport::new();

    let hum_id = assembled.research.hum_id.to_string();
    match writer.get::<common::Research>(RESEARCH_INDEX, &hum_id) {
        Ok(Some(existing)) => {
            match writer.update::<common::Research>(RESEARCH_INDEX, &hum_id, &assembled.research, existing.seq_no, existing.primary_term) {
                Ok(Some(_)) => report.record_success(),
                Ok(None) => report.record_failure(hum_id.clone(), PipelineError::IndexConflict(hum_id.clone()).to_string()),
                Err(err) => report.record_failure(hum_id.clone(), PipelineError::IndexIo(err.to_string()).to_string()),
            }
        }
        Ok(None) => match writer.create(RESEARCH_INDEX, &hum_id, &assembled.research) {
            Ok(()) => report.record_success(),
            Err(err) => report.record_failure(hum_id.clone(), PipelineError::IndexIo(err.to_string()).to_string()),
        },
        Err(err) => report.record_failure(hum_id.clone(), PipelineError::IndexIo(err.to_string()).to_string()),
    }

    for version in &assembled.versions {
        let id = version.hum_version_id.to_string();
        let outcome = match writer.get::<common::ResearchVersion>(RESEARCH_VERSION_INDEX, &id) {
            Ok(Some(existing)) => writer
                .update::<common::ResearchVersion>(RESEARCH_VERSION_INDEX, &id, version, existing.seq_no, existing.primary_term)
                .map(|_| ()),
            Ok(None) => writer.create(RESEARCH_VERSION_INDEX, &id, version),
            Err(err) => Err(err),
        };
        match outcome {
            Ok(()) => report.record_success(),
            Err(err) => report.record_failure(id, PipelineError::IndexIo(err.to_string()).to_string()),
        }
    }

    for dataset in &assembled.datasets {
        let id = format!("{}-{}", dataset.dataset_id, dataset.version);
        let outcome = match writer.get::<common::Dataset>(DATASET_INDEX, &id) {
            Ok(Some(existing)) => writer.update::<common::Dataset>(DATASET_INDEX, &id, dataset, existing.seq_no, existing.primary_term).map(|_| ()),
            Ok(None) => writer.create(DATASET_INDEX, &id, dataset),
            Err(err) => Err(err),
        };
        match outcome {
            Ok(()) => report.record_success(),
            Err(err) => report.record_failure(id, PipelineError::IndexIo(err.to_string()).to_string()),
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexwriter::InMemoryBackend;

    #[test]
    fn atomic_write_leaves_no_tmp_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("example.json");
        write_json_atomically(&path, &serde_json::json!({"a": 1})).unwrap();

        assert!(path.exists());
        let tmp = path.with_extension("json.tmp");
        assert!(!tmp.exists());
    }

    #[test]
    fn filesystem_layout_paths_match_the_external_interface_contract() {
        let root = Path::new("/results");
        assert_eq!(raw_record_path(root, "hum0014-v3", Lang::Ja), Path::new("/results/detail-json/hum0014-v3-ja.json"));
        assert_eq!(normalized_record_path(root, "hum0014-v3", Lang::En), Path::new("/results/normalized-json/hum0014-v3-en.json"));
        assert_eq!(research_path(root, &"hum0014".parse().unwrap()), Path::new("/results/structured-json/research/hum0014.json"));
        assert_eq!(dataset_path(root, "JGAD000001", "v1"), Path::new("/results/structured-json/dataset/JGAD000001-v1.json"));
    }

    #[test]
    fn index_stage_creates_then_updates_on_rerun() {
        let writer = IndexWriter::new(Box::new(InMemoryBackend::new()));
        let hum_id: HumId = "hum0014".parse().unwrap();
        let assembled = AssembledResearch {
            research: sample_research(hum_id.clone()),
            versions: vec![sample_version(hum_id.clone())],
            datasets: Vec::new(),
        };

        let first = run_index_stage(&writer, &assembled);
        assert!(first.is_fully_successful());

        let second = run_index_stage(&writer, &assembled);
        assert!(second.is_fully_successful());
    }

    fn sample_research(hum_id: HumId) -> common::Research {
        common::Research {
            hum_id: hum_id.clone(),
            url: common::BilingualText::default(),
            title: common::BilingualText::default(),
            summary: common::BilingualTextValue::default(),
            data_provider: Vec::new(),
            research_project: Vec::new(),
            grant: Vec::new(),
            related_publication: Vec::new(),
            controlled_access_user: Vec::new(),
            version_ids: vec![common::HumVersionId::new(hum_id.clone(), 1)],
            latest_version: common::HumVersionId::new(hum_id, 1),
            first_release_date: None,
            last_release_date: None,
            status: common::Status::Draft,
            uids: Vec::new(),
        }
    }

    fn sample_version(hum_id: HumId) -> common::ResearchVersion {
        common::ResearchVersion {
            hum_id: hum_id.clone(),
            hum_version_id: common::HumVersionId::new(hum_id, 1),
            version: 1,
            version_release_date: None,
            datasets: Vec::new(),
            release_note: common::BilingualTextValue::default(),
        }
    }
}
