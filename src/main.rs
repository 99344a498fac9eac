//! CLI entry point for the humportal ingestion pipeline.
//!
//! A thin argument reader, not a general CLI framework: pipeline settings
//! plus a manifest of humIds and their known versions. Structured logging
//! is initialized from `RUST_LOG` via `tracing-subscriber`'s `EnvFilter`;
//! stage dispatch, concurrency, and atomic writes all live in the library.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use humportal_pipeline::config::{PipelineSettings, PipelineTables};
use humportal_pipeline::pool::WorkerPool;
use humportal_pipeline::{run_full_pipeline, ManifestEntry, PipelineRunReport};
use relation::{CachingRelationService, HttpRelationService};

struct Args {
    settings_path: PathBuf,
    manifest_path: PathBuf,
}

fn usage() -> ! {
    eprintln!("usage: humportal <settings.yaml> <manifest.json>");
    std::process::exit(1);
}

fn parse_args() -> Args {
    let mut args = std::env::args().skip(1);
    let settings_path = args.next().map(PathBuf::from).unwrap_or_else(|| usage());
    let manifest_path = args.next().map(PathBuf::from).unwrap_or_else(|| usage());
    Args { settings_path, manifest_path }
}

fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

fn main() -> ExitCode {
    init_logging();
    let args = parse_args();

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("failed to start async runtime: {err}");
            return ExitCode::from(2);
        }
    };

    runtime.block_on(run(args))
}

fn load_manifest(path: &PathBuf) -> Result<Vec<ManifestEntry>, String> {
    let raw = std::fs::read_to_string(path).map_err(|e| format!("{}: {e}", path.display()))?;
    serde_json::from_str(&raw).map_err(|e| format!("{}: {e}", path.display()))
}

async fn run(args: Args) -> ExitCode {
    let settings = match PipelineSettings::from_file(&args.settings_path) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("config error: {err}");
            return ExitCode::from(1);
        }
    };

    let mut tables = match PipelineTables::load(&settings) {
        Ok(tables) => tables,
        Err(err) => {
            eprintln!("config error: {err}");
            return ExitCode::from(1);
        }
    };

    let manifest = match load_manifest(&args.manifest_path) {
        Ok(manifest) => manifest,
        Err(err) => {
            eprintln!("config error: failed to read manifest: {err}");
            return ExitCode::from(1);
        }
    };

    let Some(relation_service_url) = settings.relation_service_url.clone() else {
        eprintln!("config error: relation_service_url is required");
        return ExitCode::from(1);
    };

    let relation_cache_path = settings.cache_dir.join("relation-cache.json");
    let inner = HttpRelationService::new(relation_service_url);
    let relation_service = Arc::new(if relation_cache_path.exists() {
        match CachingRelationService::from_cache_file(inner, &relation_cache_path) {
            Ok(service) => service,
            Err(err) => {
                eprintln!("config error: failed to load relation-service cache: {err}");
                return ExitCode::from(1);
            }
        }
    } else {
        CachingRelationService::new(inner)
    });

    let backend_config = settings.index_backend.clone().into_backend_config();
    let writer = match indexwriter::IndexWriter::open(&backend_config) {
        Ok(writer) => writer,
        Err(err) => {
            eprintln!("index io error: {err}");
            return ExitCode::from(2);
        }
    };

    let pool = WorkerPool::new(settings.effective_concurrency());

    let report = match run_full_pipeline(&pool, &settings, &mut tables, Arc::clone(&relation_service), &writer, &manifest).await {
        Ok(report) => report,
        Err(err) => {
            eprintln!("pipeline run failed: {err}");
            return ExitCode::from(2);
        }
    };

    if let Err(err) = relation_service.flush(&relation_cache_path) {
        tracing::warn!(%err, "failed to persist relation-service cache between runs");
    }

    summarize(&report)
}

fn summarize(report: &PipelineRunReport) -> ExitCode {
    for (name, stage) in [
        ("fetch", &report.fetch),
        ("parse", &report.parse),
        ("normalize", &report.normalize),
        ("facet", &report.facet),
        ("index", &report.index),
    ] {
        tracing::info!(stage = name, total = stage.total, succeeded = stage.succeeded, failed = stage.failed.len(), "stage complete");
    }

    let all_successful = [&report.fetch, &report.parse, &report.normalize, &report.facet, &report.index]
        .into_iter()
        .all(|stage| stage.is_fully_successful());

    if all_successful {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}
