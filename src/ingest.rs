//! Import pipeline orchestration.
//!
//! Coordinates the full import flow: discovery → parse → tree
//! reconstruction → store. Files are read and rebuilt concurrently, bounded
//! by `import.concurrency`; every file gets its own identifier allocator.
//! Records are saved sequentially in discovery order.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use editorial_core::allocator::IdAllocator;
use editorial_core::error::ReconstructError;
use editorial_core::models::{Document, ImportRecord};
use editorial_core::store::{Store, UpsertOutcome};
use editorial_core::tree::{DanglingPolicy, Omission};
use editorial_core::validate::verify_tree;

use crate::config::{Config, ImportConfig};
use crate::connector_fs::{find_photo, scan_results, ResultFile};
use crate::models::{parse_timestamp, slug_from_url, ScraperResult};
use crate::progress::{ImportProgressEvent, ImportProgressReporter};
use crate::store_fs::JsonDirStore;

/// Command-line overrides for one import run.
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    pub dry_run: bool,
    pub limit: Option<usize>,
    pub concurrency: Option<usize>,
    pub dangling: Option<DanglingPolicy>,
}

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub files: usize,
    pub documents: usize,
    pub nodes: usize,
    pub omitted: usize,
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
}

/// One scraper result turned into a record, before labels are resolved.
#[derive(Debug, Clone)]
pub struct BuiltRecord {
    pub file: ResultFile,
    pub record: ImportRecord,
    pub tags: Vec<String>,
    pub omitted: Vec<Omission>,
}

/// Parse one scraper result and rebuild its editorial summary.
///
/// Summary text and the added-on date are only taken from results that
/// carry editorial content. The photo is looked up in `images_dir` when one
/// is configured.
pub fn build_record(
    file: &ResultFile,
    bytes: &[u8],
    import: &ImportConfig,
    images_dir: Option<&Path>,
) -> Result<BuiltRecord> {
    let result = ScraperResult::from_json(bytes)?;
    let wikipedia = result.wikipedia()?;
    let slug = slug_from_url(&wikipedia.url, &import.wikipedia_prefix)?;
    if slug.is_empty() {
        return Err(ReconstructError::MissingExpectedData(format!(
            "wikipediaData.url has no slug after {}",
            import.wikipedia_prefix
        ))
        .into());
    }
    let content_hash = result.content_hash()?;
    let photo_id = match images_dir {
        Some(dir) => find_photo(dir, &slug)?,
        None => None,
    };

    let mut record = ImportRecord {
        slug,
        old_slug: file.stem(),
        name: wikipedia.title.clone(),
        labels: Vec::new(),
        summary: None,
        added_on: None,
        photo_id,
        content_hash,
        editorial_summary: None,
    };
    let mut omitted = Vec::new();

    if let Some(content) = result.content()? {
        let last_updated_on = content
            .last_updated_on
            .map(parse_timestamp)
            .transpose()?;

        let (document, dropped) = Document::reconstruct(
            content.author,
            last_updated_on,
            content.pieces,
            IdAllocator::new(),
            import.dangling,
        )?;
        if import.verify {
            verify_tree(&document.nodes)?;
        }

        record.summary = result.summary();
        record.added_on = last_updated_on;
        record.editorial_summary = Some(document);
        omitted = dropped;
    }

    Ok(BuiltRecord {
        file: file.clone(),
        record,
        tags: result.tags,
        omitted,
    })
}

/// Read and rebuild `files` concurrently, returning records in input order.
///
/// The first failure aborts the remaining tasks.
pub async fn build_all(
    files: &[ResultFile],
    import: &ImportConfig,
    images_dir: Option<&Path>,
    concurrency: usize,
    progress: &dyn ImportProgressReporter,
) -> Result<Vec<BuiltRecord>> {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let import = Arc::new(import.clone());
    let images_dir: Option<Arc<Path>> = images_dir.map(Arc::from);
    let mut tasks = JoinSet::new();

    for (index, file) in files.iter().cloned().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        let import = Arc::clone(&import);
        let images_dir = images_dir.clone();
        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await?;
            let bytes = tokio::fs::read(&file.path)
                .await
                .with_context(|| format!("Failed to read {}", file.path.display()))?;
            let built = build_record(&file, &bytes, &import, images_dir.as_deref())
                .with_context(|| format!("Failed to import {}", file.path.display()))?;
            Ok::<_, anyhow::Error>((index, built))
        });
    }

    let total = files.len() as u64;
    let mut slots: Vec<Option<BuiltRecord>> = vec![None; files.len()];
    let mut done = 0u64;

    while let Some(joined) = tasks.join_next().await {
        let (index, built) = joined??;
        slots[index] = Some(built);
        done += 1;
        progress.report(ImportProgressEvent::Building { n: done, total });
    }

    Ok(slots.into_iter().flatten().collect())
}

/// Resolve labels and upsert every record into `store`.
pub async fn save_all(
    store: &dyn Store,
    built: Vec<BuiltRecord>,
    stats: &mut ImportStats,
    progress: &dyn ImportProgressReporter,
) -> Result<()> {
    let total = built.len() as u64;
    for (n, item) in built.into_iter().enumerate() {
        let mut record = item.record;
        record.labels = store.resolve_labels(&item.tags).await?;
        let outcome = store
            .upsert_record(&record)
            .await
            .with_context(|| format!("Failed to save {}", record.slug))?;
        match outcome {
            UpsertOutcome::Inserted => stats.inserted += 1,
            UpsertOutcome::Updated => stats.updated += 1,
            UpsertOutcome::Unchanged => stats.unchanged += 1,
        }
        progress.report(ImportProgressEvent::Saving {
            n: n as u64 + 1,
            total,
        });
    }
    Ok(())
}

/// Run the pipeline against an explicit store.
pub async fn import_with_store(
    config: &Config,
    options: &ImportOptions,
    store: &dyn Store,
    progress: &dyn ImportProgressReporter,
) -> Result<ImportStats> {
    progress.report(ImportProgressEvent::Discovering {
        root: config.scraper.results_dir.display().to_string(),
    });
    let mut files = scan_results(config)?;
    if let Some(limit) = options.limit {
        files.truncate(limit);
    }

    let mut import = config.import.clone();
    if let Some(policy) = options.dangling {
        import.dangling = policy;
    }
    let concurrency = options.concurrency.unwrap_or(import.concurrency);
    let built = build_all(
        &files,
        &import,
        config.scraper.images_dir.as_deref(),
        concurrency,
        progress,
    )
    .await?;

    let mut stats = ImportStats {
        files: files.len(),
        ..ImportStats::default()
    };
    for item in &built {
        stats.omitted += item.omitted.len();
        if let Some(document) = &item.record.editorial_summary {
            stats.documents += 1;
            stats.nodes += document.node_count();
        }
    }

    if !options.dry_run {
        save_all(store, built, &mut stats, progress).await?;
    }

    Ok(stats)
}

/// `edimport import`: run the pipeline into the configured output store.
pub async fn run_import(
    config: &Config,
    options: &ImportOptions,
    progress: &dyn ImportProgressReporter,
) -> Result<()> {
    let store = JsonDirStore::open(&config.output.dir).await?;
    let stats = import_with_store(config, options, &store, progress).await?;

    if options.dry_run {
        println!("import (dry-run)");
    } else {
        println!("import");
    }
    println!("  files found: {}", stats.files);
    println!("  documents built: {}", stats.documents);
    println!("  nodes built: {}", stats.nodes);
    println!("  pieces omitted: {}", stats.omitted);
    if !options.dry_run {
        println!("  inserted: {}", stats.inserted);
        println!("  updated: {}", stats.updated);
        println!("  unchanged: {}", stats.unchanged);
    }
    println!("ok");

    Ok(())
}
