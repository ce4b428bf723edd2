//! Export imported records as a single JSON document.
//!
//! Produces one file holding every record (with its editorial summary tree)
//! and the label table, for loading into the site's database or for
//! diffing between imports.

use anyhow::Result;
use serde::Serialize;
use std::path::Path;

use editorial_core::models::{ImportRecord, Label};
use editorial_core::store::Store;

use crate::config::Config;
use crate::store_fs::JsonDirStore;

#[derive(Serialize)]
struct ExportData<'a> {
    records: &'a [ImportRecord],
    labels: &'a [Label],
}

/// Every stored record, sorted by slug.
pub async fn collect_records(store: &dyn Store) -> Result<Vec<ImportRecord>> {
    let mut records = Vec::new();
    for slug in store.list_slugs().await? {
        if let Some(record) = store.get_record(&slug).await? {
            records.push(record);
        }
    }
    Ok(records)
}

/// Export records and labels as JSON.
///
/// If `output` is `Some`, writes to that file path. Otherwise writes
/// to stdout for piping.
pub async fn run_export(config: &Config, output: Option<&Path>) -> Result<()> {
    let store = JsonDirStore::open(&config.output.dir).await?;
    let records = collect_records(&store).await?;
    let labels = store.labels().await;

    let json = serde_json::to_string_pretty(&ExportData {
        records: &records,
        labels: &labels,
    })?;

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, &json)?;
            eprintln!(
                "Exported {} records, {} labels to {}",
                records.len(),
                labels.len(),
                path.display()
            );
        }
        None => {
            println!("{}", json);
        }
    }

    Ok(())
}
