//! Output store statistics.
//!
//! Provides a quick summary of what has been imported: record counts,
//! editorial summary coverage, node totals and labels. Used by
//! `edimport stats` to confirm an import landed as expected.

use anyhow::Result;
use chrono::{DateTime, Utc};
use walkdir::WalkDir;

use editorial_core::models::ImportRecord;

use crate::config::Config;
use crate::export::collect_records;
use crate::store_fs::JsonDirStore;

/// Totals over a set of records.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub records: usize,
    pub with_summary: usize,
    pub nodes: usize,
    pub latest_update: Option<DateTime<Utc>>,
}

impl StoreStats {
    pub fn from_records(records: &[ImportRecord]) -> Self {
        let mut stats = StoreStats {
            records: records.len(),
            ..StoreStats::default()
        };
        for record in records {
            if let Some(document) = &record.editorial_summary {
                stats.with_summary += 1;
                stats.nodes += document.node_count();
            }
            if record.added_on > stats.latest_update {
                stats.latest_update = record.added_on;
            }
        }
        stats
    }
}

/// Run the stats command: read the store and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let store = JsonDirStore::open(&config.output.dir).await?;
    let records = collect_records(&store).await?;
    let labels = store.labels().await;
    let stats = StoreStats::from_records(&records);

    let size: u64 = WalkDir::new(store.root())
        .into_iter()
        .filter_map(|e| e.ok())
        .filter_map(|e| e.metadata().ok())
        .filter(|m| m.is_file())
        .map(|m| m.len())
        .sum();

    println!("Editorial Import — Store Stats");
    println!("==============================");
    println!();
    println!("  Store:       {}", store.root().display());
    println!("  Size:        {}", format_bytes(size));
    println!();
    println!("  Records:     {}", stats.records);
    println!(
        "  Summaries:   {} / {} ({}%)",
        stats.with_summary,
        stats.records,
        if stats.records > 0 {
            (stats.with_summary * 100) / stats.records
        } else {
            0
        }
    );
    println!("  Nodes:       {}", stats.nodes);
    println!("  Labels:      {}", labels.len());
    match stats.latest_update {
        Some(ts) => println!("  Latest:      {}", format_ts_relative(ts)),
        None => println!("  Latest:      never"),
    }
    println!();

    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Relative time for recent timestamps, a date for older ones.
fn format_ts_relative(ts: DateTime<Utc>) -> String {
    let delta = (Utc::now() - ts).num_seconds();

    if delta < 0 {
        ts.format("%Y-%m-%d %H:%M").to_string()
    } else if delta < 86400 {
        "today".to_string()
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        ts.format("%Y-%m-%d").to_string()
    }
}
