//! Record retrieval by slug.
//!
//! Fetches one imported record from the output store and prints its metadata
//! followed by an indented outline of the editorial summary. Used by
//! `edimport show`.

use anyhow::{bail, Result};
use std::fmt::Write;

use editorial_core::models::{Document, ImportRecord, NodeBody};
use editorial_core::store::Store;

use crate::config::Config;
use crate::store_fs::JsonDirStore;

/// Look up a record, failing when the slug is unknown.
pub async fn get_record(store: &dyn Store, slug: &str) -> Result<ImportRecord> {
    match store.get_record(slug).await? {
        Some(record) => Ok(record),
        None => bail!("record not found: {}", slug),
    }
}

/// CLI entry point: print one record to stdout.
pub async fn run_show(config: &Config, slug: &str) -> Result<()> {
    let store = JsonDirStore::open(&config.output.dir).await?;
    let record = get_record(&store, slug).await?;
    print!("{}", render_record(&record));
    Ok(())
}

pub fn render_record(record: &ImportRecord) -> String {
    let mut out = String::new();
    let labels: Vec<&str> = record.labels.iter().map(|l| l.text.as_str()).collect();

    let _ = writeln!(out, "--- Record ---");
    let _ = writeln!(out, "slug:         {}", record.slug);
    let _ = writeln!(out, "old_slug:     {}", record.old_slug);
    let _ = writeln!(out, "name:         {}", record.name);
    let _ = writeln!(out, "labels:       {}", labels.join(", "));
    if let Some(summary) = &record.summary {
        let _ = writeln!(out, "summary:      {}", summary.replace('\n', " / "));
    }
    if let Some(added_on) = record.added_on {
        let _ = writeln!(out, "added_on:     {}", added_on.format("%Y-%m-%d %H:%M"));
    }
    if let Some(photo) = &record.photo_id {
        let _ = writeln!(out, "photo:        {}", photo);
    }

    match &record.editorial_summary {
        Some(document) => {
            let _ = writeln!(out, "author:       {}", document.author);
            let _ = writeln!(out, "nodes:        {}", document.node_count());
            let _ = writeln!(out);
            let _ = writeln!(out, "--- Editorial summary ---");
            out.push_str(&render_outline(document));
        }
        None => {
            let _ = writeln!(out);
            let _ = writeln!(out, "(no editorial summary)");
        }
    }
    out
}

/// One line per node, indented two spaces per level.
pub fn render_outline(document: &Document) -> String {
    let mut out = String::new();
    for (depth, node) in document.walk() {
        let indent = "  ".repeat(depth);
        match &node.body {
            NodeBody::Block => {
                let _ = writeln!(out, "{}{}", indent, node.content_type);
            }
            NodeBody::Inline {
                source_title,
                source_url,
                text,
            } => {
                let _ = write!(
                    out,
                    "{}{} {:?}",
                    indent,
                    node.content_type,
                    text.as_deref().unwrap_or("")
                );
                match (source_title, source_url) {
                    (Some(title), Some(url)) => {
                        let _ = write!(out, "  [{} <{}>]", title, url);
                    }
                    (Some(title), None) => {
                        let _ = write!(out, "  [{}]", title);
                    }
                    (None, Some(url)) => {
                        let _ = write!(out, "  <{}>", url);
                    }
                    (None, None) => {}
                }
                out.push('\n');
            }
        }
    }
    out
}
