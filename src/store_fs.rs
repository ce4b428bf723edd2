//! JSON directory [`Store`] backend.
//!
//! Layout under the configured output directory:
//!
//! ```text
//! <dir>/
//!   labels.json            all labels, sorted by text
//!   summaries/<slug>.json  one pretty-printed ImportRecord per person
//! ```
//!
//! Slugs are used as file names after replacing path separators, so a slug
//! like `AC/DC` is stored as `AC%2FDC.json`.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use uuid::Uuid;

use editorial_core::models::{ImportRecord, Label};
use editorial_core::store::{normalize_labels, upsert_outcome, Store, UpsertOutcome};

pub struct JsonDirStore {
    root: PathBuf,
    labels: Mutex<BTreeMap<String, Label>>,
}

impl JsonDirStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub async fn open(root: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(root.join("summaries"))
            .await
            .with_context(|| format!("Failed to create store directory: {}", root.display()))?;

        let labels_path = root.join("labels.json");
        let labels: Vec<Label> = match tokio::fs::read(&labels_path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .with_context(|| format!("Failed to parse {}", labels_path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", labels_path.display()))
            }
        };

        Ok(Self {
            root: root.to_path_buf(),
            labels: Mutex::new(labels.into_iter().map(|l| (l.text.clone(), l)).collect()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All stored labels, sorted by text.
    pub async fn labels(&self) -> Vec<Label> {
        self.labels.lock().await.values().cloned().collect()
    }

    fn record_path(&self, slug: &str) -> PathBuf {
        self.root
            .join("summaries")
            .join(format!("{}.json", file_name_for(slug)))
    }

    async fn write_labels(&self, labels: &BTreeMap<String, Label>) -> Result<()> {
        let all: Vec<&Label> = labels.values().collect();
        let json = serde_json::to_vec_pretty(&all)?;
        write_atomic(&self.root.join("labels.json"), &json).await
    }
}

fn file_name_for(slug: &str) -> String {
    slug.replace('%', "%25")
        .replace('/', "%2F")
        .replace('\\', "%5C")
}

fn slug_for(file_stem: &str) -> String {
    file_stem
        .replace("%2F", "/")
        .replace("%5C", "\\")
        .replace("%25", "%")
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, bytes)
        .await
        .with_context(|| format!("Failed to write {}", tmp.display()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("Failed to move {} into place", path.display()))?;
    Ok(())
}

#[async_trait]
impl Store for JsonDirStore {
    async fn upsert_record(&self, record: &ImportRecord) -> Result<UpsertOutcome> {
        if record.slug.is_empty() {
            bail!("Cannot store a record with an empty slug (old slug {})", record.old_slug);
        }
        let existing = self.get_record(&record.slug).await?;
        let outcome = upsert_outcome(existing.as_ref(), record);
        if outcome != UpsertOutcome::Unchanged {
            let json = serde_json::to_vec_pretty(record)?;
            write_atomic(&self.record_path(&record.slug), &json).await?;
        }
        Ok(outcome)
    }

    async fn get_record(&self, slug: &str) -> Result<Option<ImportRecord>> {
        let path = self.record_path(slug);
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let record = serde_json::from_slice(&bytes)
                    .with_context(|| format!("Failed to parse {}", path.display()))?;
                Ok(Some(record))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    async fn list_slugs(&self) -> Result<Vec<String>> {
        let dir = self.root.join("summaries");
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .with_context(|| format!("Failed to list {}", dir.display()))?;
        let mut slugs = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                slugs.push(slug_for(stem));
            }
        }
        slugs.sort();
        Ok(slugs)
    }

    async fn resolve_labels(&self, texts: &[String]) -> Result<Vec<Label>> {
        let mut labels = self.labels.lock().await;
        let mut created = false;
        let resolved: Vec<Label> = normalize_labels(texts)
            .into_iter()
            .map(|text| {
                labels
                    .entry(text.clone())
                    .or_insert_with(|| {
                        created = true;
                        Label {
                            id: Uuid::new_v4(),
                            text,
                            created_at: Utc::now(),
                        }
                    })
                    .clone()
            })
            .collect();
        if created {
            self.write_labels(&labels).await?;
        }
        Ok(resolved)
    }
}
