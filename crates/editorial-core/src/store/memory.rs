//! In-memory [`Store`] implementation for testing and dry runs.
//!
//! Uses `BTreeMap` behind `std::sync::RwLock` for thread safety, so slugs
//! come back sorted without extra work.

use std::collections::BTreeMap;
use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::models::{ImportRecord, Label};

use super::{normalize_labels, upsert_outcome, Store, UpsertOutcome};

/// In-memory store for tests and dry runs.
pub struct InMemoryStore {
    records: RwLock<BTreeMap<String, ImportRecord>>,
    labels: RwLock<BTreeMap<String, Label>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
            labels: RwLock::new(BTreeMap::new()),
        }
    }

    /// All labels created so far, sorted by text.
    pub fn labels(&self) -> Result<Vec<Label>> {
        let labels = self.labels.read().map_err(|_| poisoned())?;
        Ok(labels.values().cloned().collect())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned() -> anyhow::Error {
    anyhow!("in-memory store lock poisoned")
}

#[async_trait]
impl Store for InMemoryStore {
    async fn upsert_record(&self, record: &ImportRecord) -> Result<UpsertOutcome> {
        let mut records = self.records.write().map_err(|_| poisoned())?;
        let outcome = upsert_outcome(records.get(&record.slug), record);
        if outcome != UpsertOutcome::Unchanged {
            records.insert(record.slug.clone(), record.clone());
        }
        Ok(outcome)
    }

    async fn get_record(&self, slug: &str) -> Result<Option<ImportRecord>> {
        let records = self.records.read().map_err(|_| poisoned())?;
        Ok(records.get(slug).cloned())
    }

    async fn list_slugs(&self) -> Result<Vec<String>> {
        let records = self.records.read().map_err(|_| poisoned())?;
        Ok(records.keys().cloned().collect())
    }

    async fn resolve_labels(&self, texts: &[String]) -> Result<Vec<Label>> {
        let mut labels = self.labels.write().map_err(|_| poisoned())?;
        Ok(normalize_labels(texts)
            .into_iter()
            .map(|text| {
                labels
                    .entry(text.clone())
                    .or_insert_with(|| Label {
                        id: Uuid::new_v4(),
                        text,
                        created_at: Utc::now(),
                    })
                    .clone()
            })
            .collect())
    }
}
