//! Storage boundary for imported records.
//!
//! The [`Store`] trait is everything the import pipeline needs from a
//! persistence collaborator. Backends decide how records and labels map onto
//! their own schema; the engine never sees them.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{ImportRecord, Label};

/// Result of [`Store::upsert_record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    /// Same slug, content hash and photo as the stored record; the stored
    /// record (and its identifiers) is kept.
    Unchanged,
}

/// Abstract storage backend for import records.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`upsert_record`](Store::upsert_record) | Insert or replace a record by slug |
/// | [`get_record`](Store::get_record) | Retrieve a record by slug |
/// | [`list_slugs`](Store::list_slugs) | All stored slugs, sorted |
/// | [`resolve_labels`](Store::resolve_labels) | Reuse or create labels by text |
#[async_trait]
pub trait Store: Send + Sync {
    async fn upsert_record(&self, record: &ImportRecord) -> Result<UpsertOutcome>;

    async fn get_record(&self, slug: &str) -> Result<Option<ImportRecord>>;

    async fn list_slugs(&self) -> Result<Vec<String>>;

    /// Labels for `texts`, lowercased and deduplicated, in first-seen order.
    ///
    /// Texts are otherwise taken as given: surrounding whitespace is kept.
    ///
    /// A label whose text already exists in the store is returned as is;
    /// otherwise a new one is created.
    async fn resolve_labels(&self, texts: &[String]) -> Result<Vec<Label>>;
}

/// Lowercase and deduplicate label texts, keeping first-seen order.
pub fn normalize_labels(texts: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    texts
        .iter()
        .map(|t| t.to_lowercase())
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// Decide the outcome of writing `record` over `existing`.
pub fn upsert_outcome(existing: Option<&ImportRecord>, record: &ImportRecord) -> UpsertOutcome {
    match existing {
        None => UpsertOutcome::Inserted,
        Some(stored)
            if stored.content_hash == record.content_hash && stored.photo_id == record.photo_id =>
        {
            UpsertOutcome::Unchanged
        }
        Some(_) => UpsertOutcome::Updated,
    }
}
